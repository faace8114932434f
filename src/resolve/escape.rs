//! Escape sequence grammar
//!
//! Raw log rows carry control bytes and CSI sequences that never reach the
//! screen. The scanner here and the matcher pattern built by
//! [`escape_tolerant_pattern`] agree on what is invisible:
//!
//! - a CSI sequence `ESC [ [0-9;]* <final>` with final in `HfABCDsuJKmhIp`
//! - any single byte in `\x00..=\x1f` (a lone or malformed `ESC` included)
//!
//! All offsets exposed from here are character offsets.

/// CSI sequence as a regex fragment
pub const CSI_PATTERN: &str = r"\x1b\[[0-9;]*[HfABCDsuJKmhIp]";

/// Non-printable control byte as a regex fragment
pub const CONTROL_PATTERN: &str = r"[\x00-\x1f]";

const CSI_FINAL: &str = "HfABCDsuJKmhIp";

/// Whether a run of raw text is drawn or swallowed by the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Visible,
    Escape,
}

/// A maximal run of visible or escape text inside a raw row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub kind: SegmentKind,
    pub text: &'a str,
    /// Character offset of the first char in the raw row
    pub start: usize,
    /// Character offset one past the last char
    pub end: usize,
}

/// Length in chars of a CSI sequence starting at `chars[i]`
fn csi_len(chars: &[char], i: usize) -> Option<usize> {
    if chars.get(i) != Some(&'\x1b') || chars.get(i + 1) != Some(&'[') {
        return None;
    }
    let mut j = i + 2;
    while matches!(chars.get(j), Some(c) if c.is_ascii_digit() || *c == ';') {
        j += 1;
    }
    match chars.get(j) {
        Some(c) if CSI_FINAL.contains(*c) => Some(j + 1 - i),
        _ => None,
    }
}

/// Split a raw row into visible and escape runs
pub fn segments(raw: &str) -> Vec<Segment<'_>> {
    let chars: Vec<char> = raw.chars().collect();
    let mut bytes: Vec<usize> = raw.char_indices().map(|(b, _)| b).collect();
    bytes.push(raw.len());

    let mut runs: Vec<(SegmentKind, usize, usize)> = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let (kind, len) = match csi_len(&chars, i) {
            Some(len) => (SegmentKind::Escape, len),
            None if chars[i] < ' ' => (SegmentKind::Escape, 1),
            None => (SegmentKind::Visible, 1),
        };
        match runs.last_mut() {
            Some((last_kind, _, end)) if *last_kind == kind => *end = i + len,
            _ => runs.push((kind, i, i + len)),
        }
        i += len;
    }

    runs.into_iter()
        .map(|(kind, start, end)| Segment {
            kind,
            text: &raw[bytes[start]..bytes[end]],
            start,
            end,
        })
        .collect()
}

/// The text a terminal would actually draw for `raw`
pub fn render_visible(raw: &str) -> String {
    segments(raw)
        .into_iter()
        .filter(|s| s.kind == SegmentKind::Visible)
        .map(|s| s.text)
        .collect()
}

/// Build a pattern matching `visible` with escape runs allowed before every char
pub fn escape_tolerant_pattern(visible: &str) -> String {
    let gap = format!("(?:{}|{})*", CSI_PATTERN, CONTROL_PATTERN);
    let mut pattern = String::with_capacity(visible.len() * (gap.len() + 2));
    let mut buf = [0u8; 4];
    for ch in visible.chars() {
        pattern.push_str(&gap);
        pattern.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
    }
    pattern
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the char at `offset`, clamped to the end of `s`
pub fn byte_offset(s: &str, offset: usize) -> usize {
    s.char_indices().nth(offset).map(|(b, _)| b).unwrap_or(s.len())
}

/// Char offset of byte index `byte`, which must be a char boundary
pub fn char_offset(s: &str, byte: usize) -> usize {
    s[..byte].chars().count()
}

/// Slice `s` by char offsets, clamping both ends
pub fn char_slice(s: &str, from: usize, to: usize) -> &str {
    let from = byte_offset(s, from);
    let to = byte_offset(s, to).max(from);
    &s[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    const ROW: &str = "ab\u{1b}[31mCDEF\u{1b}[0mgh";

    #[test]
    fn test_segments() {
        let segs = segments(ROW);
        let kinds: Vec<_> = segs.iter().map(|s| (s.kind, s.text)).collect();
        assert_eq!(
            kinds,
            vec![
                (SegmentKind::Visible, "ab"),
                (SegmentKind::Escape, "\u{1b}[31m"),
                (SegmentKind::Visible, "CDEF"),
                (SegmentKind::Escape, "\u{1b}[0m"),
                (SegmentKind::Visible, "gh"),
            ]
        );
        assert_eq!((segs[2].start, segs[2].end), (7, 11));
    }

    #[test]
    fn test_render_visible() {
        assert_eq!(render_visible(ROW), "abCDEFgh");
        assert_eq!(render_visible("plain"), "plain");
        assert_eq!(render_visible("\u{1b}[1m\u{1b}[32mok\u{7}"), "ok");
    }

    #[test]
    fn test_malformed_escape_hides_only_control_byte() {
        assert_eq!(render_visible("a\u{1b}[31xb"), "a[31xb");
    }

    #[test]
    fn test_pattern_skips_escapes() {
        let re = Regex::new(&escape_tolerant_pattern("CDEF")).unwrap();
        let m = re.find("\u{1b}[31mCDEF\u{1b}[0mgh").unwrap();
        assert_eq!((m.start(), m.end()), (0, 9));
    }

    #[test]
    fn test_pattern_escapes_metacharacters() {
        let re = Regex::new(&escape_tolerant_pattern("a.b(c)")).unwrap();
        assert!(re.is_match("xa.b(c)"));
        assert!(!re.is_match("axb(c)"));
    }

    #[test]
    fn test_char_offsets_with_multibyte() {
        let s = "é\u{1b}[1mß";
        assert_eq!(char_len(s), 6);
        assert_eq!(byte_offset(s, 1), 2);
        assert_eq!(char_offset(s, s.len()), 6);
        assert_eq!(char_slice(s, 5, 6), "ß");
        assert_eq!(char_slice(s, 4, 99), "mß");
    }
}
