//! Highlight injection for log rows
//!
//! Renders the visible text of one raw row as escaped HTML, wrapping the
//! ranges owned by comments in highlight spans. Escape sequences never
//! reach the output, but they do not split a highlight either.

use crate::comments::{CommentState, HighlightDescriptor};
use crate::resolve::escape::{segments, SegmentKind};

/// Configuration for highlight injection
#[derive(Debug, Clone)]
pub struct HighlightConfig {
    /// CSS class prefix for highlights
    pub class_prefix: String,
    /// Data attribute for the comment ID
    pub id_attribute: String,
    /// Data attribute for the comment state
    pub state_attribute: String,
    /// Whether to include inline styles
    pub include_inline_styles: bool,
    /// Background opacity used with inline styles
    pub opacity: f32,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            class_prefix: "lv-comment".to_string(),
            id_attribute: "data-comment-id".to_string(),
            state_attribute: "data-comment-state".to_string(),
            include_inline_styles: true,
            opacity: 0.3,
        }
    }
}

/// Result of highlight injection
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionResult {
    /// The row's visible text as HTML with highlight spans
    pub html: String,
    /// Number of descriptors that produced at least one span
    pub injected_count: usize,
    /// Descriptors whose range holds no visible character
    pub unrendered: Vec<HighlightDescriptor>,
}

/// Inject highlight spans into one rendered row
///
/// Where descriptors overlap, the first one covering a character owns it.
pub fn inject_highlights(
    row_raw: &str,
    descriptors: &[HighlightDescriptor],
    config: &HighlightConfig,
) -> InjectionResult {
    let mut html = String::with_capacity(row_raw.len());
    let mut rendered = vec![false; descriptors.len()];
    let mut open: Option<usize> = None;
    let mut buf = [0u8; 4];

    for segment in segments(row_raw) {
        if segment.kind == SegmentKind::Escape {
            continue;
        }
        for (offset, ch) in (segment.start..).zip(segment.text.chars()) {
            let owner = descriptors
                .iter()
                .position(|d| d.start <= offset && offset < d.end);
            if owner != open {
                if open.is_some() {
                    html.push_str("</span>");
                }
                if let Some(index) = owner {
                    html.push_str(&format_open_tag(&descriptors[index], config));
                    rendered[index] = true;
                }
                open = owner;
            }
            html.push_str(&html_escape::encode_text(ch.encode_utf8(&mut buf)));
        }
    }
    if open.is_some() {
        html.push_str("</span>");
    }

    let unrendered: Vec<HighlightDescriptor> = descriptors
        .iter()
        .zip(&rendered)
        .filter(|(_, done)| !**done)
        .map(|(d, _)| d.clone())
        .collect();

    InjectionResult {
        html,
        injected_count: rendered.iter().filter(|r| **r).count(),
        unrendered,
    }
}

fn state_name(state: CommentState) -> &'static str {
    match state {
        CommentState::Pending => "pending",
        CommentState::Done => "done",
    }
}

/// Format the opening tag of a highlight span
fn format_open_tag(descriptor: &HighlightDescriptor, config: &HighlightConfig) -> String {
    let state = state_name(descriptor.state);
    let class = format!("{} {}-{}", config.class_prefix, config.class_prefix, state);

    let style = match (&descriptor.color, config.include_inline_styles) {
        (Some(color), true) => format!(
            " style=\"background-color: {}; opacity: {};\"",
            html_escape::encode_double_quoted_attribute(color),
            config.opacity
        ),
        _ => String::new(),
    };

    format!(
        "<span class=\"{}\" {}=\"{}\" {}=\"{}\"{}>",
        html_escape::encode_double_quoted_attribute(&class),
        config.id_attribute,
        descriptor.comment_id,
        config.state_attribute,
        state,
        style
    )
}
