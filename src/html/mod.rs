//! HTML rendering of highlighted rows

mod highlight_injector;

pub use highlight_injector::{inject_highlights, HighlightConfig, InjectionResult};
