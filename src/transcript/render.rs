//! Markdown → markup rendering for transcript entries
//!
//! Rendering is a pure function of the accumulated text: the live view is
//! re-rendered from scratch on every fragment, so the same input always
//! produces byte-identical output.

use pulldown_cmark::{html, Event, Options, Parser};

/// Appended to the live rendering while a turn is streaming
pub const STREAMING_INDICATOR: &str = "<span class=\"streaming-indicator\">▋</span>";

/// Render model markdown (GitHub flavour, single newlines kept as line
/// breaks). Raw HTML from the model is shown as text, never interpreted.
pub fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let events = Parser::new_ext(text, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(text.len() + text.len() / 2);
    html::push_html(&mut out, events);
    out
}

/// Escape the five HTML-special characters
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}
