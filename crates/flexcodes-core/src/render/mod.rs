//! Markup rendering for the grouped list.
//!
//! Every record field is untrusted input, so all text goes through
//! `escape_html` before it lands in markup. The markup is regenerated from
//! scratch on each render.

pub mod html;
pub mod links;

pub use html::{render_groups, render_load_error, render_page, NO_MATCHES};
pub use links::MapLinks;

/// Escape the five HTML-reserved characters
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}
