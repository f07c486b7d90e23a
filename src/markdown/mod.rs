//! Document-to-Markdown conversion engine
//!
//! Converts one tab's structural element tree to Markdown text:
//!
//! - Paragraphs, headings, and horizontal rules
//! - Nested ordered/unordered lists with per-level numbering
//! - Text styling (bold, italic, strikethrough, links, inline code)
//! - Tables flattened to pipe tables
//! - Inline images extracted as download requests with stable filenames
//!
//! Conversion is total: malformed or unresolvable references degrade to
//! empty output rather than failing.

mod converter;
mod list;
mod style;
mod table;

pub use converter::{convert_tab, ConvertResult, ImageRequest};
