//! gdoc2md: export Google Docs documents to Markdown.
//!
//! A document is a tree of tabs; each tab becomes one Markdown file in the
//! output directory, inline images are downloaded into `images/`, and a
//! `tabs.md` index links every exported tab.

pub mod auth;
pub mod cli;
pub mod docs;
pub mod export;
pub mod markdown;
