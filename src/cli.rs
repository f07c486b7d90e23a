//! Command-line interface definition.

use std::path::PathBuf;

use anyhow::bail;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "gdoc2md",
    version,
    about = "Export Google Docs documents to Markdown"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Set up Google OAuth2 credentials
    Configure,

    /// Export a document to Markdown files
    Export(ExportArgs),
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Google Docs URL or raw document ID
    pub document: String,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

/// Extract the document ID from a Docs URL, or pass a raw ID through.
///
/// Supported forms:
/// - `https://docs.google.com/document/d/DOC_ID/edit`
/// - `https://docs.google.com/document/d/DOC_ID`
/// - `DOC_ID`
pub fn extract_doc_id(input: &str) -> anyhow::Result<String> {
    let input = input.trim();
    if input.is_empty() {
        bail!("could not extract document ID from URL: {input}");
    }

    // Anything else without a slash is treated as a raw document ID.
    if !input.contains('/') {
        return Ok(input.to_string());
    }

    let url = reqwest::Url::parse(input).map_err(|e| anyhow::anyhow!("invalid URL: {e}"))?;
    let segments: Vec<&str> = url.path().trim_matches('/').split('/').collect();
    for (i, segment) in segments.iter().enumerate() {
        if *segment == "d" {
            if let Some(id) = segments.get(i + 1).filter(|id| !id.is_empty()) {
                return Ok((*id).to_string());
            }
        }
    }

    bail!("could not extract document ID from URL: {input}")
}
