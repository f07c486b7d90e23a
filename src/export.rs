//! Export orchestration
//!
//! Drives the whole pipeline for one document: flatten the tab tree,
//! convert every tab in parallel, download all discovered images under a
//! bounded worker pool, then write the Markdown files and the `tabs.md`
//! index sequentially in flattened-tab order.

use std::collections::HashMap;
use std::fmt::Write as FmtWrite;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use indicatif::ProgressBar;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;

use crate::docs::{Document, Tab};
use crate::markdown::{convert_tab, ConvertResult, ImageRequest};

/// Cap on concurrently in-flight image downloads.
const MAX_CONCURRENT_DOWNLOADS: usize = 10;

/// Images larger than this are rejected rather than written truncated.
const MAX_IMAGE_BYTES: u64 = 50 * 1024 * 1024;

/// Error type for the export pipeline
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("document has no tabs")]
    EmptyDocument,

    #[error("failed to create directory {path}: {source}")]
    Directory { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("tab conversion task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What an export produced, for final reporting.
#[derive(Debug)]
pub struct ExportSummary {
    pub tab_count: usize,
    pub image_count: usize,
    pub warnings: Vec<String>,
}

/// Output of converting one flattened tab.
#[derive(Debug)]
struct TabExport {
    title: String,
    result: ConvertResult,
}

/// Export a fetched document as Markdown files under `output_dir`.
///
/// `http` must already carry the authorization needed to fetch the
/// document's image content URIs.
pub async fn export_document(
    http: &reqwest::Client,
    document: Document,
    output_dir: &Path,
) -> Result<ExportSummary, ExportError> {
    let tabs = flatten_tabs(document.tabs);
    if tabs.is_empty() {
        return Err(ExportError::EmptyDocument);
    }
    println!("Found {} tab(s)", tabs.len());

    // Both directories exist before any parallel work begins; every task
    // afterwards writes only its own distinct path.
    let images_dir = output_dir.join("images");
    std::fs::create_dir_all(&images_dir).map_err(|source| ExportError::Directory {
        path: images_dir.clone(),
        source,
    })?;

    // Conversion phase: one task per tab, each owning its tab and a fresh
    // converter state. Awaiting the handles in spawn order keeps the
    // results in flattened-tab order regardless of completion order.
    let mut handles = Vec::with_capacity(tabs.len());
    for (index, tab) in tabs.into_iter().enumerate() {
        handles.push(tokio::task::spawn_blocking(move || {
            let title = tab.title().to_string();
            let result = convert_tab(&tab, &title, index);
            TabExport { title, result }
        }));
    }
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await?);
    }

    // Console reporting is deferred past the barrier so lines never
    // interleave between tabs.
    for export in &results {
        println!("  Converted: {}", export.title);
    }

    let filenames = assign_filenames(&results);

    let images: Vec<ImageRequest> = results
        .iter()
        .flat_map(|export| export.result.images.iter().cloned())
        .collect();
    let image_count = images.len();

    let mut warnings = Vec::new();
    if !images.is_empty() {
        println!("Downloading {} image(s)...", image_count);
        warnings = download_images(http, images, &images_dir).await;
        if !warnings.is_empty() {
            println!("Warning: failed to download {} image(s):", warnings.len());
            for warning in &warnings {
                println!("  - {warning}");
            }
        }
    }

    // Serialization barrier: all writes happen after both parallel phases
    // have drained, in flattened-tab order.
    for (export, filename) in results.iter().zip(&filenames) {
        let path = output_dir.join(filename);
        std::fs::write(&path, &export.result.markdown).map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;
        println!("  Wrote: {}", path.display());
    }

    let index_path = output_dir.join("tabs.md");
    let index = generate_index(&results, &filenames);
    std::fs::write(&index_path, index).map_err(|source| ExportError::Write {
        path: index_path.clone(),
        source,
    })?;
    println!("  Wrote: {}", index_path.display());

    Ok(ExportSummary {
        tab_count: results.len(),
        image_count,
        warnings,
    })
}

/// Flatten the tab tree depth-first, pre-order: each tab is immediately
/// followed by its children, before the next sibling. Children are drained
/// out of their parents, so the output tabs are childless.
pub fn flatten_tabs(tabs: Vec<Tab>) -> Vec<Tab> {
    let mut flat = Vec::new();
    for mut tab in tabs {
        let children = std::mem::take(&mut tab.child_tabs);
        flat.push(tab);
        flat.extend(flatten_tabs(children));
    }
    flat
}

/// Replace or strip filesystem-hostile characters from a tab title.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '/' | '\\' | ':' => out.push('-'),
            '*' | '?' | '"' | '<' | '>' | '|' => {}
            _ => out.push(c),
        }
    }
    let trimmed = out.trim();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Assign one output filename per tab, disambiguating titles that sanitize
/// to the same name with a numeric suffix so no tab overwrites another.
fn assign_filenames(results: &[TabExport]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    results
        .iter()
        .map(|export| {
            let base = sanitize_filename(&export.title);
            let n = seen.entry(base.clone()).or_insert(0);
            *n += 1;
            if *n == 1 {
                format!("{base}.md")
            } else {
                format!("{base}_{n}.md")
            }
        })
        .collect()
}

fn generate_index(results: &[TabExport], filenames: &[String]) -> String {
    let mut index = String::from("# Table of Contents\n\n");
    for (export, filename) in results.iter().zip(filenames) {
        writeln!(index, "- [{}]({})", export.title, filename).ok();
    }
    index.push('\n');
    index
}

/// Download all images concurrently, at most [`MAX_CONCURRENT_DOWNLOADS`]
/// in flight. Per-image failures become warnings and never cancel sibling
/// downloads; the returned warnings are reported together by the caller.
async fn download_images(
    http: &reqwest::Client,
    images: Vec<ImageRequest>,
    images_dir: &Path,
) -> Vec<String> {
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_DOWNLOADS));
    let progress = ProgressBar::new(images.len() as u64);

    let mut handles = Vec::with_capacity(images.len());
    for image in images {
        let http = http.clone();
        let semaphore = Arc::clone(&semaphore);
        let progress = progress.clone();
        let dest = images_dir.join(&image.filename);
        handles.push(tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Some(format!("{}: download pool closed", image.filename)),
            };
            let outcome = download_image(&http, &image.content_uri, &dest).await;
            progress.inc(1);
            match outcome {
                Ok(()) => None,
                Err(e) => {
                    tracing::debug!(filename = %image.filename, error = %e, "image download failed");
                    Some(format!("{}: {e}", image.filename))
                }
            }
        }));
    }

    let mut warnings = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Some(warning)) => warnings.push(warning),
            Ok(None) => {}
            Err(e) => warnings.push(format!("download task failed: {e}")),
        }
    }
    progress.finish_and_clear();
    warnings
}

#[derive(Debug, Error)]
enum DownloadError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("write failed: {0}")]
    Io(#[from] io::Error),

    #[error("response exceeds 50 MiB limit")]
    TooLarge,
}

/// Stream one image to disk. Oversized responses are treated as failures
/// and the partial file is removed.
async fn download_image(
    http: &reqwest::Client,
    uri: &str,
    dest: &Path,
) -> Result<(), DownloadError> {
    let response = http.get(uri).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status(status));
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut written: u64 = 0;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        written += chunk.len() as u64;
        if written > MAX_IMAGE_BYTES {
            drop(file);
            tokio::fs::remove_file(dest).await.ok();
            return Err(DownloadError::TooLarge);
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tab(title: &str, children: Vec<Tab>) -> Tab {
        let mut t: Tab = serde_json::from_value(json!({
            "tabProperties": { "title": title }
        }))
        .unwrap();
        t.child_tabs = children;
        t
    }

    fn titles(tabs: &[Tab]) -> Vec<&str> {
        tabs.iter().map(|t| t.title()).collect()
    }

    #[test]
    fn test_flatten_preorder() {
        let tree = vec![
            tab("a", vec![tab("a1", vec![tab("a1x", vec![])]), tab("a2", vec![])]),
            tab("b", vec![]),
        ];
        let flat = flatten_tabs(tree);
        assert_eq!(titles(&flat), vec!["a", "a1", "a1x", "a2", "b"]);
        assert!(flat.iter().all(|t| t.child_tabs.is_empty()));
    }

    #[test]
    fn test_flatten_idempotent_on_own_output() {
        let tree = vec![tab("a", vec![tab("a1", vec![])]), tab("b", vec![])];
        let once = flatten_tabs(tree);
        let expected = titles(&once).into_iter().map(String::from).collect::<Vec<_>>();
        let twice = flatten_tabs(once);
        assert_eq!(titles(&twice), expected);
    }

    #[test]
    fn test_flatten_empty() {
        assert!(flatten_tabs(Vec::new()).is_empty());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a/b\\c:d"), "a-b-c-d");
        assert_eq!(sanitize_filename("w*h?a\"t<e>v|er"), "whatever");
        assert_eq!(sanitize_filename("  spaced  "), "spaced");
        assert_eq!(sanitize_filename("***"), "untitled");
        assert_eq!(sanitize_filename(""), "untitled");
        assert_eq!(sanitize_filename("日本語"), "日本語");
    }

    fn export(title: &str) -> TabExport {
        TabExport {
            title: title.to_string(),
            result: ConvertResult {
                markdown: String::new(),
                images: Vec::new(),
            },
        }
    }

    #[test]
    fn test_assign_filenames_disambiguates_collisions() {
        let results = vec![export("Notes"), export("Notes"), export("Notes/"), export("Other")];
        let filenames = assign_filenames(&results);
        // "Notes/" sanitizes to "Notes-", no collision there.
        assert_eq!(filenames, vec!["Notes.md", "Notes_2.md", "Notes-.md", "Other.md"]);
    }

    #[test]
    fn test_generate_index() {
        let results = vec![export("Intro"), export("Deep Dive")];
        let filenames = vec!["Intro.md".to_string(), "Deep Dive.md".to_string()];
        let index = generate_index(&results, &filenames);
        assert!(index.starts_with("# Table of Contents\n\n"));
        assert!(index.contains("- [Intro](Intro.md)\n"));
        assert!(index.contains("- [Deep Dive](Deep Dive.md)\n"));
    }

    #[test]
    fn test_image_filenames_unique_across_tabs() {
        let make_tab = |object: &str, uri: &str| -> Tab {
            serde_json::from_value(json!({
                "documentTab": {
                    "inlineObjects": {
                        object: { "inlineObjectProperties": { "embeddedObject": {
                            "imageProperties": { "contentUri": uri }
                        } } }
                    },
                    "body": { "content": [ { "paragraph": { "elements": [
                        { "inlineObjectElement": { "inlineObjectId": object } },
                        { "inlineObjectElement": { "inlineObjectId": object } }
                    ] } } ] }
                }
            }))
            .unwrap()
        };

        let tabs = vec![
            make_tab("o1", "https://img.example/1.png"),
            make_tab("o2", "https://img.example/2.png"),
        ];
        let mut names = std::collections::HashSet::new();
        for (index, tab) in tabs.iter().enumerate() {
            let result = crate::markdown::convert_tab(tab, "T", index);
            for image in result.images {
                assert!(names.insert(image.filename.clone()), "duplicate {}", image.filename);
            }
        }
        assert_eq!(names.len(), 4);
    }
}
