use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gdoc2md::auth;
use gdoc2md::cli::{extract_doc_id, Cli, Commands};
use gdoc2md::docs::DocsClient;
use gdoc2md::export;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Configure => auth::configure()?,
        Commands::Export(args) => {
            let document_id = extract_doc_id(&args.document)?;
            tokio::select! {
                result = run_export(&document_id, &args.output) => result?,
                _ = tokio::signal::ctrl_c() => {
                    anyhow::bail!("interrupted");
                }
            }
        }
    }
    Ok(())
}

async fn run_export(document_id: &str, output_dir: &Path) -> anyhow::Result<()> {
    let http = auth::get_authenticated_client().await?;
    let docs = DocsClient::new(http.clone());

    println!("Fetching document {document_id}...");
    let document = docs
        .fetch(document_id)
        .await
        .context("failed to fetch document")?;

    export::export_document(&http, document, output_dir).await?;
    println!("Done!");
    Ok(())
}
