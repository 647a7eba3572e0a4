//! Ingest command implementation.
//!
//! - `sfs ingest <TEXT> [--meta k=v ...]` stores one document
//! - `sfs ingest --file docs.json` stores a batch, `-` reads stdin

use std::io::Read;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use super::{open_service, runtime, truncate};
use crate::cli::CommandContext;
use crate::error::{Error, Result};
use crate::model::{ingest_items_from_json, metadata_from_pairs, Document, Metadata};
use crate::search::BatchReport;

/// Output for a single ingest.
#[derive(Serialize)]
struct IngestOutput {
    id: String,
    text: String,
    metadata: Metadata,
    created_at: i64,
    dimensions: usize,
}

impl From<&Document> for IngestOutput {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            text: doc.text.clone(),
            metadata: doc.metadata.clone(),
            created_at: doc.created_at,
            dimensions: doc.dimensions(),
        }
    }
}

#[derive(Serialize)]
struct BatchItemOutput {
    index: usize,
    id: String,
    text: String,
}

#[derive(Serialize)]
struct BatchFailureOutput {
    index: usize,
    code: String,
    message: String,
}

/// Output for a batch ingest.
#[derive(Serialize)]
struct BatchOutput {
    total: usize,
    succeeded: Vec<BatchItemOutput>,
    failed: Vec<BatchFailureOutput>,
    skipped: Vec<usize>,
}

/// Execute the ingest command.
///
/// # Errors
///
/// Single ingest returns the ingest error. A batch prints its report first
/// and then returns the first item failure so the exit code reflects it.
pub fn execute(
    text: Option<&str>,
    meta: &[String],
    file: Option<&Path>,
    ctx: &CommandContext,
) -> Result<()> {
    match (text, file) {
        (_, Some(file)) => execute_batch(file, ctx),
        (Some(text), None) => execute_single(text, meta, ctx),
        (None, None) => Err(Error::InvalidArgument(
            "provide the document text or --file".into(),
        )),
    }
}

fn execute_single(text: &str, meta: &[String], ctx: &CommandContext) -> Result<()> {
    let metadata = metadata_from_pairs(meta)?;

    let rt = runtime()?;
    let document = rt.block_on(async {
        let service = open_service(ctx).await?;
        let document = service.ingest(text, metadata).await;
        service.into_store().close()?;
        document
    })?;

    let output = IngestOutput::from(&document);
    if ctx.json {
        println!("{}", serde_json::to_string(&output)?);
    } else if crate::is_csv() {
        println!("id,text,created_at");
        println!(
            "{},{},{}",
            output.id,
            crate::csv_escape(&output.text),
            output.created_at
        );
    } else {
        println!("{} {}", "Ingested".green().bold(), output.id);
        println!("  {}", truncate(&output.text, 72));
        for (key, value) in &output.metadata {
            println!("  {} {value}", format!("{key}:").dimmed());
        }
    }

    Ok(())
}

/// Read a batch from a file, or stdin for `-`.
fn read_batch(file: &Path) -> Result<serde_json::Value> {
    let raw = if file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file)?
    };

    serde_json::from_str(&raw)
        .map_err(|e| Error::InvalidArgument(format!("{}: invalid JSON: {e}", file.display())))
}

/// Indices of the stored items, given which ones failed or were skipped.
fn succeeded_indices(report: &BatchReport) -> Vec<usize> {
    (0..report.total())
        .filter(|i| !report.skipped.contains(i) && !report.failed.iter().any(|f| f.index == *i))
        .collect()
}

fn execute_batch(file: &Path, ctx: &CommandContext) -> Result<()> {
    let items = ingest_items_from_json(&read_batch(file)?)?;
    if items.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "{}: no documents to ingest",
            file.display()
        )));
    }

    let rt = runtime()?;
    let report = rt.block_on(async {
        let service = open_service(ctx).await?;
        let report = service.ingest_batch(items).await;
        service.into_store().close()?;
        Ok::<_, Error>(report)
    })?;

    let output = BatchOutput {
        total: report.total(),
        succeeded: succeeded_indices(&report)
            .into_iter()
            .zip(&report.succeeded)
            .map(|(index, doc)| BatchItemOutput {
                index,
                id: doc.id.clone(),
                text: doc.text.clone(),
            })
            .collect(),
        failed: report
            .failed
            .iter()
            .map(|f| BatchFailureOutput {
                index: f.index,
                code: f.error.error_code().as_str().to_string(),
                message: f.error.to_string(),
            })
            .collect(),
        skipped: report.skipped.clone(),
    };

    if ctx.json {
        println!("{}", serde_json::to_string(&output)?);
    } else if crate::is_csv() {
        println!("index,status,detail");
        for item in &output.succeeded {
            println!("{},ok,{}", item.index, item.id);
        }
        for item in &output.failed {
            println!("{},failed,{}", item.index, crate::csv_escape(&item.message));
        }
        for index in &output.skipped {
            println!("{index},skipped,");
        }
    } else {
        for item in &output.succeeded {
            println!(
                "{} [{}] {} {}",
                "✓".green(),
                item.index,
                item.id.dimmed(),
                truncate(&item.text, 60)
            );
        }
        for item in &output.failed {
            println!("{} [{}] {}", "✗".red(), item.index, item.message);
        }
        if !output.skipped.is_empty() {
            println!(
                "{} {} item(s) not attempted after a fatal error",
                "!".yellow(),
                output.skipped.len()
            );
        }
        println!();
        println!(
            "{} of {} documents ingested",
            output.succeeded.len(),
            output.total
        );
    }

    match report.failed.into_iter().next() {
        Some(failure) => Err(failure.error),
        None => Ok(()),
    }
}
