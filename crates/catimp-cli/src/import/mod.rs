//! The `import` command: runs one CSV file as an import batch.
//!
//! Rows are processed in file order, one at a time. Per-row failures are
//! recorded and skipped; only infrastructure failures (unreadable file,
//! reference data, batch bookkeeping) abort the run.

mod media;
mod row;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use catimp_core::{AppConfig, BatchSummary, RelationLinker, Row, RowMapper, RowOutcome};
use csv::{ReaderBuilder, StringRecord};

use crate::fail_batch_best_effort;
use media::MediaRoot;
use row::{process_row, RowContext};

/// Runs `file` as an import batch, or as a dry run when `dry_run` is set.
///
/// # Errors
///
/// Returns an error if the header alias file or the CSV cannot be read, the
/// catalog reference data cannot be loaded, or the batch row cannot be
/// created or finalized. Row-level failures are counted, not returned.
pub(crate) async fn run_import(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    file: &Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    let settings = &config.import;
    let aliases = catimp_core::load_header_aliases(settings.header_aliases_path.as_deref())?;

    if dry_run {
        let summary = import_rows(pool, config, &aliases, file, None).await?;
        println!("dry-run: {summary}");
        return Ok(());
    }

    let source_file = file.display().to_string();
    let batch = catimp_db::create_import_batch(pool, &source_file, "cli").await?;
    if let Err(e) = catimp_db::start_import_batch(pool, batch.id).await {
        fail_batch_best_effort(pool, batch.id, &BatchSummary::default(), format!("{e:#}")).await;
        return Err(e.into());
    }
    tracing::info!(
        batch_id = batch.id,
        public_id = %batch.public_id,
        file = %source_file,
        "import batch started"
    );

    let summary = match import_rows(pool, config, &aliases, file, Some(batch.id)).await {
        Ok(summary) => summary,
        Err(e) => {
            fail_batch_best_effort(pool, batch.id, &BatchSummary::default(), format!("{e:#}"))
                .await;
            return Err(e);
        }
    };

    if let Err(e) = catimp_db::complete_import_batch(pool, batch.id, &summary).await {
        fail_batch_best_effort(pool, batch.id, &summary, format!("{e:#}")).await;
        return Err(e.into());
    }

    tracing::info!(
        batch_id = batch.id,
        imported = summary.imported,
        skipped = summary.skipped,
        failed = summary.failed,
        "import batch completed"
    );
    println!("batch {}: {summary}", batch.public_id);
    Ok(())
}

/// Reads the CSV and processes every row, returning the totals.
///
/// `batch_id` of `None` plans rows without writing.
async fn import_rows(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    aliases: &catimp_core::HeaderAliases,
    file: &Path,
    batch_id: Option<i64>,
) -> anyhow::Result<BatchSummary> {
    let mut reader = open_csv(file)?;
    let header_names: Vec<String> = reader
        .headers()
        .with_context(|| format!("failed to read CSV header of {}", file.display()))?
        .iter()
        .map(str::to_string)
        .collect();

    let reference = catimp_db::load_catalog_reference(pool)
        .await
        .context("failed to load catalog reference data")?;
    let mapper = RowMapper::new(&config.import, aliases, &reference);
    let headers = mapper.headers(&header_names);
    let media = MediaRoot::new(config.import.media_root.clone());

    let ctx = RowContext {
        pool,
        mapper: &mapper,
        headers: &headers,
        reference: &reference,
        media: &media,
        batch_id,
    };

    let mut summary = BatchSummary::default();
    let mut linker = RelationLinker::new();

    for (idx, result) in reader.records().enumerate() {
        let fallback_line = u64::try_from(idx).unwrap_or(u64::MAX).saturating_add(2);
        let outcome = match result {
            Ok(record) => {
                let row = to_row(&record, fallback_line);
                process_row(&ctx, &row, &mut linker).await
            }
            Err(e) => {
                let line = e.position().map_or(fallback_line, csv::Position::line);
                tracing::warn!(row = line, error = %e, "unreadable CSV record");
                RowOutcome::Failed {
                    line,
                    error: format!("unreadable CSV record: {e}"),
                }
            }
        };

        report(&outcome, batch_id.is_none());
        summary.record(&outcome);
    }

    Ok(summary)
}

fn open_csv(file: &Path) -> anyhow::Result<csv::Reader<BufReader<File>>> {
    let handle =
        File::open(file).with_context(|| format!("failed to open {}", file.display()))?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(handle)))
}

fn to_row(record: &StringRecord, fallback_line: u64) -> Row {
    Row {
        line: record.position().map_or(fallback_line, csv::Position::line),
        values: record.iter().map(str::to_string).collect(),
    }
}

/// Prints an outcome. Successful rows are only printed in a dry run.
fn report(outcome: &RowOutcome, dry_run: bool) {
    let print = match outcome {
        RowOutcome::Imported { warnings, .. } => !warnings.is_empty(),
        RowOutcome::Planned { .. } => dry_run,
        RowOutcome::Skipped { .. } | RowOutcome::Failed { .. } => true,
    };
    if print {
        println!("{outcome}");
        for warning in outcome.warnings() {
            println!("  warning: {warning}");
        }
    }
}

#[cfg(test)]
#[path = "import_test.rs"]
mod tests;
