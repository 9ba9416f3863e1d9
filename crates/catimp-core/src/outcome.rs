//! Per-row results and batch totals.

use serde::Serialize;

/// The result of processing one CSV row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RowOutcome {
    Imported {
        line: u64,
        sku: String,
        product_id: i64,
        variants: usize,
        /// Sub-steps that failed without aborting the row (images, relations,
        /// unmatched option values).
        warnings: Vec<String>,
    },
    /// Dry run: the row would be imported.
    Planned {
        line: u64,
        sku: String,
        variants: usize,
        warnings: Vec<String>,
    },
    Skipped {
        line: u64,
        sku: String,
        reason: String,
    },
    Failed {
        line: u64,
        error: String,
    },
}

impl RowOutcome {
    #[must_use]
    pub fn line(&self) -> u64 {
        match self {
            RowOutcome::Imported { line, .. }
            | RowOutcome::Planned { line, .. }
            | RowOutcome::Skipped { line, .. }
            | RowOutcome::Failed { line, .. } => *line,
        }
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        match self {
            RowOutcome::Imported { warnings, .. } | RowOutcome::Planned { warnings, .. } => {
                warnings
            }
            RowOutcome::Skipped { .. } | RowOutcome::Failed { .. } => &[],
        }
    }
}

impl std::fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowOutcome::Imported {
                line,
                sku,
                product_id,
                variants,
                warnings,
            } => write!(
                f,
                "line {line}: imported {sku} as product {product_id} ({variants} variants, {} warnings)",
                warnings.len()
            ),
            RowOutcome::Planned {
                line,
                sku,
                variants,
                warnings,
            } => write!(
                f,
                "line {line}: would import {sku} ({variants} variants, {} warnings)",
                warnings.len()
            ),
            RowOutcome::Skipped { line, sku, reason } => {
                write!(f, "line {line}: skipped {sku}: {reason}")
            }
            RowOutcome::Failed { line, error } => write!(f, "line {line}: failed: {error}"),
        }
    }
}

/// Running totals for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub rows: i32,
    pub imported: i32,
    pub planned: i32,
    pub skipped: i32,
    pub failed: i32,
    pub warnings: i32,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &RowOutcome) {
        self.rows = self.rows.saturating_add(1);
        let warnings = i32::try_from(outcome.warnings().len()).unwrap_or(i32::MAX);
        self.warnings = self.warnings.saturating_add(warnings);
        let counter = match outcome {
            RowOutcome::Imported { .. } => &mut self.imported,
            RowOutcome::Planned { .. } => &mut self.planned,
            RowOutcome::Skipped { .. } => &mut self.skipped,
            RowOutcome::Failed { .. } => &mut self.failed,
        };
        *counter = counter.saturating_add(1);
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} rows: {} imported, {} planned, {} skipped, {} failed, {} warnings",
            self.rows, self.imported, self.planned, self.skipped, self.failed, self.warnings
        )
    }
}
