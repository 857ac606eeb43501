use crate::error::AuditError;
use crate::inventory::{build_inventory, DriveSource, MAX_FILES_PER_RUN};
use crate::rate_limit::CallBudget;
use crate::reconcile::{reconcile, ReconciledRow};
use crate::report::{render, HighlightKind, Report, SheetStore};
use crate::snapshot::read_snapshot;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditOptions {
    pub max_files: usize,
    pub dry_run: bool,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            max_files: MAX_FILES_PER_RUN,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditOutcome {
    pub rows: Vec<ReconciledRow>,
    pub report: Report,
    /// Rows matched per highlight rule, in rule order.
    pub flagged: Vec<(HighlightKind, usize)>,
    pub written: bool,
}

impl AuditOutcome {
    pub fn flagged_by(&self, kind: HighlightKind) -> usize {
        self.flagged
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, count)| *count)
            .unwrap_or_default()
    }
}

/// One full audit: read approvals, rebuild the inventory, join, then write.
///
/// Nothing is written until the report is complete, so a failure anywhere before the
/// write leaves the sheet untouched.
pub async fn run(
    drive: &dyn DriveSource,
    sheet: &dyn SheetStore,
    budget: &mut CallBudget,
    options: &AuditOptions,
) -> Result<AuditOutcome, AuditError> {
    info!("Fetching existing spreadsheet");
    let snapshot = read_snapshot(&sheet.read_table().await?)?;
    info!("Snapshot holds {} approval entries", snapshot.len());

    let inventory = build_inventory(drive, budget, options.max_files).await?;
    let rows = reconcile(&inventory, &snapshot);
    let report = render(&rows);

    for row in &rows {
        debug!(?row, "Reconciled row");
    }
    let flagged: Vec<(HighlightKind, usize)> = report
        .highlight_rules
        .iter()
        .map(|rule| (rule.kind, rows.iter().filter(|r| rule.applies_to(r)).count()))
        .collect();
    for (kind, count) in &flagged {
        info!("{:?} rule flags {} of {} rows", kind, count, rows.len());
    }

    if options.dry_run {
        info!(
            "Dry run, leaving the spreadsheet untouched:\n{}",
            serde_json::to_string_pretty(&rows)?
        );
        return Ok(AuditOutcome {
            rows,
            report,
            flagged,
            written: false,
        });
    }

    sheet.overwrite_rows(&report.table()).await?;
    sheet.replace_highlight_rules(&report.highlight_rules).await?;
    if let Some(validation) = &report.validation {
        sheet.set_checkbox_validation(validation).await?;
    }

    Ok(AuditOutcome {
        rows,
        report,
        flagged,
        written: true,
    })
}
