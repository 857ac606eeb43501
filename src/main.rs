use anyhow::Context;
use clap::Parser;
use drive_audit::auth::{drive_hub, load_service_account_json, sheets_hub};
use drive_audit::drive::GoogleDrive;
use drive_audit::sheets::GoogleSheet;
use drive_audit::{AuditConfig, CallBudget, ConfigArgs, HighlightKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Drive Audit - records link-shared Drive files in a review spreadsheet
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A local .env never overrides the real environment
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = AuditConfig::resolve(args.config).context("invalid configuration")?;

    info!(
        "Auditing {} into spreadsheet {} (max {} files)",
        config.folder_id.as_deref().unwrap_or("all visible files"),
        config.spreadsheet_id,
        config.max_files
    );

    let key_json = load_service_account_json(&config.credentials).await?;
    let drive = GoogleDrive::new(drive_hub(&key_json).await?, config.folder_id.clone());
    let sheet = GoogleSheet::new(sheets_hub(&key_json).await?, config.spreadsheet_id.clone());
    let mut budget = CallBudget::new(config.rate_limit);

    match drive_audit::run(&drive, &sheet, &mut budget, &config.audit_options()).await {
        Ok(outcome) => {
            info!(
                "Audit complete: {} rows, {} shared folders and {} shared items unapproved{}",
                outcome.rows.len(),
                outcome.flagged_by(HighlightKind::SharedFolder),
                outcome.flagged_by(HighlightKind::SharedFile),
                if outcome.written { "" } else { " (not written)" }
            );
            Ok(())
        }
        Err(err) => {
            error!(category = ?err.category(), "Audit failed: {}", err);
            Err(err.into())
        }
    }
}
