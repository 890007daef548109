use anyhow::{anyhow, Context};
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_success, output_table};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::DatabaseManager;
use crate::migration::migrator::DOWN_MESSAGE;
use crate::migration::{MigrationPlan, MigrationReport, PgMigrationStore, TenantBackfillMigrator};

#[derive(Subcommand)]
pub enum BackfillCommands {
    #[command(about = "Show tables in execution order with their derivation rule")]
    Plan,

    #[command(about = "Add, backfill and enforce organization_id on every planned table")]
    Run {
        #[arg(long, help = "Slug of the organization that receives rows with no derivable owner")]
        default_org: Option<String>,

        #[arg(long, help = "Re-run every step, ignoring recorded checkpoints")]
        ignore_checkpoints: bool,
    },

    #[command(about = "Describe the reverse direction (no changes are made)")]
    Down,
}

pub async fn handle(cmd: BackfillCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let plan = MigrationPlan::standard()?;

    match cmd {
        BackfillCommands::Plan => {
            match output_format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "fingerprint": plan.fingerprint(),
                            "tables": plan.tables(),
                        }))?
                    );
                }
                OutputFormat::Text => {
                    let rows: Vec<Vec<String>> = plan
                        .tables()
                        .iter()
                        .enumerate()
                        .map(|(i, t)| vec![(i + 1).to_string(), t.table.clone(), t.derivation.to_string()])
                        .collect();
                    output_table(&["#", "TABLE", "DERIVATION"], &[3, 20, 40], &rows);
                    println!("\nfingerprint: {}", plan.fingerprint());
                }
            }
            Ok(())
        }
        BackfillCommands::Run { default_org, ignore_checkpoints } => {
            let config = config();
            let slug = default_org
                .or_else(|| config.migration.default_organization_slug.clone())
                .ok_or_else(|| anyhow!("No default organization: pass --default-org or set MIGRATION_DEFAULT_ORGANIZATION"))?;

            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("Failed to connect to the database")?;
            let migrator = TenantBackfillMigrator::new(PgMigrationStore::new(pool), plan, slug)
                .with_checkpoints(config.migration.use_checkpoints && !ignore_checkpoints);

            let report = migrator.run().await?;
            print_report(&report, output_format)
        }
        BackfillCommands::Down => {
            tracing::warn!("Tenant backfill down requested; nothing will be changed");
            output_success(output_format, DOWN_MESSAGE, Some(json!({ "changed": false })))
        }
    }
}

fn print_report(report: &MigrationReport, output_format: OutputFormat) -> anyhow::Result<()> {
    let message = if report.changed_anything() {
        "Tenant backfill complete"
    } else {
        "Tenant backfill complete, nothing to change"
    };

    match output_format {
        OutputFormat::Json => output_success(output_format, message, Some(serde_json::to_value(report)?)),
        OutputFormat::Text => {
            let rows: Vec<Vec<String>> = report
                .tables
                .iter()
                .map(|t| {
                    vec![
                        t.table.clone(),
                        t.derived.to_string(),
                        t.defaulted.to_string(),
                        if t.made_not_null { "yes" } else { "-" }.to_string(),
                        if t.foreign_key_added { "yes" } else { "-" }.to_string(),
                        t.skipped_steps.len().to_string(),
                    ]
                })
                .collect();
            output_table(&["TABLE", "DERIVED", "DEFAULTED", "NOT NULL", "FK", "SKIPPED"], &[20, 8, 10, 9, 4, 7], &rows);
            println!("\ndefault organization: {}", report.default_organization);
            output_success(output_format, message, None)
        }
    }
}
