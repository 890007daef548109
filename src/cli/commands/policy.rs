use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{or_dash, output_table};
use crate::cli::OutputFormat;
use crate::policy::PolicyRegistry;

#[derive(Subcommand)]
pub enum PolicyCommands {
    #[command(about = "List every operation with its scope, roles and minimum tier")]
    List,
}

pub async fn handle(cmd: PolicyCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let registry = PolicyRegistry::standard();

    match cmd {
        PolicyCommands::List => {
            match output_format {
                OutputFormat::Json => {
                    let policies: Vec<_> = registry
                        .iter()
                        .map(|(operation, requirement)| {
                            json!({
                                "operation": operation,
                                "scope": requirement.scope,
                                "roles": requirement.roles,
                                "min_tier": requirement.min_tier,
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&json!({ "policies": policies }))?);
                }
                OutputFormat::Text => {
                    let rows: Vec<Vec<String>> = registry
                        .iter()
                        .map(|(operation, requirement)| {
                            let roles = requirement.roles.as_ref().map(|roles| {
                                roles.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(",")
                            });
                            vec![
                                operation.to_string(),
                                format!("{:?}", requirement.scope),
                                or_dash(roles),
                                or_dash(requirement.min_tier),
                            ]
                        })
                        .collect();
                    output_table(&["OPERATION", "SCOPE", "ROLES", "MIN TIER"], &[36, 13, 20, 12], &rows);
                }
            }
            Ok(())
        }
    }
}
