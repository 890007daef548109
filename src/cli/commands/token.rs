use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::auth::TokenService;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a bearer token for a user id using JWT_SECRET")]
    Issue {
        #[arg(long, help = "User id to put in the token subject")]
        user: Uuid,
    },

    #[command(about = "Verify a bearer token and print its claims")]
    Verify {
        #[arg(help = "Token to verify")]
        token: String,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let tokens = TokenService::from_config(&config().security);

    match cmd {
        TokenCommands::Issue { user } => {
            let token = tokens.issue(user)?;
            match output_format {
                OutputFormat::Json => output_success(
                    output_format,
                    "Token issued",
                    Some(json!({
                        "token": token,
                        "token_type": "Bearer",
                        "expires_in": tokens.expires_in_seconds(),
                    })),
                ),
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
            }
        }
        TokenCommands::Verify { token } => {
            let claims = tokens.verify(&token)?;
            output_success(
                output_format,
                &format!("Token valid for user {}", claims.sub),
                Some(json!({ "sub": claims.sub, "iat": claims.iat, "exp": claims.exp })),
            )
        }
    }
}
