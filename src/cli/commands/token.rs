use clap::Subcommand;
use serde_json::json;

use crate::auth::{InternalTokenService, SessionIdentity, DEFAULT_ROLE};
use crate::cli::utils::{output_error, output_identity, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Mint an internal token signed with JWT_SECRET")]
    Issue {
        #[arg(long, help = "Subject id")]
        subject: String,
        #[arg(long, help = "Email address")]
        email: String,
        #[arg(long, help = "Display name (defaults to the email)")]
        name: Option<String>,
        #[arg(long = "role", help = "Role (repeatable)")]
        roles: Vec<String>,
        #[arg(long = "permission", help = "Permission as resource:action (repeatable)")]
        permissions: Vec<String>,
        #[arg(long, help = "Lifetime in hours (defaults to JWT_EXPIRY_HOURS)")]
        hours: Option<u64>,
    },

    #[command(about = "Verify a token through both verification paths")]
    Verify {
        #[arg(help = "Bearer token")]
        token: String,
    },
}

pub async fn handle(cmd: TokenCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue {
            subject,
            email,
            name,
            roles,
            permissions,
            hours,
        } => {
            let identity = build_identity(subject, email, name, roles, permissions);
            let service = InternalTokenService::new(
                &config.auth.jwt_secret,
                hours.unwrap_or(config.auth.jwt_expiry_hours),
            );
            let (token, identity) = service.issue(&identity)?;

            match output_format {
                OutputFormat::Json => output_success(
                    output_format,
                    &format!("Issued token for '{}'", identity.id),
                    Some(json!({ "token": token, "identity": identity })),
                ),
                // Bare token on stdout so it can be captured by scripts
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
            }
        }
        TokenCommands::Verify { token } => match super::resolve_identity(config, &token).await? {
            Some((identity, source)) => output_identity(output_format, "Token verified", &identity, source),
            None => {
                output_error(output_format, "Token could not be verified", Some("UNAUTHORIZED"))?;
                anyhow::bail!("token could not be verified")
            }
        },
    }
}

fn build_identity(
    subject: String,
    email: String,
    name: Option<String>,
    roles: Vec<String>,
    permissions: Vec<String>,
) -> SessionIdentity {
    let roles = if roles.is_empty() {
        vec![DEFAULT_ROLE.to_string()]
    } else {
        roles
    };

    SessionIdentity {
        id: subject,
        name: name.unwrap_or_else(|| email.clone()),
        email,
        roles,
        permissions,
        iat: None,
        exp: None,
    }
}
