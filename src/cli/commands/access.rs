use clap::Subcommand;
use serde_json::json;

use crate::auth::{require_permission, require_role, AccessError, SessionIdentity};
use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum AccessCommands {
    #[command(about = "Verify a token, then check roles and permissions against it")]
    Check {
        #[arg(help = "Bearer token")]
        token: String,
        #[arg(long = "role", help = "Allowed role (repeatable; any one suffices)")]
        roles: Vec<String>,
        #[arg(long = "permission", help = "Accepted permission (repeatable; any one suffices)")]
        permissions: Vec<String>,
    },
}

pub async fn handle(cmd: AccessCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AccessCommands::Check {
            token,
            roles,
            permissions,
        } => {
            let resolved = super::resolve_identity(config, &token).await?;
            let identity = resolved.as_ref().map(|(identity, _)| identity);

            match evaluate(identity, &roles, &permissions) {
                Ok(()) => output_success(
                    output_format,
                    &format!("Access allowed for '{}'", identity.map(|i| i.id.as_str()).unwrap_or_default()),
                    Some(json!({ "allowed": true })),
                ),
                Err(e) => {
                    let code = if e.is_forbidden() { "FORBIDDEN" } else { "UNAUTHORIZED" };
                    output_error(output_format, &format!("Access denied: {}", e), Some(code))?;
                    anyhow::bail!("access denied")
                }
            }
        }
    }
}

/// Role check first, then permission check; empty requirement lists are skipped
fn evaluate(identity: Option<&SessionIdentity>, roles: &[String], permissions: &[String]) -> Result<(), AccessError> {
    let identity = identity.ok_or(AccessError::Unauthenticated)?;
    if !roles.is_empty() {
        require_role(Some(identity), roles)?;
    }
    if !permissions.is_empty() {
        require_permission(Some(identity), permissions)?;
    }
    Ok(())
}
