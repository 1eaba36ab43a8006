use serde_json::{json, Value};

use crate::auth::{IdentitySource, SessionIdentity};
use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(Value::Object(fields)) = data {
                if let Some(object) = response.as_object_mut() {
                    object.extend(fields);
                }
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Print an identity; text output lists the fields one per line
pub fn output_identity(
    output_format: OutputFormat,
    message: &str,
    identity: &SessionIdentity,
    source: IdentitySource,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => output_success(
            output_format,
            message,
            Some(json!({ "source": source, "identity": identity })),
        ),
        OutputFormat::Text => {
            println!("✓ {}", message);
            for line in identity_lines(identity, source) {
                println!("  {}", line);
            }
            Ok(())
        }
    }
}

fn identity_lines(identity: &SessionIdentity, source: IdentitySource) -> Vec<String> {
    let mut lines = vec![
        format!("Source:      {:?}", source),
        format!("Subject:     {}", identity.id),
        format!("Email:       {}", identity.email),
        format!("Name:        {}", identity.name),
        format!("Roles:       {}", display_list(&identity.roles)),
        format!("Permissions: {}", display_list(&identity.permissions)),
    ];
    if let Some(exp) = identity.exp.and_then(|exp| chrono::DateTime::from_timestamp(exp, 0)) {
        lines.push(format!("Expires:     {}", exp.to_rfc3339()));
    }
    lines
}

fn display_list(values: &[String]) -> String {
    if values.is_empty() {
        "(none)".to_string()
    } else {
        values.join(", ")
    }
}
