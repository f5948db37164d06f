use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

/// Signs with the configured secret; the server only accepts it when it
/// shares that secret and the admin exists
pub fn handle(admin: Uuid, email: String, output_format: OutputFormat) -> anyhow::Result<()> {
    crate::config::config().validate()?;
    let claims = Claims::new(admin, email);
    let token = generate_jwt(&claims)?;
    output_success(
        output_format,
        "Token issued",
        Some(json!({
            "admin_id": admin,
            "expires_at": claims.exp,
            "token": token,
        })),
    )
}
