use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::database::models::AdminUser;
use crate::database::{DatabaseManager, Repository};
use crate::filter::FilterData;
use crate::scope::{Requester, RoleDescriptor, Scope, ScopeColumns};

pub async fn handle(admin: Uuid, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect().await?;
    let found = Repository::<AdminUser>::new("admin_users")
        .select_one(&pool, FilterData::with_where(json!({ "id": admin })))
        .await?;

    let Some(user) = found else {
        output_error(output_format, &format!("Admin {} not found", admin))?;
        anyhow::bail!("admin not found");
    };

    let requester = Requester::resolve(&RoleDescriptor::from(&user));
    let scope = Scope::for_requester(&requester);

    output_success(
        output_format,
        &format!("Scope of {} ({})", user.name, user.email),
        Some(json!({
            "tier": requester.tier().map(|t| t.as_str()).unwrap_or("none"),
            "active": user.is_active,
            "requester": format!("{:?}", requester),
            "venue_filter": scope.to_filter(ScopeColumns::VENUES),
            "slot_time_filter": scope.to_filter(ScopeColumns::SLOT_TIMES),
        })),
    )
}
