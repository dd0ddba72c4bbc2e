//! Plan introspection endpoint.

use axum::{Extension, Json, extract::State};
use serde_json::{Value, json};

use castellan_core::tenant::TenantContext;

use crate::error::ApiResult;
use crate::state::AppState;

/// GET `/plan` - returns the caller's current tier and its entitlements.
///
/// The registry integrity hash is included so operators can verify a
/// deployment is running the plan definitions they expect.
pub async fn get_plan(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
) -> ApiResult<Json<Value>> {
    let tier = state.engine().resolve_tier(ctx.tenant_id()).await?;
    let definition = state.engine().registry().get(tier);

    Ok(Json(json!({
        "tier": tier,
        "display_name": definition.display_name,
        "entitlements": definition.entitlements,
        "registry_integrity": state.engine().registry().integrity_hash(),
    })))
}
