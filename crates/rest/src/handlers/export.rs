//! Export endpoint, the canonical metered operation.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use castellan_core::entitlement::EntitlementAction;
use castellan_core::plan::Metric;
use castellan_core::tenant::TenantContext;

use super::entitlement_denied;
use crate::error::ApiResult;
use crate::state::AppState;

/// Request body for exports.
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    /// Number of exports to perform.
    #[serde(default = "default_count")]
    pub count: u64,
}

fn default_count() -> u64 {
    1
}

/// POST `/collections/{collection}/export` - runs a metered export.
///
/// The entitlement check and the usage increment are separate steps: the
/// check projects `current + count` against the plan's limits, and only a
/// grant reaches the meter. Soft-limit grants come back with `warn` set so
/// clients can surface the approaching limit.
pub async fn export_records(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(collection): Path<String>,
    Json(request): Json<ExportRequest>,
) -> ApiResult<Response> {
    let action = EntitlementAction::Metered(Metric::ExportsPerMonth);
    let decision = state.engine().check(&ctx, &action, request.count).await;
    if !decision.allowed {
        return Ok(entitlement_denied(&decision));
    }

    let total = state
        .meter()
        .add(ctx.tenant_id(), Metric::ExportsPerMonth, request.count)
        .await
        .map_err(castellan_core::CoreError::from)?;

    Ok(Json(json!({
        "collection": collection,
        "exported": request.count,
        "total_this_period": total,
        "decision": decision,
    }))
    .into_response())
}
