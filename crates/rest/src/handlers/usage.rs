//! Usage snapshot endpoint.

use axum::{Extension, Json, extract::State};
use serde_json::{Value, json};

use castellan_core::tenant::TenantContext;

use crate::error::ApiResult;
use crate::state::AppState;

/// GET `/usage` - returns the caller's counters for the current billing
/// period.
///
/// Metrics with no activity yet are simply absent; clients treat absence as
/// zero.
pub async fn get_usage(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
) -> ApiResult<Json<Value>> {
    let snapshot = state
        .meter()
        .snapshot(ctx.tenant_id())
        .await
        .map_err(castellan_core::CoreError::from)?;

    Ok(Json(json!({
        "period": snapshot.period.key(),
        "counters": snapshot.tracked(),
    })))
}
