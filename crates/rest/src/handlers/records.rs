//! CRUD handlers for tenant-scoped collections.
//!
//! Every handler takes the validated [`TenantContext`] attached by the
//! middleware; all storage access goes through the scoped store, and every
//! identifier a client supplies passes the attack detector first.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};

use castellan_core::entitlement::EntitlementAction;
use castellan_core::error::GuardError;
use castellan_core::plan::Metric;
use castellan_core::store::Filter;
use castellan_core::tenant::TenantContext;

use super::{entitlement_denied, render};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Query parameters for list requests.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Maximum number of records to return.
    pub limit: Option<usize>,
}

/// Collections whose row creation is a metered entitlement.
fn creation_metric(collection: &str) -> Option<Metric> {
    match collection {
        "users" => Some(Metric::Users),
        "companies" => Some(Metric::Companies),
        _ => None,
    }
}

/// GET `/collections/{collection}` - lists records in the caller's tenant.
pub async fn list_records(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(collection): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Value>> {
    let limit = params
        .limit
        .unwrap_or(state.default_page_size())
        .min(state.max_page_size());

    let records = state
        .store()
        .find_many(&ctx, &collection, Filter::new(), Some(limit))
        .await?;

    let items: Vec<Value> = records.iter().map(render).collect();
    Ok(Json(json!({ "items": items, "count": items.len() })))
}

/// POST `/collections/{collection}` - creates a record in the caller's
/// tenant.
///
/// The owner always comes from the context; any `tenant_id` in the payload
/// is discarded by the scoped store. For metered collections the
/// entitlement engine is consulted first and the usage counter incremented
/// after a successful create.
pub async fn create_record(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(collection): Path<String>,
    Json(mut body): Json<Value>,
) -> ApiResult<Response> {
    if !body.is_object() {
        return Err(ApiError::BadRequest {
            message: "request body must be a JSON object".to_string(),
        });
    }

    // A client-chosen id must pass the same shape checks as lookups.
    let id = match body.as_object_mut().and_then(|o| o.remove("id")) {
        Some(Value::String(id)) => {
            state.detector().validate_resource_id(&ctx, &id)?;
            Some(id)
        }
        Some(_) => {
            return Err(ApiError::BadRequest {
                message: "id must be a string".to_string(),
            });
        }
        None => None,
    };

    let metric = creation_metric(&collection);
    if let Some(metric) = metric {
        let decision = state
            .engine()
            .check(&ctx, &EntitlementAction::Metered(metric), 1)
            .await;
        if !decision.allowed {
            return Ok(entitlement_denied(&decision));
        }
    }

    let record = state.store().create(&ctx, &collection, id, body).await?;
    if let Some(metric) = metric {
        state.meter().add(ctx.tenant_id(), metric, 1).await.map_err(
            castellan_core::CoreError::from,
        )?;
    }

    Ok((StatusCode::CREATED, Json(render(&record))).into_response())
}

/// GET `/collections/{collection}/{id}` - reads one record.
///
/// The ownership check runs first; a missing record and a record in another
/// tenant produce the identical 404.
pub async fn get_record(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path((collection, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    state.detector().validate_ownership(&ctx, &collection, &id).await?;

    let record = state
        .store()
        .find_one(&ctx, &collection, Filter::by("id", id))
        .await?
        .ok_or(GuardError::NotFound)
        .map_err(castellan_core::CoreError::from)?;

    Ok(Json(render(&record)))
}

/// PATCH `/collections/{collection}/{id}` - patches one record.
///
/// The body is a shallow JSON-object merge; a `null` value removes a key.
pub async fn update_record(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path((collection, id)): Path<(String, String)>,
    Json(patch): Json<Value>,
) -> ApiResult<Json<Value>> {
    if !patch.is_object() {
        return Err(ApiError::BadRequest {
            message: "patch body must be a JSON object".to_string(),
        });
    }
    state.detector().validate_ownership(&ctx, &collection, &id).await?;

    let updated = state
        .store()
        .update(&ctx, &collection, Filter::by("id", id), patch)
        .await?;
    let record = updated
        .first()
        .ok_or(GuardError::NotFound)
        .map_err(castellan_core::CoreError::from)?;

    Ok(Json(render(record)))
}

/// DELETE `/collections/{collection}/{id}` - soft-deletes one record.
pub async fn delete_record(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path((collection, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state.detector().validate_ownership(&ctx, &collection, &id).await?;

    let deleted = state
        .store()
        .delete(&ctx, &collection, Filter::by("id", id))
        .await?;
    if deleted == 0 {
        return Err(castellan_core::CoreError::from(GuardError::NotFound).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Request body for bulk reads.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    /// The identifiers to fetch.
    pub ids: Vec<String>,
}

/// POST `/collections/{collection}/_batch` - fetches many records by id.
///
/// The batch passes the detector as a whole before any lookup: oversized
/// batches and constant-step identifier progressions are rejected outright.
pub async fn batch_get_records(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Path(collection): Path<String>,
    Json(request): Json<BatchRequest>,
) -> ApiResult<Json<Value>> {
    state.detector().validate_batch(&ctx, &request.ids)?;
    if request.ids.is_empty() {
        return Ok(Json(json!({ "items": [], "count": 0 })));
    }

    let mut filter = Filter::new();
    for id in &request.ids {
        filter = filter.or(Filter::by("id", id.as_str()));
    }

    let records = state
        .store()
        .find_many(&ctx, &collection, filter, None)
        .await?;
    let items: Vec<Value> = records.iter().map(render).collect();
    Ok(Json(json!({ "items": items, "count": items.len() })))
}
