//! Instance REST handlers.
//!
//! Each handler goes through the dispatcher's repository and returns the
//! instance record (or a projection of it) as JSON.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use marquee_state::{Instance, InstanceStatus};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{ApiError, ApiState};

/// Actor named in notifications for deploys triggered over HTTP.
pub const HTTP_ACTOR: &str = "api";

/// POST /instances body.
#[derive(Debug, Deserialize)]
pub struct CreateInstanceRequest {
    pub playbook_id: Option<String>,
    pub id: Option<String>,
    #[serde(default)]
    pub status: InstanceStatus,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    #[serde(default)]
    pub created_time: i64,
}

/// Reject empty identifiers and identifiers that would reshape the key.
fn required_id(field: &str, value: Option<String>) -> Result<String, ApiError> {
    match value {
        None => Err(ApiError::BadRequest(format!("Missing: {field}"))),
        Some(v) if v.is_empty() => Err(ApiError::BadRequest(format!("Missing: {field}"))),
        Some(v) if v.contains('/') => Err(ApiError::BadRequest(format!("Invalid: {field}"))),
        Some(v) => Ok(v),
    }
}

/// POST /instances
pub async fn create_instance(
    State(state): State<ApiState>,
    body: Result<Json<CreateInstanceRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|e| {
        warn!(error = %e, "rejected instance body");
        ApiError::BadRequest("Bad Request".to_string())
    })?;

    let mut instance = Instance {
        playbook_id: required_id("playbook_id", req.playbook_id)?,
        id: required_id("id", req.id)?,
        status: req.status,
        vars: req.vars,
        created_time: req.created_time,
    };
    // Re-creating an existing instance keeps its first-persistence time.
    match state.dispatcher.repository().find_by_id(&instance.playbook_id, &instance.id) {
        Ok(existing) => instance.created_time = existing.created_time,
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }
    instance.stamp_created();

    state.dispatcher.repository().save(&instance)?;
    info!(playbook = %instance.playbook_id, instance = %instance.id, "instance created");
    Ok((StatusCode::CREATED, Json(instance)))
}

/// GET /instance/{playbook_id}/{instance_id}
pub async fn get_instance(
    State(state): State<ApiState>,
    Path((playbook_id, instance_id)): Path<(String, String)>,
) -> Result<Json<Instance>, ApiError> {
    let instance = state
        .dispatcher
        .repository()
        .find_by_id(&playbook_id, &instance_id)?;
    Ok(Json(instance))
}

/// GET /instances/{playbook_id}
///
/// An unknown or empty playbook is `200 []`.
pub async fn list_instances(
    State(state): State<ApiState>,
    Path(playbook_id): Path<String>,
) -> Result<Json<Vec<Instance>>, ApiError> {
    let instances = state
        .dispatcher
        .repository()
        .find_by_playbook_id(&playbook_id)
        .inspect_err(|e| {
            warn!(playbook = %playbook_id, decoded = e.decoded.len(), "listing incomplete");
        })?;
    Ok(Json(instances))
}

/// GET /status/{playbook_id}/{instance_id}
pub async fn get_status(
    State(state): State<ApiState>,
    Path((playbook_id, instance_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    required_id("playbook_id", Some(playbook_id.clone()))?;
    required_id("instance_id", Some(instance_id.clone()))?;
    let instance = state
        .dispatcher
        .repository()
        .find_by_id(&playbook_id, &instance_id)?;
    Ok(Json(serde_json::json!({ "status": instance.status })))
}

/// DELETE /instance/{playbook_id}/{instance_id}
///
/// Teardown goes through the deployment engine; an instance it refuses to
/// remove (still deploying or deleting) is a 500 and keeps its record.
pub async fn delete_instance(
    State(state): State<ApiState>,
    Path((playbook_id, instance_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .dispatcher
        .destroy(&playbook_id, &instance_id, HTTP_ACTOR)?;
    info!(playbook = %playbook_id, instance = %instance_id, "instance deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// POST /deploy/{playbook_id}/{instance_id}
pub async fn deploy_instance(
    State(state): State<ApiState>,
    Path((playbook_id, instance_id)): Path<(String, String)>,
) -> Result<Json<Instance>, ApiError> {
    let instance = state
        .dispatcher
        .deploy(&playbook_id, &instance_id, HTTP_ACTOR)?;
    Ok(Json(instance))
}
