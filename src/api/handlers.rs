use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::de::DeserializeOwned;

use crate::errors::AppError;
use crate::middleware::auth::Identity;
use crate::middleware::rbac::{self, READERS, WRITERS};
use crate::models::envelope::respond;
use crate::models::object::{ObjectPatch, ObjectPayload};
use crate::store::with_deadline;
use crate::AppState;

// ── Messages ─────────────────────────────────────────────────

const OBJECT_NOT_AVAILABLE: &str = "Object with given ID not available";
const OBJECTS_NOT_AVAILABLE: &str = "Objects with given IDs not available";
const OBJECT_ID_MISSING: &str = "object ID is missing";
const RETRIEVE_FAILED: &str = "could not retrieve requested object. Try again later";
const LIST_FAILED: &str = "could not retrieve objects. Try again later";
const CREATE_INVALID: &str = "Could not create object, invalid payload provided";
const CREATE_FAILED: &str = "error creating object, try again later";
const UPDATE_INVALID: &str = "Could not update object, invalid payload provided";
const UPDATE_FAILED: &str = "error updating object, try again later";
const DELETE_FAILED: &str = "error deleting object, try again later";

// ── Helpers ──────────────────────────────────────────────────

fn decode_body<T: DeserializeOwned>(body: &Bytes, invalid: &str) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "rejected request payload");
        AppError::Validation(invalid.to_string())
    })
}

/// Unwrap the `:id` segment; a rejected or blank id is a 400 envelope.
fn require_id(path: Result<Path<String>, PathRejection>) -> Result<String, AppError> {
    match path {
        Ok(Path(id)) if !id.trim().is_empty() => Ok(id),
        Ok(_) => Err(AppError::Validation(OBJECT_ID_MISSING.to_string())),
        Err(e) => {
            tracing::debug!(error = %e, "rejected object id");
            Err(AppError::Validation(OBJECT_ID_MISSING.to_string()))
        }
    }
}

/// Collect the `id` query values. `None` means no `id` was given at all;
/// an `id` with an empty value cannot match any object.
fn requested_ids(
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Option<Vec<String>>, AppError> {
    let Query(params) = query.map_err(|e| {
        tracing::debug!(error = %e, "rejected list query");
        AppError::Validation(OBJECTS_NOT_AVAILABLE.to_string())
    })?;

    let ids: Vec<String> = params
        .into_iter()
        .filter(|(key, _)| key == "id")
        .map(|(_, value)| value)
        .collect();

    if ids.is_empty() {
        return Ok(None);
    }
    if ids.iter().any(|id| id.trim().is_empty()) {
        return Err(AppError::Validation(OBJECTS_NOT_AVAILABLE.to_string()));
    }
    Ok(Some(ids))
}

// ── Handlers ─────────────────────────────────────────────────

/// GET /api/v1/objects: list every object, or `?id=1&id=2` to fetch a set
pub async fn list_objects(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response, AppError> {
    rbac::enforce(&identity, READERS)?;

    let deadline = state.config.request_timeout;

    let Some(ids) = requested_ids(query)? else {
        let objects = with_deadline(deadline, state.store.list_objects())
            .await
            .map_err(|e| AppError::from_store(e, "No objects available", LIST_FAILED))?;

        tracing::debug!(count = objects.len(), "listed objects");
        return Ok(respond(StatusCode::OK, "Successfully retrieved all objects", Some(objects)));
    };

    let objects = with_deadline(deadline, state.store.get_objects_by_ids(&ids))
        .await
        .map_err(|e| AppError::from_store(e, OBJECTS_NOT_AVAILABLE, LIST_FAILED))?;

    Ok(respond(
        StatusCode::OK,
        "Successfully retrieved requested objects",
        Some(objects),
    ))
}

/// GET /api/v1/objects/:id: fetch a single object
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError> {
    rbac::enforce(&identity, READERS)?;
    let id = require_id(path)?;

    let object = with_deadline(state.config.request_timeout, state.store.get_object(&id))
        .await
        .map_err(|e| AppError::from_store(e, OBJECT_NOT_AVAILABLE, RETRIEVE_FAILED))?;

    Ok(respond(StatusCode::OK, "Successfully retrieved object", Some(object)))
}

/// POST /api/v1/objects: create a new object upstream (admin only)
pub async fn create_object(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    body: Bytes,
) -> Result<Response, AppError> {
    rbac::enforce(&identity, WRITERS)?;

    let payload: ObjectPayload = decode_body(&body, CREATE_INVALID)?;
    if !payload.is_valid() {
        return Err(AppError::Validation(CREATE_INVALID.to_string()));
    }

    let created = with_deadline(state.config.request_timeout, state.store.create_object(&payload))
        .await
        .map_err(|e| AppError::upstream(e, CREATE_FAILED))?;

    tracing::info!(id = %created.id, name = %created.name, "object created");
    Ok(respond(StatusCode::OK, "Successfully created the object", Some(created)))
}

/// PUT /api/v1/objects/:id: replace an object (admin only)
pub async fn update_object(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    path: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> Result<Response, AppError> {
    rbac::enforce(&identity, WRITERS)?;
    let id = require_id(path)?;

    let payload: ObjectPayload = decode_body(&body, UPDATE_INVALID)?;
    if !payload.is_valid() {
        return Err(AppError::Validation(UPDATE_INVALID.to_string()));
    }

    let updated = with_deadline(
        state.config.request_timeout,
        state.store.update_object(&id, &payload),
    )
    .await
    .map_err(|e| AppError::from_store(e, OBJECT_NOT_AVAILABLE, UPDATE_FAILED))?;

    tracing::info!(id = %updated.id, "object updated");
    Ok(respond(StatusCode::OK, "Successfully updated the object", Some(updated)))
}

/// PATCH /api/v1/objects/:id: update some fields of an object (admin only)
pub async fn patch_object(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    path: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> Result<Response, AppError> {
    rbac::enforce(&identity, WRITERS)?;
    let id = require_id(path)?;

    let patch: ObjectPatch = decode_body(&body, UPDATE_INVALID)?;
    if !patch.is_valid() {
        return Err(AppError::Validation(UPDATE_INVALID.to_string()));
    }

    let updated = with_deadline(
        state.config.request_timeout,
        state.store.patch_object(&id, &patch),
    )
    .await
    .map_err(|e| AppError::from_store(e, OBJECT_NOT_AVAILABLE, UPDATE_FAILED))?;

    tracing::info!(id = %updated.id, "object partially updated");
    Ok(respond(StatusCode::OK, "Successfully updated the object", Some(updated)))
}

/// DELETE /api/v1/objects/:id: delete an object (admin only)
pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError> {
    rbac::enforce(&identity, WRITERS)?;
    let id = require_id(path)?;

    let confirmation = with_deadline(state.config.request_timeout, state.store.delete_object(&id))
        .await
        .map_err(|e| AppError::from_store(e, OBJECT_NOT_AVAILABLE, DELETE_FAILED))?;

    tracing::info!(id = %id, "object deleted");
    Ok(respond(StatusCode::OK, "Successfully deleted the object", Some(confirmation)))
}
