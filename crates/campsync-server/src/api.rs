//! HTTP API for content sync, gated content and unlock checks

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use campsync::content::visible_entries;
use campsync::ports::StaticLocation;
use campsync::{
    ArtInstallation, CleanupPlan, ContentPackage, Coordinate, SyncPlan, ThemeCamp,
    UnlockDecision, UserLocation,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Create the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sync/full", post(full_sync))
        .route("/sync/incremental", post(incremental_sync))
        .route("/art-installations", get(list_art_installations))
        .route("/theme-camps", get(list_theme_camps))
        .route("/unlock/evaluate", post(evaluate_unlock))
        .route("/storage/cleanup", post(plan_cleanup))
        .route("/catalog", get(list_catalog))
        .with_state(state)
}

/// Health check endpoint
async fn health() -> &'static str {
    "ok"
}

/// Request body for a full sync
#[derive(Debug, Deserialize)]
struct FullSyncRequest {
    device_id: String,
    event_id: String,
    max_storage_bytes: u64,
    /// Package names to place ahead of everything else
    #[serde(default)]
    priority_packages: Option<Vec<String>>,
}

/// Request body for an incremental sync
#[derive(Debug, Deserialize)]
struct IncrementalSyncRequest {
    device_id: String,
    event_id: String,
    /// Milliseconds since the epoch of the device's last successful sync
    last_sync_timestamp: i64,
}

/// Response for both sync kinds
#[derive(Debug, Serialize)]
struct SyncResponse {
    sync_id: Uuid,
    total_size_bytes: u64,
    content_packages: Vec<ContentPackage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    download_urls: Option<BTreeMap<String, String>>,
}

impl SyncResponse {
    fn from_plan(plan: SyncPlan, state: &AppState) -> Self {
        let download_urls = if plan.packages.is_empty() {
            None
        } else {
            Some(
                plan.packages
                    .iter()
                    .map(|p| (p.id.clone(), state.download_url(&p.id, p.version)))
                    .collect(),
            )
        };
        Self {
            sync_id: Uuid::new_v4(),
            total_size_bytes: plan.total_size_bytes,
            content_packages: plan.packages,
            download_urls,
        }
    }
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value).map_err(|_| ApiError::validation(format!("{field} is not a valid UUID")))
}

fn positive_budget(max_storage_bytes: u64) -> Result<u64, ApiError> {
    if max_storage_bytes == 0 {
        return Err(ApiError::validation("max_storage_bytes must be > 0"));
    }
    Ok(max_storage_bytes)
}

/// Plan a full download under the device's storage budget
async fn full_sync(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FullSyncRequest>, JsonRejection>,
) -> Result<Json<SyncResponse>, ApiError> {
    let Json(req) = payload?;
    let device_id = parse_uuid("device_id", &req.device_id)?;
    let event_id = parse_uuid("event_id", &req.event_id)?;
    let budget = positive_budget(req.max_storage_bytes)?;
    let pinned: Option<HashSet<String>> =
        req.priority_packages.map(|names| names.into_iter().collect());

    let live = state.catalog.live_packages(state.clock.now_ms());
    let plan = state.planner.plan_full_sync(&live, budget, pinned.as_ref())?;

    info!(
        %device_id,
        %event_id,
        budget_bytes = budget,
        packages = plan.packages.len(),
        total_size_bytes = plan.total_size_bytes,
        "Full sync planned"
    );
    Ok(Json(SyncResponse::from_plan(plan, &state)))
}

/// Plan the deltas a device needs after being offline
async fn incremental_sync(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IncrementalSyncRequest>, JsonRejection>,
) -> Result<Json<SyncResponse>, ApiError> {
    let Json(req) = payload?;
    let device_id = parse_uuid("device_id", &req.device_id)?;
    let event_id = parse_uuid("event_id", &req.event_id)?;
    if req.last_sync_timestamp < 0 {
        return Err(ApiError::validation("last_sync_timestamp must be >= 0"));
    }

    let plan = state
        .planner
        .plan_incremental_sync(req.last_sync_timestamp, state.clock.now_ms())?;

    info!(
        %device_id,
        %event_id,
        packages = plan.packages.len(),
        "Incremental sync planned"
    );
    Ok(Json(SyncResponse::from_plan(plan, &state)))
}

/// Optional viewer position for gated listings
#[derive(Debug, Deserialize)]
struct ViewerQuery {
    lat: Option<f64>,
    lng: Option<f64>,
}

impl ViewerQuery {
    fn coordinate(&self) -> Result<Option<Coordinate>, ApiError> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Ok(Some(Coordinate::new(lat, lng)?)),
            (None, None) => Ok(None),
            _ => Err(ApiError::validation("lat and lng must be given together")),
        }
    }
}

/// List art installations visible from the viewer's position
async fn list_art_installations(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ViewerQuery>, QueryRejection>,
) -> Result<Json<Vec<ArtInstallation>>, ApiError> {
    let Query(query) = query?;
    let viewer = query.coordinate()?;
    Ok(Json(visible_entries(
        &state.art_installations,
        viewer.as_ref(),
        state.clock.now_ms(),
    )))
}

/// List theme camps visible from the viewer's position
async fn list_theme_camps(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ViewerQuery>, QueryRejection>,
) -> Result<Json<Vec<ThemeCamp>>, ApiError> {
    let Query(query) = query?;
    let viewer = query.coordinate()?;
    Ok(Json(visible_entries(
        &state.theme_camps,
        viewer.as_ref(),
        state.clock.now_ms(),
    )))
}

/// A location reading as reported by a device
#[derive(Debug, Deserialize)]
struct LocationReading {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    accuracy_m: Option<f64>,
    #[serde(default)]
    is_from_gps: bool,
    /// Defaults to the time the request is handled
    #[serde(default)]
    timestamp_ms: Option<i64>,
}

/// Request body for an unlock check
#[derive(Debug, Deserialize)]
struct UnlockRequest {
    #[serde(default)]
    location_sharing_enabled: bool,
    #[serde(default)]
    location: Option<LocationReading>,
}

/// Decide whether gated content is unlocked for this device right now
async fn evaluate_unlock(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UnlockRequest>, JsonRejection>,
) -> Result<Json<UnlockDecision>, ApiError> {
    let Json(req) = payload?;
    let location = req
        .location
        .map(|reading| {
            UserLocation::new(
                reading.latitude,
                reading.longitude,
                reading.accuracy_m,
                reading.is_from_gps,
                reading.timestamp_ms.unwrap_or_else(|| state.clock.now_ms()),
            )
        })
        .transpose()?;

    let decision = state.unlock.evaluate_current(
        state.events.as_ref(),
        &StaticLocation::new(location),
        req.location_sharing_enabled,
        state.clock.as_ref(),
    );
    info!(unlocked = decision.is_unlocked(), "Unlock evaluated");
    Ok(Json(decision))
}

/// Request body for a cleanup plan
#[derive(Debug, Deserialize)]
struct CleanupRequest {
    max_storage_bytes: u64,
    installed_package_ids: Vec<String>,
}

/// Plan evictions for the packages installed on a device
async fn plan_cleanup(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CleanupRequest>, JsonRejection>,
) -> Result<Json<CleanupPlan>, ApiError> {
    let Json(req) = payload?;
    let budget = positive_budget(req.max_storage_bytes)?;

    let installed = req
        .installed_package_ids
        .iter()
        .map(|id| {
            state
                .catalog
                .get(id)
                .ok_or_else(|| ApiError::validation(format!("unknown package id '{id}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let plan = state.cleaner.plan_cleanup(&installed, budget)?;
    info!(
        level = ?plan.level,
        evicted = plan.evicted.len(),
        freed_bytes = plan.freed_bytes,
        "Cleanup planned"
    );
    Ok(Json(plan))
}

/// The packages currently offered, expired ones excluded
async fn list_catalog(State(state): State<Arc<AppState>>) -> Json<Vec<ContentPackage>> {
    Json(state.catalog.live_packages(state.clock.now_ms()))
}
