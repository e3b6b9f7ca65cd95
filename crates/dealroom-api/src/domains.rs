use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use dealroom_db::models::DomainRow;
use dealroom_db::queries::domains;
use dealroom_types::api::{CreateDomainRequest, DomainResponse};
use dealroom_types::models::{DomainStatus, Role};

use crate::auth::{AppState, AppStateInner};
use crate::disclosure::Viewer;
use crate::error::{ApiError, ApiResult};
use crate::{run_blocking, validate};

// -- Handlers --

pub async fn create(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateDomainRequest>,
) -> ApiResult<impl IntoResponse> {
    let domain = run_blocking(state, move |state| create_domain(state, &viewer, req)).await?;
    Ok((StatusCode::CREATED, Json(domain)))
}

pub async fn get(State(state): State<AppState>, Path(domain_id): Path<String>) -> ApiResult<Json<DomainResponse>> {
    let domain_id = validate::path_id("domain", &domain_id)?;
    run_blocking(state, move |state| get_domain(state, domain_id)).await.map(Json)
}

pub async fn list_mine(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> ApiResult<Json<Vec<DomainResponse>>> {
    run_blocking(state, move |state| list_my_domains(state, &viewer)).await.map(Json)
}

pub async fn verify(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(domain_id): Path<String>,
) -> ApiResult<Json<DomainResponse>> {
    let domain_id = validate::path_id("domain", &domain_id)?;
    run_blocking(state, move |state| verify_domain(state, &viewer, domain_id)).await.map(Json)
}

// -- Operations --

pub fn create_domain(state: &AppStateInner, viewer: &Viewer, req: CreateDomainRequest) -> ApiResult<DomainResponse> {
    if viewer.role != Role::Seller {
        return Err(ApiError::forbidden("only sellers can list domains"));
    }
    let name = normalize_name(&req.name)?;
    if let Some(price) = req.asking_price_cents {
        if price <= 0 {
            return Err(ApiError::bad_request("asking price must be positive"));
        }
    }

    let row = DomainRow {
        id: Uuid::new_v4(),
        name,
        owner_id: viewer.id,
        status: DomainStatus::PendingVerification,
        asking_price_cents: req.asking_price_cents,
        created_at: chrono::Utc::now(),
    };

    state.db.transaction(|tx| {
        if domains::find_domain_by_name(tx, &row.name)?.is_some() {
            return Err(ApiError::Conflict(format!("{} is already listed", row.name)));
        }
        domains::insert_domain(tx, &row)?;
        Ok(())
    })?;
    info!("Domain {} listed by {}", row.name, viewer.id);

    Ok(response(&row))
}

pub fn get_domain(state: &AppStateInner, domain_id: Uuid) -> ApiResult<DomainResponse> {
    state
        .db
        .get_domain(domain_id)?
        .map(|d| response(&d))
        .ok_or_else(|| ApiError::not_found("domain", domain_id))
}

pub fn list_my_domains(state: &AppStateInner, viewer: &Viewer) -> ApiResult<Vec<DomainResponse>> {
    Ok(state
        .db
        .get_domains_by_owner(viewer.id)?
        .iter()
        .map(response)
        .collect())
}

pub fn verify_domain(state: &AppStateInner, viewer: &Viewer, domain_id: Uuid) -> ApiResult<DomainResponse> {
    viewer.require_admin()?;
    let domain = state.db.transaction(|tx| {
        if domains::set_domain_status(tx, domain_id, DomainStatus::Verified)? == 0 {
            return Err(ApiError::not_found("domain", domain_id));
        }
        domains::find_domain(tx, domain_id)?.ok_or_else(|| ApiError::not_found("domain", domain_id))
    })?;
    info!("Domain {} verified by {}", domain.name, viewer.id);
    Ok(response(&domain))
}

fn response(row: &DomainRow) -> DomainResponse {
    DomainResponse {
        id: row.id,
        name: row.name.clone(),
        status: row.status,
        asking_price_cents: row.asking_price_cents,
        created_at: row.created_at,
    }
}

/// Lowercased DNS name with at least one dot and only LDH labels.
fn normalize_name(raw: &str) -> ApiResult<String> {
    let name = validate::required("name", raw, 253)?.to_lowercase();
    let labels: Vec<&str> = name.split('.').collect();
    let valid = labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    if !valid {
        return Err(ApiError::bad_request(format!("{} is not a valid domain name", name)));
    }
    Ok(name)
}
