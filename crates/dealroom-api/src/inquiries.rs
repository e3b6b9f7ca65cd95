//! Inquiry lifecycle: submission, admin moderation, buyer revision, closing,
//! and the role-scoped read paths.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use rusqlite::Connection;
use tracing::{info, warn};
use uuid::Uuid;

use dealroom_db::models::{DealRow, InquiryModerationRow, InquiryRow};
use dealroom_db::queries::{SortOrder, domains, inquiries};
use dealroom_db::queries::inquiries::InquiryFilter;
use dealroom_types::api::{
    BuyerContact, BulkModerateInquiriesRequest, BulkModerateResponse, ConvertInquiryRequest, DealResponse,
    ModerateInquiryRequest, Page, PageQuery, ResubmitInquiryRequest, SellerInquiryQuery,
    SubmitInquiryRequest, SubmitInquiryResponse,
};
use dealroom_types::events::NotificationEvent;
use dealroom_types::models::{InquiryAction, InquiryStatus};
use dealroom_types::views::InquiryView;

use crate::auth::{AppState, AppStateInner};
use crate::disclosure::{self, Relation, Viewer};
use crate::error::{ApiError, ApiResult};
use crate::middleware::bearer_viewer;
use crate::moderation::{self, ModerationCommand};
use crate::{run_blocking, validate};

/// Shown to the submitter; informational, not a commitment.
pub const REVIEW_SLA: &str = "within 24-48 hours";

const ANONYMOUS_ID_ATTEMPTS: usize = 5;

// -- Handlers --

pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubmitInquiryRequest>,
) -> ApiResult<impl IntoResponse> {
    let submitter = bearer_viewer(&headers, &state.jwt_secret)?;
    let response = run_blocking(state, move |state| submit_inquiry(state, submitter.as_ref(), req)).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(inquiry_id): Path<String>,
) -> ApiResult<Json<InquiryView>> {
    let inquiry_id = validate::path_id("inquiry", &inquiry_id)?;
    run_blocking(state, move |state| get_inquiry(state, &viewer, inquiry_id)).await.map(Json)
}

pub async fn list_mine(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<InquiryView>>> {
    run_blocking(state, move |state| list_for_buyer(state, &viewer, page)).await.map(Json)
}

pub async fn list_received(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<SellerInquiryQuery>,
) -> ApiResult<Json<Page<InquiryView>>> {
    run_blocking(state, move |state| list_for_seller(state, &viewer, &query)).await.map(Json)
}

pub async fn resubmit(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(inquiry_id): Path<String>,
    Json(req): Json<ResubmitInquiryRequest>,
) -> ApiResult<Json<InquiryView>> {
    let inquiry_id = validate::path_id("inquiry", &inquiry_id)?;
    run_blocking(state, move |state| resubmit_inquiry(state, &viewer, inquiry_id, req)).await.map(Json)
}

pub async fn moderation_queue(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<InquiryView>>> {
    run_blocking(state, move |state| list_moderation_queue(state, &viewer, page)).await.map(Json)
}

pub async fn moderate(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(inquiry_id): Path<String>,
    Json(req): Json<ModerateInquiryRequest>,
) -> ApiResult<Json<InquiryView>> {
    let inquiry_id = validate::path_id("inquiry", &inquiry_id)?;
    run_blocking(state, move |state| moderate_inquiry(state, &viewer, inquiry_id, req)).await.map(Json)
}

pub async fn bulk_moderate(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<BulkModerateInquiriesRequest>,
) -> ApiResult<Json<BulkModerateResponse>> {
    run_blocking(state, move |state| bulk_moderate_inquiries(state, &viewer, req)).await.map(Json)
}

pub async fn complete(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(inquiry_id): Path<String>,
) -> ApiResult<Json<InquiryView>> {
    let inquiry_id = validate::path_id("inquiry", &inquiry_id)?;
    run_blocking(state, move |state| complete_inquiry(state, &viewer, inquiry_id)).await.map(Json)
}

pub async fn convert(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(inquiry_id): Path<String>,
    Json(req): Json<ConvertInquiryRequest>,
) -> ApiResult<impl IntoResponse> {
    let inquiry_id = validate::path_id("inquiry", &inquiry_id)?;
    let deal = run_blocking(state, move |state| convert_to_deal(state, &viewer, inquiry_id, req)).await?;
    Ok((StatusCode::CREATED, Json(deal)))
}

// -- Submission --

/// Buyer-editable fields, validated.
struct InquiryDraft {
    contact: BuyerContact,
    budget_range: String,
    intended_use: String,
    timeline: String,
    message: String,
}

impl InquiryDraft {
    fn parse(
        contact: &BuyerContact,
        budget_range: &str,
        intended_use: &str,
        timeline: &str,
        message: &str,
    ) -> ApiResult<Self> {
        Ok(Self {
            contact: validate::contact(contact)?,
            budget_range: validate::required("budget_range", budget_range, 100)?,
            intended_use: validate::required("intended_use", intended_use, 500)?,
            timeline: validate::required("timeline", timeline, 100)?,
            message: validate::required("message", message, validate::MAX_MESSAGE_CHARS)?,
        })
    }
}

pub fn submit_inquiry(
    state: &AppStateInner,
    submitter: Option<&Viewer>,
    req: SubmitInquiryRequest,
) -> ApiResult<SubmitInquiryResponse> {
    if submitter.is_some_and(Viewer::is_admin) {
        return Err(ApiError::forbidden("admins cannot submit inquiries"));
    }
    let draft = InquiryDraft::parse(
        &req.contact,
        &req.budget_range,
        &req.intended_use,
        &req.timeline,
        &req.message,
    )?;

    let inquiry = state.db.transaction(|tx| {
        let domain = domains::find_domain(tx, req.domain_id)?
            .ok_or_else(|| ApiError::not_found("domain", req.domain_id))?;

        if submitter.is_some_and(|s| s.id == domain.owner_id) {
            warn!("Owner {} attempted to inquire about own domain {}", domain.owner_id, domain.id);
            return Err(ApiError::forbidden("you cannot inquire about your own domain"));
        }
        if !domain.status.is_inquirable() {
            return Err(ApiError::bad_request(format!(
                "{} is not open for inquiries",
                domain.name
            )));
        }

        let now = Utc::now();
        let row = InquiryRow {
            id: Uuid::new_v4(),
            domain_id: domain.id,
            domain_name: domain.name,
            buyer_id: submitter.map(|s| s.id),
            seller_id: domain.owner_id,
            anonymous_buyer_id: fresh_anonymous_id(tx)?,
            contact_name: draft.contact.name,
            contact_email: draft.contact.email,
            contact_phone: draft.contact.phone,
            contact_company: draft.contact.company,
            budget_range: draft.budget_range,
            intended_use: draft.intended_use,
            timeline: draft.timeline,
            message: draft.message,
            status: InquiryStatus::PendingReview,
            created_at: now,
            updated_at: now,
        };
        inquiries::insert_inquiry(tx, &row)?;
        Ok(row)
    })?;

    info!("Inquiry {} submitted for {}", inquiry.id, inquiry.domain_name);
    state.notifier.publish(NotificationEvent::InquirySubmitted {
        inquiry_id: inquiry.id,
        domain_name: inquiry.domain_name.clone(),
    });

    Ok(SubmitInquiryResponse {
        inquiry_id: inquiry.id,
        status: inquiry.status,
        message: format!(
            "Your inquiry has been submitted and will be reviewed {}.",
            REVIEW_SLA
        ),
    })
}

/// `Buyer-XXXXXXXX`, unique across all inquiries.
fn fresh_anonymous_id(conn: &Connection) -> ApiResult<String> {
    let mut rng = rand::rng();
    for _ in 0..ANONYMOUS_ID_ATTEMPTS {
        let suffix: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect::<String>()
            .to_uppercase();
        let candidate = format!("Buyer-{}", suffix);
        if !inquiries::anonymous_id_taken(conn, &candidate)? {
            return Ok(candidate);
        }
    }
    Err(ApiError::Internal(anyhow::anyhow!(
        "could not allocate an anonymous buyer id"
    )))
}

pub fn resubmit_inquiry(
    state: &AppStateInner,
    viewer: &Viewer,
    inquiry_id: Uuid,
    req: ResubmitInquiryRequest,
) -> ApiResult<InquiryView> {
    let draft = InquiryDraft::parse(
        &req.contact,
        &req.budget_range,
        &req.intended_use,
        &req.timeline,
        &req.message,
    )?;

    let view = state.db.transaction(|tx| {
        let current = inquiries::find_inquiry(tx, inquiry_id)?
            .ok_or_else(|| ApiError::not_found("inquiry", inquiry_id))?;
        if current.buyer_id != Some(viewer.id) {
            return Err(ApiError::forbidden("only the submitting buyer can revise an inquiry"));
        }
        let from = current.status;
        if from != InquiryStatus::ChangesRequested || !from.can_transition_to(InquiryStatus::PendingReview) {
            return Err(ApiError::bad_request(format!(
                "inquiry is {} and cannot be revised",
                from
            )));
        }

        let revised = InquiryRow {
            contact_name: draft.contact.name,
            contact_email: draft.contact.email,
            contact_phone: draft.contact.phone,
            contact_company: draft.contact.company,
            budget_range: draft.budget_range,
            intended_use: draft.intended_use,
            timeline: draft.timeline,
            message: draft.message,
            status: InquiryStatus::PendingReview,
            updated_at: Utc::now(),
            ..current
        };
        if inquiries::update_inquiry_details(tx, &revised, from)? == 0 {
            return Err(moderation::lost_race("inquiry", inquiry_id));
        }
        load_view(tx, Relation::Buyer, &revised)
    })?;

    info!("Inquiry {} revised by buyer", inquiry_id);
    state
        .notifier
        .publish(NotificationEvent::InquiryResubmitted { inquiry_id });
    Ok(view)
}

// -- Read paths --

/// Project `row` for `relation`, loading the audit trail only when the
/// projection uses it.
fn load_view(conn: &Connection, relation: Relation, row: &InquiryRow) -> ApiResult<InquiryView> {
    let needs_history = match relation {
        Relation::Admin => true,
        Relation::Buyer => row.status == InquiryStatus::ChangesRequested,
        Relation::Seller => false,
    };
    let history: Vec<InquiryModerationRow> = if needs_history {
        inquiries::list_inquiry_moderations(conn, row.id)?
    } else {
        Vec::new()
    };
    Ok(disclosure::project_inquiry(relation, row, &history))
}

pub fn get_inquiry(state: &AppStateInner, viewer: &Viewer, inquiry_id: Uuid) -> ApiResult<InquiryView> {
    state.db.read(|conn| {
        let row = inquiries::find_inquiry(conn, inquiry_id)?
            .ok_or_else(|| ApiError::not_found("inquiry", inquiry_id))?;
        let relation = disclosure::relation(viewer, &row)?;
        load_view(conn, relation, &row)
    })
}

pub fn list_for_buyer(state: &AppStateInner, viewer: &Viewer, page: PageQuery) -> ApiResult<Page<InquiryView>> {
    let filter = InquiryFilter {
        buyer_id: Some(viewer.id),
        ..Default::default()
    };
    list(state, viewer, filter, SortOrder::NewestFirst, page)
}

/// Inquiries on the caller's domains. Only statuses past admin approval are
/// ever returned; a status filter outside that set yields an empty page.
pub fn list_for_seller(
    state: &AppStateInner,
    viewer: &Viewer,
    query: &SellerInquiryQuery,
) -> ApiResult<Page<InquiryView>> {
    let statuses = match query.status {
        Some(status) if status.is_seller_visible() => vec![status],
        Some(_) => vec![],
        None => InquiryStatus::SELLER_VISIBLE.to_vec(),
    };
    let filter = InquiryFilter {
        seller_id: Some(viewer.id),
        domain_id: query.domain_id,
        statuses: Some(statuses),
        ..Default::default()
    };
    list(state, viewer, filter, SortOrder::NewestFirst, query.page())
}

/// Admin queue of inquiries awaiting review, oldest first.
pub fn list_moderation_queue(state: &AppStateInner, viewer: &Viewer, page: PageQuery) -> ApiResult<Page<InquiryView>> {
    viewer.require_admin()?;
    let filter = InquiryFilter {
        statuses: Some(vec![InquiryStatus::PendingReview]),
        ..Default::default()
    };
    list(state, viewer, filter, SortOrder::OldestFirst, page)
}

fn list(
    state: &AppStateInner,
    viewer: &Viewer,
    filter: InquiryFilter,
    order: SortOrder,
    page: PageQuery,
) -> ApiResult<Page<InquiryView>> {
    let page = validate::page(page)?;
    state.db.read(|conn| {
        let total = inquiries::count_inquiries(conn, &filter)?;
        let rows = inquiries::list_inquiries(conn, &filter, order, page.limit, page.offset())?;
        let items = rows
            .iter()
            .map(|row| {
                let relation = disclosure::relation(viewer, row)?;
                load_view(conn, relation, row)
            })
            .collect::<ApiResult<Vec<_>>>()?;
        Ok(Page {
            items,
            page: page.page,
            limit: page.limit,
            total,
        })
    })
}

// -- Moderation --

/// APPROVE / REJECT / REQUEST_CHANGES on inquiries in PENDING_REVIEW.
pub struct InquiryDecision {
    pub admin_id: Uuid,
    pub action: InquiryAction,
    pub notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub requested_changes: Vec<String>,
}

impl InquiryDecision {
    pub fn new(
        admin_id: Uuid,
        action: InquiryAction,
        notes: Option<String>,
        rejection_reason: Option<String>,
        requested_changes: Option<Vec<String>>,
    ) -> ApiResult<Self> {
        Ok(Self {
            admin_id,
            action,
            notes: validate::optional("notes", notes.as_deref(), validate::MAX_MESSAGE_CHARS)?,
            rejection_reason: validate::optional(
                "rejection_reason",
                rejection_reason.as_deref(),
                validate::MAX_MESSAGE_CHARS,
            )?,
            requested_changes: requested_changes
                .unwrap_or_default()
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        })
    }
}

impl ModerationCommand for InquiryDecision {
    type Target = InquiryRow;
    type Outcome = InquiryRow;

    const ENTITY: &'static str = "inquiry";

    fn validate(&self) -> ApiResult<()> {
        match self.action {
            InquiryAction::Reject if self.rejection_reason.is_none() => {
                Err(ApiError::bad_request("rejection_reason is required to reject"))
            }
            InquiryAction::RequestChanges if self.requested_changes.is_empty() => {
                Err(ApiError::bad_request("requested_changes must list at least one change"))
            }
            _ => Ok(()),
        }
    }

    fn load(&self, conn: &Connection, ids: &[Uuid]) -> ApiResult<Vec<InquiryRow>> {
        Ok(inquiries::find_inquiries(conn, ids)?)
    }

    fn target_id(target: &InquiryRow) -> Uuid {
        target.id
    }

    fn check(&self, target: &InquiryRow) -> ApiResult<()> {
        if target.status != InquiryStatus::PendingReview
            || !target.status.can_transition_to(self.action.target_status())
        {
            return Err(ApiError::bad_request(format!(
                "inquiry {} is {} and cannot be moderated",
                target.id, target.status
            )));
        }
        Ok(())
    }

    fn apply(&self, conn: &Connection, target: &InquiryRow, now: DateTime<Utc>) -> ApiResult<InquiryRow> {
        let next = self.action.target_status();
        if inquiries::update_inquiry_status(conn, target.id, target.status, next, now)? == 0 {
            return Err(moderation::lost_race("inquiry", target.id));
        }
        Ok(InquiryRow {
            status: next,
            updated_at: now,
            ..target.clone()
        })
    }

    fn audit(&self, conn: &Connection, target: &InquiryRow, now: DateTime<Utc>) -> ApiResult<()> {
        inquiries::insert_inquiry_moderation(
            conn,
            &InquiryModerationRow {
                id: Uuid::new_v4(),
                inquiry_id: target.id,
                admin_id: self.admin_id,
                decision: self.action,
                notes: self.notes.clone(),
                rejection_reason: self.rejection_reason.clone(),
                requested_changes: self.requested_changes.clone(),
                reviewed_at: now,
            },
        )?;
        Ok(())
    }
}

pub fn moderate_inquiry(
    state: &AppStateInner,
    viewer: &Viewer,
    inquiry_id: Uuid,
    req: ModerateInquiryRequest,
) -> ApiResult<InquiryView> {
    viewer.require_admin()?;
    let decision = InquiryDecision::new(
        viewer.id,
        req.action,
        req.notes,
        req.rejection_reason,
        req.requested_changes,
    )?;

    let outcomes = moderation::execute(&state.db, &decision, &[inquiry_id])?;
    announce_decisions(state, &decision, &outcomes);

    get_inquiry(state, viewer, inquiry_id)
}

pub fn bulk_moderate_inquiries(
    state: &AppStateInner,
    viewer: &Viewer,
    req: BulkModerateInquiriesRequest,
) -> ApiResult<BulkModerateResponse> {
    viewer.require_admin()?;
    let decision = InquiryDecision::new(
        viewer.id,
        req.action,
        req.notes,
        req.rejection_reason,
        req.requested_changes,
    )?;

    let outcomes = moderation::execute(&state.db, &decision, &req.inquiry_ids)?;
    announce_decisions(state, &decision, &outcomes);

    Ok(BulkModerateResponse {
        updated_count: outcomes.len(),
    })
}

fn announce_decisions(state: &AppStateInner, decision: &InquiryDecision, outcomes: &[InquiryRow]) {
    for inquiry in outcomes {
        info!(
            "Inquiry {} moderated by {}: {} -> {}",
            inquiry.id, decision.admin_id, decision.action, inquiry.status
        );
        state.notifier.publish(NotificationEvent::InquiryStatusChanged {
            inquiry_id: inquiry.id,
            status: inquiry.status,
        });
    }
}

// -- Closing --

/// Move an approved inquiry to a terminal status under the transition table.
fn close(conn: &Connection, inquiry_id: Uuid, to: InquiryStatus) -> ApiResult<InquiryRow> {
    let current = inquiries::find_inquiry(conn, inquiry_id)?
        .ok_or_else(|| ApiError::not_found("inquiry", inquiry_id))?;
    if !current.status.can_transition_to(to) {
        return Err(ApiError::bad_request(format!(
            "inquiry is {} and cannot become {}",
            current.status, to
        )));
    }
    let now = Utc::now();
    if inquiries::update_inquiry_status(conn, inquiry_id, current.status, to, now)? == 0 {
        return Err(moderation::lost_race("inquiry", inquiry_id));
    }
    Ok(InquiryRow {
        status: to,
        updated_at: now,
        ..current
    })
}

pub fn complete_inquiry(state: &AppStateInner, viewer: &Viewer, inquiry_id: Uuid) -> ApiResult<InquiryView> {
    viewer.require_admin()?;
    let view = state.db.transaction(|tx| {
        let closed = close(tx, inquiry_id, InquiryStatus::Completed)?;
        load_view(tx, Relation::Admin, &closed)
    })?;

    info!("Inquiry {} completed by {}", inquiry_id, viewer.id);
    state.notifier.publish(NotificationEvent::InquiryStatusChanged {
        inquiry_id,
        status: InquiryStatus::Completed,
    });
    Ok(view)
}

pub fn convert_to_deal(
    state: &AppStateInner,
    viewer: &Viewer,
    inquiry_id: Uuid,
    req: ConvertInquiryRequest,
) -> ApiResult<DealResponse> {
    viewer.require_admin()?;
    if req.agreed_price_cents <= 0 {
        return Err(ApiError::bad_request("agreed_price_cents must be positive"));
    }

    let deal = state.db.transaction(|tx| {
        let closed = close(tx, inquiry_id, InquiryStatus::ConvertedToDeal)?;
        let deal = DealRow {
            id: Uuid::new_v4(),
            inquiry_id,
            domain_id: closed.domain_id,
            buyer_id: closed.buyer_id,
            seller_id: closed.seller_id,
            agreed_price_cents: req.agreed_price_cents,
            created_by: viewer.id,
            created_at: closed.updated_at,
        };
        inquiries::insert_deal(tx, &deal)?;
        Ok::<_, ApiError>(deal)
    })?;

    info!("Inquiry {} converted to deal {}", inquiry_id, deal.id);
    state.notifier.publish(NotificationEvent::InquiryStatusChanged {
        inquiry_id,
        status: InquiryStatus::ConvertedToDeal,
    });

    Ok(DealResponse {
        deal_id: deal.id,
        inquiry_id,
        domain_id: deal.domain_id,
        agreed_price_cents: deal.agreed_price_cents,
        created_at: deal.created_at,
    })
}
