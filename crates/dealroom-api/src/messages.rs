//! Buyer/seller conversation, held for admin release.
//!
//! Every message is stored addressed to the admin intermediary and stays
//! there until a moderator approves or edits it, at which point the receiver
//! is rewritten to the counterparty.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use dealroom_db::models::{InquiryRow, MessageModerationRow, MessageRow};
use dealroom_db::queries::{SortOrder, inquiries, messages};
use dealroom_types::api::{
    BulkModerateMessagesRequest, BulkModerateResponse, ModerateMessageRequest, Page, PageQuery,
    SendMessageRequest, SendMessageResponse,
};
use dealroom_types::events::NotificationEvent;
use dealroom_types::models::{InquiryStatus, MessageAction, MessageStatus, SenderType};
use dealroom_types::views::MessageView;

use crate::auth::{AppState, AppStateInner};
use crate::disclosure::{self, Relation, Viewer};
use crate::error::{ApiError, ApiResult};
use crate::moderation::{self, ModerationCommand};
use crate::{run_blocking, validate};

// -- Handlers --

pub async fn list(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(inquiry_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<MessageView>>> {
    let inquiry_id = validate::path_id("inquiry", &inquiry_id)?;
    run_blocking(state, move |state| get_messages(state, &viewer, inquiry_id, page)).await.map(Json)
}

pub async fn send(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(inquiry_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let inquiry_id = validate::path_id("inquiry", &inquiry_id)?;
    let sent = run_blocking(state, move |state| send_message(state, &viewer, inquiry_id, req)).await?;
    Ok((StatusCode::CREATED, Json(sent)))
}

pub async fn moderation_queue(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<MessageView>>> {
    run_blocking(state, move |state| list_message_queue(state, &viewer, page)).await.map(Json)
}

pub async fn moderate(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(message_id): Path<String>,
    Json(req): Json<ModerateMessageRequest>,
) -> ApiResult<Json<MessageView>> {
    let message_id = validate::path_id("message", &message_id)?;
    run_blocking(state, move |state| moderate_message(state, &viewer, message_id, req)).await.map(Json)
}

pub async fn bulk_moderate(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<BulkModerateMessagesRequest>,
) -> ApiResult<Json<BulkModerateResponse>> {
    run_blocking(state, move |state| bulk_moderate_messages(state, &viewer, req)).await.map(Json)
}

// -- Sending --

pub fn send_message(
    state: &AppStateInner,
    viewer: &Viewer,
    inquiry_id: Uuid,
    req: SendMessageRequest,
) -> ApiResult<SendMessageResponse> {
    let content = validate::required("content", &req.content, validate::MAX_MESSAGE_CHARS)?;

    let message = state.db.transaction(|tx| {
        let inquiry = inquiries::find_inquiry(tx, inquiry_id)?
            .ok_or_else(|| ApiError::not_found("inquiry", inquiry_id))?;
        let sender_type = match disclosure::relation(viewer, &inquiry)? {
            Relation::Buyer => SenderType::Buyer,
            Relation::Seller => SenderType::Seller,
            Relation::Admin => {
                return Err(ApiError::forbidden("only the buyer or seller can send messages"));
            }
        };
        if !inquiry.status.is_open_for_messages() {
            return Err(ApiError::bad_request(format!(
                "inquiry is {} and not open for messages",
                inquiry.status
            )));
        }

        let now = Utc::now();
        let message = MessageRow {
            id: Uuid::new_v4(),
            inquiry_id,
            sender_id: viewer.id,
            sender_type,
            receiver_id: state.intermediary.resolve(tx)?,
            content,
            status: MessageStatus::Pending,
            sent_at: now,
            approved_at: None,
        };
        messages::insert_message(tx, &message)?;

        if sender_type == SenderType::Seller && inquiry.status == InquiryStatus::Forwarded {
            let to = InquiryStatus::SellerResponded;
            if inquiries::update_inquiry_status(tx, inquiry_id, inquiry.status, to, now)? == 0 {
                return Err(moderation::lost_race("inquiry", inquiry_id));
            }
            debug!("Inquiry {} now {}", inquiry_id, to);
        }
        Ok(message)
    })?;

    info!(
        "Message {} queued on inquiry {} from {}",
        message.id, inquiry_id, message.sender_type
    );
    state.notifier.publish(NotificationEvent::MessageQueued {
        message_id: message.id,
        inquiry_id,
        sender_type: message.sender_type,
    });

    Ok(SendMessageResponse {
        message_id: message.id,
        status: message.status,
    })
}

// -- Read paths --

/// One page of the thread, oldest first within the page. Buyers and sellers
/// only ever page through released messages.
pub fn get_messages(
    state: &AppStateInner,
    viewer: &Viewer,
    inquiry_id: Uuid,
    page: PageQuery,
) -> ApiResult<Page<MessageView>> {
    let page = validate::page(page)?;
    state.db.read(|conn| {
        let inquiry = inquiries::find_inquiry(conn, inquiry_id)?
            .ok_or_else(|| ApiError::not_found("inquiry", inquiry_id))?;
        let relation = disclosure::relation(viewer, &inquiry)?;
        let approved_only = !relation.capabilities().see_pending_messages;

        let total = messages::count_messages(conn, inquiry_id, approved_only)?;
        let mut rows = messages::list_messages(conn, inquiry_id, approved_only, page.limit, page.offset())?;
        rows.reverse();

        Ok(Page {
            items: project_all(conn, relation, viewer.id, &rows)?,
            page: page.page,
            limit: page.limit,
            total,
        })
    })
}

/// Admin queue of held messages across all inquiries, oldest first.
pub fn list_message_queue(state: &AppStateInner, viewer: &Viewer, page: PageQuery) -> ApiResult<Page<MessageView>> {
    viewer.require_admin()?;
    let page = validate::page(page)?;
    state.db.read(|conn| {
        let total = messages::count_messages_by_status(conn, MessageStatus::Pending)?;
        let rows = messages::list_messages_by_status(
            conn,
            MessageStatus::Pending,
            SortOrder::OldestFirst,
            page.limit,
            page.offset(),
        )?;
        Ok(Page {
            items: project_all(conn, Relation::Admin, viewer.id, &rows)?,
            page: page.page,
            limit: page.limit,
            total,
        })
    })
}

fn project_all(
    conn: &Connection,
    relation: Relation,
    viewer_id: Uuid,
    rows: &[MessageRow],
) -> ApiResult<Vec<MessageView>> {
    let history: Vec<MessageModerationRow> = if relation.capabilities().see_audit_internals {
        let ids: Vec<Uuid> = rows.iter().map(|m| m.id).collect();
        messages::list_message_moderations(conn, &ids)?
    } else {
        Vec::new()
    };
    Ok(rows
        .iter()
        .filter_map(|m| disclosure::project_message(relation, viewer_id, m, &history))
        .collect())
}

// -- Moderation --

/// APPROVE / EDIT / REJECT on messages still held as PENDING.
pub struct MessageDecision {
    pub admin_id: Uuid,
    pub action: MessageAction,
    pub notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub edited_content: Option<String>,
}

impl MessageDecision {
    pub fn new(
        admin_id: Uuid,
        action: MessageAction,
        notes: Option<String>,
        rejection_reason: Option<String>,
        edited_content: Option<String>,
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
            edited_content: validate::optional(
                "edited_content",
                edited_content.as_deref(),
                validate::MAX_MESSAGE_CHARS,
            )?,
        })
    }

    /// Content released to the counterparty.
    fn final_content<'a>(&'a self, target: &'a MessageRow) -> &'a str {
        match (&self.action, &self.edited_content) {
            (MessageAction::Edit, Some(edited)) => edited.as_str(),
            _ => target.content.as_str(),
        }
    }
}

/// A decided message and the account it was released to, if any.
pub struct MessageOutcome {
    pub message: MessageRow,
    pub recipient_id: Option<Uuid>,
}

/// A held message together with the inquiry it belongs to.
pub struct HeldMessage {
    message: MessageRow,
    inquiry: InquiryRow,
}

impl HeldMessage {
    /// The other party of the inquiry. An anonymous buyer has no account, so
    /// a seller's message to one has no recipient and stays with the
    /// intermediary, who relays it by email.
    fn counterparty(&self) -> Option<Uuid> {
        match self.message.sender_type {
            SenderType::Buyer => Some(self.inquiry.seller_id),
            SenderType::Seller => self.inquiry.buyer_id,
        }
    }
}

impl ModerationCommand for MessageDecision {
    type Target = HeldMessage;
    type Outcome = MessageOutcome;

    const ENTITY: &'static str = "message";

    fn validate(&self) -> ApiResult<()> {
        match self.action {
            MessageAction::Reject if self.rejection_reason.is_none() => {
                Err(ApiError::bad_request("rejection_reason is required to reject"))
            }
            MessageAction::Edit if self.edited_content.is_none() => {
                Err(ApiError::bad_request("edited_content is required to edit"))
            }
            _ => Ok(()),
        }
    }

    fn load(&self, conn: &Connection, ids: &[Uuid]) -> ApiResult<Vec<HeldMessage>> {
        let rows = messages::find_messages(conn, ids)?;
        let mut inquiry_ids: Vec<Uuid> = rows.iter().map(|m| m.inquiry_id).collect();
        inquiry_ids.sort_unstable();
        inquiry_ids.dedup();
        let parents = inquiries::find_inquiries(conn, &inquiry_ids)?;

        rows.into_iter()
            .map(|message| {
                let inquiry = parents
                    .iter()
                    .find(|i| i.id == message.inquiry_id)
                    .cloned()
                    .ok_or_else(|| ApiError::not_found("inquiry", message.inquiry_id))?;
                Ok(HeldMessage { message, inquiry })
            })
            .collect()
    }

    fn target_id(target: &HeldMessage) -> Uuid {
        target.message.id
    }

    fn check(&self, target: &HeldMessage) -> ApiResult<()> {
        let HeldMessage { message, inquiry } = target;
        if message.status != MessageStatus::Pending {
            return Err(ApiError::bad_request(format!(
                "message {} is {} and cannot be moderated",
                message.id, message.status
            )));
        }
        // Rejecting still clears the queue once the conversation is closed.
        if self.action.target_status() == MessageStatus::Approved && !inquiry.status.is_open_for_messages() {
            return Err(ApiError::bad_request(format!(
                "inquiry {} is {} and no longer accepts messages",
                inquiry.id, inquiry.status
            )));
        }
        Ok(())
    }

    fn apply(&self, conn: &Connection, target: &HeldMessage, now: DateTime<Utc>) -> ApiResult<MessageOutcome> {
        let message = &target.message;
        let status = self.action.target_status();
        let (recipient_id, approved_at) = match status {
            MessageStatus::Approved => (target.counterparty(), Some(now)),
            _ => (None, None),
        };
        let receiver_id = recipient_id.unwrap_or(message.receiver_id);
        let content = self.final_content(message).to_string();

        if messages::record_message_decision(conn, message.id, status, &content, receiver_id, approved_at)? == 0 {
            return Err(moderation::lost_race("message", message.id));
        }
        Ok(MessageOutcome {
            message: MessageRow {
                receiver_id,
                content,
                status,
                approved_at,
                ..message.clone()
            },
            recipient_id,
        })
    }

    fn audit(&self, conn: &Connection, target: &HeldMessage, now: DateTime<Utc>) -> ApiResult<()> {
        let message = &target.message;
        let original_content = match self.action {
            MessageAction::Edit => Some(message.content.clone()),
            _ => None,
        };
        messages::insert_message_moderation(
            conn,
            &MessageModerationRow {
                id: Uuid::new_v4(),
                message_id: message.id,
                admin_id: self.admin_id,
                decision: self.action,
                notes: self.notes.clone(),
                rejection_reason: self.rejection_reason.clone(),
                original_content,
                reviewed_at: now,
            },
        )?;
        Ok(())
    }
}

pub fn moderate_message(
    state: &AppStateInner,
    viewer: &Viewer,
    message_id: Uuid,
    req: ModerateMessageRequest,
) -> ApiResult<MessageView> {
    viewer.require_admin()?;
    let decision = MessageDecision::new(
        viewer.id,
        req.action,
        req.notes,
        req.rejection_reason,
        req.edited_content,
    )?;

    let outcomes = moderation::execute(&state.db, &decision, &[message_id])?;
    announce_decisions(state, &decision, &outcomes);

    state.db.read(|conn| {
        let message = messages::find_message(conn, message_id)?
            .ok_or_else(|| ApiError::not_found("message", message_id))?;
        project_all(conn, Relation::Admin, viewer.id, std::slice::from_ref(&message))?
            .pop()
            .ok_or_else(|| ApiError::not_found("message", message_id))
    })
}

pub fn bulk_moderate_messages(
    state: &AppStateInner,
    viewer: &Viewer,
    req: BulkModerateMessagesRequest,
) -> ApiResult<BulkModerateResponse> {
    viewer.require_admin()?;
    if req.action == MessageAction::Edit {
        return Err(ApiError::bad_request("EDIT is not available in bulk"));
    }
    let decision = MessageDecision::new(viewer.id, req.action, req.notes, req.rejection_reason, None)?;

    let outcomes = moderation::execute(&state.db, &decision, &req.message_ids)?;
    announce_decisions(state, &decision, &outcomes);

    Ok(BulkModerateResponse {
        updated_count: outcomes.len(),
    })
}

fn announce_decisions(state: &AppStateInner, decision: &MessageDecision, outcomes: &[MessageOutcome]) {
    for MessageOutcome { message, recipient_id } in outcomes {
        info!(
            "Message {} moderated by {}: {}",
            message.id, decision.admin_id, decision.action
        );
        state.notifier.publish(NotificationEvent::MessageModerated {
            message_id: message.id,
            inquiry_id: message.inquiry_id,
            status: message.status,
            recipient_id: *recipient_id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, Harness, harness};
    use dealroom_types::models::Role;
    use dealroom_types::views::{REDACTED_BUYER, REDACTED_SELLER};

    fn send(h: &Harness, viewer: &Viewer, inquiry_id: Uuid, content: &str) -> ApiResult<SendMessageResponse> {
        send_message(
            &h.state,
            viewer,
            inquiry_id,
            SendMessageRequest {
                content: content.into(),
            },
        )
    }

    fn decide(h: &Harness, message_id: Uuid, action: MessageAction) -> ApiResult<MessageView> {
        let req = ModerateMessageRequest {
            action,
            notes: None,
            rejection_reason: Some("Contains an email address".into()),
            edited_content: Some("Edited by moderation".into()),
        };
        moderate_message(&h.state, &h.admin, message_id, req)
    }

    fn stored(h: &Harness, message_id: Uuid) -> MessageRow {
        h.state.db.get_message(message_id).unwrap().unwrap()
    }

    fn contents(page: &Page<MessageView>) -> Vec<String> {
        page.items
            .iter()
            .map(|m| match m {
                MessageView::Admin(a) => a.content.clone(),
                MessageView::Participant(p) => p.content.clone(),
            })
            .collect()
    }

    #[test]
    fn messages_are_held_for_the_intermediary() {
        let h = harness();
        let inquiry = h.forwarded();

        let sent = send(&h, &h.buyer, inquiry, "Is $8k acceptable?").unwrap();
        assert_eq!(sent.status, MessageStatus::Pending);

        let row = stored(&h, sent.message_id);
        assert_eq!(row.receiver_id, h.admin.id);
        assert_eq!(row.sender_type, SenderType::Buyer);
        assert_eq!(row.approved_at, None);

        // Neither party sees it before release, the sender included.
        for party in [&h.buyer, &h.seller] {
            let page = get_messages(&h.state, party, inquiry, PageQuery::default()).unwrap();
            assert_eq!(page.total, 0);
            assert!(page.items.is_empty());
        }

        let admin_page = get_messages(&h.state, &h.admin, inquiry, PageQuery::default()).unwrap();
        assert_eq!(contents(&admin_page), vec!["Is $8k acceptable?".to_string()]);

        let queue = list_message_queue(&h.state, &h.admin, PageQuery::default()).unwrap();
        assert_eq!(queue.total, 1);
    }

    #[test]
    fn sending_requires_an_open_inquiry_and_a_party() {
        let h = harness();
        let pending = h.submit(Some(&h.buyer));

        assert!(matches!(send(&h, &h.buyer, pending, "hello"), Err(ApiError::BadRequest(_))));
        assert!(matches!(send(&h, &h.seller, pending, "hello"), Err(ApiError::Forbidden(_))));

        let open = h.forwarded();
        assert!(matches!(send(&h, &h.admin, open, "hello"), Err(ApiError::Forbidden(_))));
        let stranger = testing::user(&h.state, Role::Buyer);
        assert!(matches!(send(&h, &stranger, open, "hello"), Err(ApiError::Forbidden(_))));

        let too_long = "x".repeat(validate::MAX_MESSAGE_CHARS + 1);
        assert!(matches!(send(&h, &h.buyer, open, &too_long), Err(ApiError::BadRequest(_))));
        assert!(matches!(send(&h, &h.buyer, open, " \n "), Err(ApiError::BadRequest(_))));
        assert!(matches!(
            send(&h, &h.buyer, Uuid::new_v4(), "hello"),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn seller_reply_marks_inquiry_responded() {
        let h = harness();
        let inquiry = h.forwarded();

        let sent = send(&h, &h.seller, inquiry, "Thanks for your interest").unwrap();
        let message = stored(&h, sent.message_id);
        assert_eq!(message.sender_type, SenderType::Seller);
        assert_eq!(message.status, MessageStatus::Pending);
        assert_eq!(message.receiver_id, h.admin.id);

        let row = h.state.db.get_inquiry(inquiry).unwrap().unwrap();
        assert_eq!(row.status, InquiryStatus::SellerResponded);

        // Still open, and a second reply leaves the status alone.
        send(&h, &h.seller, inquiry, "Following up").unwrap();
        send(&h, &h.buyer, inquiry, "Great").unwrap();
        let row = h.state.db.get_inquiry(inquiry).unwrap().unwrap();
        assert_eq!(row.status, InquiryStatus::SellerResponded);
    }

    #[test]
    fn approval_releases_to_the_counterparty() {
        let h = harness();
        let inquiry = h.forwarded();
        let mut events = h.state.notifier.subscribe();

        let sent = send(&h, &h.buyer, inquiry, "Would you take $8k?").unwrap();
        let view = decide(&h, sent.message_id, MessageAction::Approve).unwrap();
        assert!(matches!(&view, MessageView::Admin(a) if a.status == MessageStatus::Approved));

        let row = stored(&h, sent.message_id);
        assert_eq!(row.receiver_id, h.seller.id);
        assert!(row.approved_at.is_some());
        assert_eq!(row.content, "Would you take $8k?");

        let seller_page = get_messages(&h.state, &h.seller, inquiry, PageQuery::default()).unwrap();
        let [MessageView::Participant(seen)] = seller_page.items.as_slice() else {
            panic!("expected one participant view, got {:?}", seller_page.items);
        };
        assert_eq!(seen.sender, REDACTED_BUYER);
        assert!(!seen.from_me);
        let json = serde_json::to_string(&seller_page.items).unwrap();
        assert!(!json.contains(&h.buyer.id.to_string()));

        let buyer_page = get_messages(&h.state, &h.buyer, inquiry, PageQuery::default()).unwrap();
        assert!(matches!(&buyer_page.items[0], MessageView::Participant(p) if p.from_me));

        assert!(matches!(events.try_recv().unwrap(), NotificationEvent::MessageQueued { .. }));
        assert_eq!(
            events.try_recv().unwrap(),
            NotificationEvent::MessageModerated {
                message_id: sent.message_id,
                inquiry_id: inquiry,
                status: MessageStatus::Approved,
                recipient_id: Some(h.seller.id),
            }
        );

        // Decided messages cannot be moderated again.
        assert!(matches!(
            decide(&h, sent.message_id, MessageAction::Reject),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn edit_keeps_the_original_in_the_audit_trail() {
        let h = harness();
        let inquiry = h.forwarded();
        let sent = send(&h, &h.seller, inquiry, "Call me on 555-0199").unwrap();

        let view = decide(&h, sent.message_id, MessageAction::Edit).unwrap();
        let MessageView::Admin(admin_view) = view else {
            panic!("expected admin view");
        };
        assert_eq!(admin_view.content, "Edited by moderation");
        assert_eq!(admin_view.receiver_id, h.buyer.id);
        assert_eq!(admin_view.moderation.len(), 1);
        assert_eq!(
            admin_view.moderation[0].original_content.as_deref(),
            Some("Call me on 555-0199")
        );

        let buyer_page = get_messages(&h.state, &h.buyer, inquiry, PageQuery::default()).unwrap();
        assert_eq!(contents(&buyer_page), vec!["Edited by moderation".to_string()]);
        assert!(matches!(&buyer_page.items[0], MessageView::Participant(p) if p.sender == REDACTED_SELLER));
    }

    #[test]
    fn rejected_messages_never_reach_anyone() {
        let h = harness();
        let inquiry = h.forwarded();
        let sent = send(&h, &h.buyer, inquiry, "my email is jane@buyer.test").unwrap();

        let no_reason = ModerateMessageRequest {
            action: MessageAction::Reject,
            notes: None,
            rejection_reason: None,
            edited_content: None,
        };
        assert!(matches!(
            moderate_message(&h.state, &h.admin, sent.message_id, no_reason),
            Err(ApiError::BadRequest(_))
        ));
        assert_eq!(stored(&h, sent.message_id).status, MessageStatus::Pending);

        decide(&h, sent.message_id, MessageAction::Reject).unwrap();
        let row = stored(&h, sent.message_id);
        assert_eq!(row.status, MessageStatus::Rejected);
        assert_eq!(row.receiver_id, h.admin.id);
        assert_eq!(row.approved_at, None);

        for party in [&h.buyer, &h.seller] {
            let page = get_messages(&h.state, party, inquiry, PageQuery::default()).unwrap();
            assert!(page.items.is_empty());
        }
    }

    #[test]
    fn reply_to_anonymous_buyer_stays_with_intermediary() {
        let h = harness();
        let inquiry = h.submit(None);
        h.decide(inquiry, dealroom_types::models::InquiryAction::Approve);

        let sent = send(&h, &h.seller, inquiry, "Happy to talk").unwrap();
        let mut events = h.state.notifier.subscribe();
        decide(&h, sent.message_id, MessageAction::Approve).unwrap();

        let row = stored(&h, sent.message_id);
        assert_eq!(row.status, MessageStatus::Approved);
        assert_eq!(row.receiver_id, h.admin.id);
        assert!(matches!(
            events.try_recv().unwrap(),
            NotificationEvent::MessageModerated { recipient_id: None, .. }
        ));
    }

    #[test]
    fn thread_pages_read_oldest_first() {
        let h = harness();
        let inquiry = h.forwarded();
        let ids: Vec<Uuid> = ["one", "two", "three"]
            .iter()
            .map(|c| send(&h, &h.buyer, inquiry, c).unwrap().message_id)
            .collect();
        let req = BulkModerateMessagesRequest {
            message_ids: ids,
            action: MessageAction::Approve,
            notes: None,
            rejection_reason: None,
        };
        assert_eq!(bulk_moderate_messages(&h.state, &h.admin, req).unwrap().updated_count, 3);

        let page = get_messages(&h.state, &h.seller, inquiry, PageQuery::default()).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(contents(&page), vec!["one", "two", "three"]);

        // The newest two, still presented oldest first.
        let first = get_messages(&h.state, &h.seller, inquiry, PageQuery { page: 1, limit: 2 }).unwrap();
        assert_eq!(contents(&first), vec!["two", "three"]);
    }

    #[test]
    fn bulk_message_moderation_is_all_or_nothing() {
        let h = harness();
        let inquiry = h.forwarded();
        let pending = send(&h, &h.buyer, inquiry, "pending").unwrap().message_id;
        let decided = send(&h, &h.buyer, inquiry, "decided").unwrap().message_id;
        decide(&h, decided, MessageAction::Approve).unwrap();

        let edit = BulkModerateMessagesRequest {
            message_ids: vec![pending],
            action: MessageAction::Edit,
            notes: None,
            rejection_reason: None,
        };
        assert!(matches!(
            bulk_moderate_messages(&h.state, &h.admin, edit),
            Err(ApiError::BadRequest(_))
        ));

        let mixed = BulkModerateMessagesRequest {
            message_ids: vec![pending, decided],
            action: MessageAction::Reject,
            notes: None,
            rejection_reason: Some("Spam".into()),
        };
        assert!(matches!(
            bulk_moderate_messages(&h.state, &h.admin, mixed),
            Err(ApiError::BadRequest(_))
        ));
        assert_eq!(stored(&h, pending).status, MessageStatus::Pending);
        assert_eq!(stored(&h, decided).status, MessageStatus::Approved);

        let by_seller = BulkModerateMessagesRequest {
            message_ids: vec![pending],
            action: MessageAction::Approve,
            notes: None,
            rejection_reason: None,
        };
        assert!(matches!(
            bulk_moderate_messages(&h.state, &h.seller, by_seller),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn closed_inquiry_holds_back_pending_messages() {
        let h = harness();
        let inquiry = h.forwarded();
        let late = send(&h, &h.buyer, inquiry, "One more question").unwrap().message_id;
        let spam = send(&h, &h.buyer, inquiry, "Still there?").unwrap().message_id;
        crate::inquiries::complete_inquiry(&h.state, &h.admin, inquiry).unwrap();

        for action in [MessageAction::Approve, MessageAction::Edit] {
            assert!(matches!(decide(&h, late, action), Err(ApiError::BadRequest(_))));
        }
        let row = stored(&h, late);
        assert_eq!(row.status, MessageStatus::Pending);
        assert_eq!(row.receiver_id, h.admin.id);
        let audits = h.state.db.with_conn(|conn| messages::count_message_moderations(conn, late));
        assert_eq!(audits.unwrap(), 0);

        // Rejection still drains the queue.
        decide(&h, spam, MessageAction::Reject).unwrap();
        assert_eq!(stored(&h, spam).status, MessageStatus::Rejected);

        let page = get_messages(&h.state, &h.seller, inquiry, PageQuery::default()).unwrap();
        assert!(page.items.is_empty());
    }
}
