//! Who may see what.
//!
//! Every read path resolves the viewer's [`Relation`] to an inquiry with
//! [`relation`] and then renders through [`project_inquiry`] /
//! [`project_message`]. Nothing else in the crate builds a view, so a seller
//! gets byte-identical output whether an inquiry is fetched alone, in a list,
//! or nested in another response.

use uuid::Uuid;

use dealroom_db::models::{InquiryModerationRow, InquiryRow, MessageModerationRow, MessageRow};
use dealroom_types::api::BuyerContact;
use dealroom_types::models::{InquiryAction, InquiryStatus, MessageStatus, Role, SenderType};
use dealroom_types::views::{
    AdminInquiryView, AdminMessageView, AnonymousBuyerInfo, BuyerInquiryView, DomainSummary,
    InquiryModerationView, InquiryView, MessageModerationView, MessageView, ParticipantMessageView,
    PublicIdentity, REDACTED_BUYER, REDACTED_SELLER, SellerInquiryView,
};

use crate::error::{ApiError, ApiResult};

/// Authenticated caller, as established by the auth middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub id: Uuid,
    pub role: Role,
}

impl Viewer {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> ApiResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("admin access required"))
        }
    }
}

/// How a viewer stands towards one inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Admin,
    Buyer,
    Seller,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub see_contact_info: bool,
    pub see_pending_messages: bool,
    pub see_audit_internals: bool,
}

impl Relation {
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Admin => Capabilities {
                see_contact_info: true,
                see_pending_messages: true,
                see_audit_internals: true,
            },
            Self::Buyer => Capabilities {
                see_contact_info: true,
                see_pending_messages: false,
                see_audit_internals: false,
            },
            Self::Seller => Capabilities {
                see_contact_info: false,
                see_pending_messages: false,
                see_audit_internals: false,
            },
        }
    }
}

/// Resolve the viewer's relation to `inquiry`, refusing anyone who is not its
/// admin, buyer, or (once approved) seller.
pub fn relation(viewer: &Viewer, inquiry: &InquiryRow) -> ApiResult<Relation> {
    if viewer.is_admin() {
        return Ok(Relation::Admin);
    }
    if inquiry.buyer_id == Some(viewer.id) {
        return Ok(Relation::Buyer);
    }
    if inquiry.seller_id == viewer.id {
        if inquiry.status.is_seller_visible() {
            return Ok(Relation::Seller);
        }
        return Err(ApiError::forbidden("this inquiry has not been forwarded to you"));
    }
    Err(ApiError::forbidden("you do not have access to this inquiry"))
}

pub fn project_inquiry(
    relation: Relation,
    inquiry: &InquiryRow,
    moderation: &[InquiryModerationRow],
) -> InquiryView {
    let domain = DomainSummary {
        id: inquiry.domain_id,
        name: inquiry.domain_name.clone(),
    };

    match relation {
        Relation::Admin => InquiryView::Admin(AdminInquiryView {
            id: inquiry.id,
            domain,
            buyer_id: inquiry.buyer_id,
            seller_id: inquiry.seller_id,
            anonymous_buyer_id: inquiry.anonymous_buyer_id.clone(),
            contact: contact_of(inquiry),
            budget_range: inquiry.budget_range.clone(),
            intended_use: inquiry.intended_use.clone(),
            timeline: inquiry.timeline.clone(),
            message: inquiry.message.clone(),
            status: inquiry.status,
            created_at: inquiry.created_at,
            updated_at: inquiry.updated_at,
            moderation: moderation.iter().map(inquiry_moderation_view).collect(),
        }),
        Relation::Buyer => InquiryView::Buyer(BuyerInquiryView {
            id: inquiry.id,
            domain,
            seller: REDACTED_SELLER,
            contact: contact_of(inquiry),
            budget_range: inquiry.budget_range.clone(),
            intended_use: inquiry.intended_use.clone(),
            timeline: inquiry.timeline.clone(),
            message: inquiry.message.clone(),
            status: inquiry.status,
            requested_changes: requested_changes(inquiry, moderation),
            created_at: inquiry.created_at,
            updated_at: inquiry.updated_at,
        }),
        Relation::Seller => InquiryView::Seller(SellerInquiryView {
            id: inquiry.id,
            domain,
            buyer: REDACTED_BUYER,
            buyer_info: AnonymousBuyerInfo {
                anonymous_id: inquiry.anonymous_buyer_id.clone(),
                budget_range: inquiry.budget_range.clone(),
                intended_use: inquiry.intended_use.clone(),
                timeline: inquiry.timeline.clone(),
            },
            message: inquiry.message.clone(),
            status: inquiry.status,
            moderation_status: inquiry.status.seller_label(),
            created_at: inquiry.created_at,
            updated_at: inquiry.updated_at,
        }),
    }
}

/// Render one message for `viewer_id`, or `None` when the relation may not
/// see it at all.
pub fn project_message(
    relation: Relation,
    viewer_id: Uuid,
    message: &MessageRow,
    moderation: &[MessageModerationRow],
) -> Option<MessageView> {
    let caps = relation.capabilities();
    if message.status != MessageStatus::Approved && !caps.see_pending_messages {
        return None;
    }

    if caps.see_audit_internals {
        return Some(MessageView::Admin(AdminMessageView {
            id: message.id,
            inquiry_id: message.inquiry_id,
            sender_id: message.sender_id,
            sender_type: message.sender_type,
            receiver_id: message.receiver_id,
            content: message.content.clone(),
            status: message.status,
            sent_at: message.sent_at,
            approved_at: message.approved_at,
            moderation: moderation
                .iter()
                .filter(|m| m.message_id == message.id)
                .map(message_moderation_view)
                .collect(),
        }));
    }

    Some(MessageView::Participant(ParticipantMessageView {
        id: message.id,
        inquiry_id: message.inquiry_id,
        sender: sender_identity(message.sender_type),
        sender_type: message.sender_type,
        from_me: message.sender_id == viewer_id,
        content: message.content.clone(),
        sent_at: message.sent_at,
    }))
}

fn sender_identity(sender_type: SenderType) -> PublicIdentity {
    match sender_type {
        SenderType::Buyer => REDACTED_BUYER,
        SenderType::Seller => REDACTED_SELLER,
    }
}

fn contact_of(inquiry: &InquiryRow) -> BuyerContact {
    BuyerContact {
        name: inquiry.contact_name.clone(),
        email: inquiry.contact_email.clone(),
        phone: inquiry.contact_phone.clone(),
        company: inquiry.contact_company.clone(),
    }
}

/// The change list of the most recent REQUEST_CHANGES decision, while the
/// inquiry is still waiting on the buyer.
fn requested_changes(inquiry: &InquiryRow, moderation: &[InquiryModerationRow]) -> Option<Vec<String>> {
    if inquiry.status != InquiryStatus::ChangesRequested {
        return None;
    }
    moderation
        .iter()
        .rev()
        .find(|m| m.decision == InquiryAction::RequestChanges)
        .map(|m| m.requested_changes.clone())
}

fn inquiry_moderation_view(row: &InquiryModerationRow) -> InquiryModerationView {
    InquiryModerationView {
        id: row.id,
        admin_id: row.admin_id,
        decision: row.decision,
        notes: row.notes.clone(),
        rejection_reason: row.rejection_reason.clone(),
        requested_changes: row.requested_changes.clone(),
        reviewed_at: row.reviewed_at,
    }
}

fn message_moderation_view(row: &MessageModerationRow) -> MessageModerationView {
    MessageModerationView {
        id: row.id,
        admin_id: row.admin_id,
        decision: row.decision,
        notes: row.notes.clone(),
        rejection_reason: row.rejection_reason.clone(),
        original_content: row.original_content.clone(),
        reviewed_at: row.reviewed_at,
    }
}
