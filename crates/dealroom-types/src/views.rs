//! Role-scoped projections of inquiries and messages.
//!
//! Each viewer relation has its own struct so that fields a viewer must not
//! see are absent from the type, not merely left empty. The untagged
//! wrappers serialize as the inner struct.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::api::BuyerContact;
use crate::models::{InquiryAction, InquiryStatus, MessageAction, MessageStatus, SenderType};

/// Placeholder identity shown where a counterparty would otherwise appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublicIdentity {
    pub id: &'static str,
    pub name: &'static str,
    pub email: &'static str,
}

/// The only buyer identity a seller ever receives.
pub const REDACTED_BUYER: PublicIdentity = PublicIdentity {
    id: "anonymous",
    name: "Anonymous Buyer",
    email: "hidden@example.com",
};

/// The only seller identity a buyer ever receives.
pub const REDACTED_SELLER: PublicIdentity = PublicIdentity {
    id: "seller",
    name: "Domain Owner",
    email: "hidden@example.com",
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainSummary {
    pub id: Uuid,
    pub name: String,
}

// -- Inquiries --

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InquiryView {
    Admin(AdminInquiryView),
    Buyer(BuyerInquiryView),
    Seller(SellerInquiryView),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InquiryModerationView {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub decision: InquiryAction,
    pub notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub requested_changes: Vec<String>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminInquiryView {
    pub id: Uuid,
    pub domain: DomainSummary,
    pub buyer_id: Option<Uuid>,
    pub seller_id: Uuid,
    pub anonymous_buyer_id: String,
    pub contact: BuyerContact,
    pub budget_range: String,
    pub intended_use: String,
    pub timeline: String,
    pub message: String,
    pub status: InquiryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub moderation: Vec<InquiryModerationView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuyerInquiryView {
    pub id: Uuid,
    pub domain: DomainSummary,
    pub seller: PublicIdentity,
    pub contact: BuyerContact,
    pub budget_range: String,
    pub intended_use: String,
    pub timeline: String,
    pub message: String,
    pub status: InquiryStatus,
    /// Present while the inquiry waits for the buyer to revise it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_changes: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The non-identifying part of a buyer profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnonymousBuyerInfo {
    pub anonymous_id: String,
    pub budget_range: String,
    pub intended_use: String,
    pub timeline: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellerInquiryView {
    pub id: Uuid,
    pub domain: DomainSummary,
    pub buyer: PublicIdentity,
    pub buyer_info: AnonymousBuyerInfo,
    pub message: String,
    pub status: InquiryStatus,
    pub moderation_status: &'static str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Messages --

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageView {
    Admin(AdminMessageView),
    Participant(ParticipantMessageView),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageModerationView {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub decision: MessageAction,
    pub notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub original_content: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminMessageView {
    pub id: Uuid,
    pub inquiry_id: Uuid,
    pub sender_id: Uuid,
    pub sender_type: SenderType,
    pub receiver_id: Uuid,
    pub content: String,
    pub status: MessageStatus,
    pub sent_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub moderation: Vec<MessageModerationView>,
}

/// A released message as seen by the buyer or the seller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantMessageView {
    pub id: Uuid,
    pub inquiry_id: Uuid,
    pub sender: PublicIdentity,
    pub sender_type: SenderType,
    pub from_me: bool,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}
