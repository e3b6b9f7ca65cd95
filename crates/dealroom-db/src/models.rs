/// Database row types. Columns are parsed into typed values when a row is
/// read; API shapes live in dealroom-types and are built from these.
use chrono::{DateTime, Utc};
use uuid::Uuid;

use dealroom_types::models::{
    DomainStatus, InquiryAction, InquiryStatus, MessageAction, MessageStatus, Role, SenderType,
};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DomainRow {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub status: DomainStatus,
    pub asking_price_cents: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct InquiryRow {
    pub id: Uuid,
    pub domain_id: Uuid,
    /// Joined from `domains`; ignored on insert.
    pub domain_name: String,
    pub buyer_id: Option<Uuid>,
    pub seller_id: Uuid,
    pub anonymous_buyer_id: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub contact_company: Option<String>,
    pub budget_range: String,
    pub intended_use: String,
    pub timeline: String,
    pub message: String,
    pub status: InquiryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: Uuid,
    pub inquiry_id: Uuid,
    pub sender_id: Uuid,
    pub sender_type: SenderType,
    pub receiver_id: Uuid,
    pub content: String,
    pub status: MessageStatus,
    pub sent_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct InquiryModerationRow {
    pub id: Uuid,
    pub inquiry_id: Uuid,
    pub admin_id: Uuid,
    pub decision: InquiryAction,
    pub notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub requested_changes: Vec<String>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MessageModerationRow {
    pub id: Uuid,
    pub message_id: Uuid,
    pub admin_id: Uuid,
    pub decision: MessageAction,
    pub notes: Option<String>,
    pub rejection_reason: Option<String>,
    /// Content as sent, kept when an admin edited it before release.
    pub original_content: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DealRow {
    pub id: Uuid,
    pub inquiry_id: Uuid,
    pub domain_id: Uuid,
    pub buyer_id: Option<Uuid>,
    pub seller_id: Uuid,
    pub agreed_price_cents: i64,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}
