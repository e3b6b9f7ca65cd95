use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DomainStatus, InquiryAction, InquiryStatus, MessageAction, MessageStatus, Role};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub role: Role,
    pub token: String,
}

// -- Domains --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDomainRequest {
    pub name: String,
    pub asking_price_cents: Option<i64>,
}

/// Public listing data. The owner is deliberately absent.
#[derive(Debug, Clone, Serialize)]
pub struct DomainResponse {
    pub id: Uuid,
    pub name: String,
    pub status: DomainStatus,
    pub asking_price_cents: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// -- Inquiries --

/// Buyer contact details. Never serialized towards a seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuyerContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitInquiryRequest {
    pub domain_id: Uuid,
    pub contact: BuyerContact,
    pub budget_range: String,
    pub intended_use: String,
    pub timeline: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitInquiryResponse {
    pub inquiry_id: Uuid,
    pub status: InquiryStatus,
    pub message: String,
}

/// Revised inquiry sent by the buyer after an admin requested changes.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResubmitInquiryRequest {
    pub contact: BuyerContact,
    pub budget_range: String,
    pub intended_use: String,
    pub timeline: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModerateInquiryRequest {
    pub action: InquiryAction,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub requested_changes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkModerateInquiriesRequest {
    pub inquiry_ids: Vec<Uuid>,
    pub action: InquiryAction,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub requested_changes: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct BulkModerateResponse {
    pub updated_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvertInquiryRequest {
    pub agreed_price_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct DealResponse {
    pub deal_id: Uuid,
    pub inquiry_id: Uuid,
    pub domain_id: Uuid,
    pub agreed_price_cents: i64,
    pub created_at: DateTime<Utc>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub message_id: Uuid,
    pub status: MessageStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModerateMessageRequest {
    pub action: MessageAction,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub edited_content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkModerateMessagesRequest {
    pub message_ids: Vec<Uuid>,
    pub action: MessageAction,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

// -- Pagination --

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageQuery {
    pub fn offset(&self) -> u32 {
        (self.page.saturating_sub(1)).saturating_mul(self.limit)
    }
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize)]
pub struct SellerInquiryQuery {
    pub domain_id: Option<Uuid>,
    pub status: Option<InquiryStatus>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for SellerInquiryQuery {
    fn default() -> Self {
        Self {
            domain_id: None,
            status: None,
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl SellerInquiryQuery {
    pub fn page(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}
