use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{InquiryStatus, MessageStatus, SenderType};

/// Status-change notifications handed to the outbound notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NotificationEvent {
    /// A new inquiry entered the moderation queue
    InquirySubmitted { inquiry_id: Uuid, domain_name: String },

    /// A buyer revised an inquiry after changes were requested
    InquiryResubmitted { inquiry_id: Uuid },

    /// An admin decided on an inquiry, or closed it
    InquiryStatusChanged {
        inquiry_id: Uuid,
        status: InquiryStatus,
    },

    /// A buyer or seller message is waiting for moderation
    MessageQueued {
        message_id: Uuid,
        inquiry_id: Uuid,
        sender_type: SenderType,
    },

    /// An admin released or rejected a message
    MessageModerated {
        message_id: Uuid,
        inquiry_id: Uuid,
        status: MessageStatus,
        /// Set only when the message was released to a counterparty.
        recipient_id: Option<Uuid>,
    },
}

impl NotificationEvent {
    pub fn inquiry_id(&self) -> Uuid {
        match self {
            Self::InquirySubmitted { inquiry_id, .. }
            | Self::InquiryResubmitted { inquiry_id }
            | Self::InquiryStatusChanged { inquiry_id, .. }
            | Self::MessageQueued { inquiry_id, .. }
            | Self::MessageModerated { inquiry_id, .. } => *inquiry_id,
        }
    }

    /// Events that only the moderation team needs to hear about.
    pub fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Self::InquirySubmitted { .. } | Self::InquiryResubmitted { .. } | Self::MessageQueued { .. }
        )
    }
}
