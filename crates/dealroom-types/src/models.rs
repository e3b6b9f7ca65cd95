use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a stored or submitted enum string is not a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a SCREAMING_SNAKE_CASE enum that round-trips through SQLite TEXT
/// columns and JSON with the same spelling.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum! {
    /// Account role carried in the session token.
    Role {
        Buyer => "BUYER",
        Seller => "SELLER",
        Admin => "ADMIN",
    }
}

text_enum! {
    DomainStatus {
        PendingVerification => "PENDING_VERIFICATION",
        Verified => "VERIFIED",
        Suspended => "SUSPENDED",
    }
}

text_enum! {
    /// Lifecycle of a buyer inquiry. See [`InquiryStatus::can_transition_to`].
    InquiryStatus {
        PendingReview => "PENDING_REVIEW",
        Forwarded => "FORWARDED",
        Rejected => "REJECTED",
        ChangesRequested => "CHANGES_REQUESTED",
        SellerResponded => "SELLER_RESPONDED",
        Completed => "COMPLETED",
        ConvertedToDeal => "CONVERTED_TO_DEAL",
    }
}

text_enum! {
    MessageStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

text_enum! {
    SenderType {
        Buyer => "BUYER",
        Seller => "SELLER",
    }
}

text_enum! {
    InquiryAction {
        Approve => "APPROVE",
        Reject => "REJECT",
        RequestChanges => "REQUEST_CHANGES",
    }
}

text_enum! {
    MessageAction {
        Approve => "APPROVE",
        Reject => "REJECT",
        Edit => "EDIT",
    }
}

impl DomainStatus {
    /// Only verified listings accept public inquiries.
    pub fn is_inquirable(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl InquiryStatus {
    /// Statuses a seller may see: everything after admin approval.
    pub const SELLER_VISIBLE: [InquiryStatus; 4] = [
        Self::Forwarded,
        Self::SellerResponded,
        Self::Completed,
        Self::ConvertedToDeal,
    ];

    /// The complete transition table of the inquiry lifecycle.
    pub fn can_transition_to(&self, next: InquiryStatus) -> bool {
        use InquiryStatus::*;
        matches!(
            (*self, next),
            (PendingReview, Forwarded | Rejected | ChangesRequested)
                | (ChangesRequested, PendingReview)
                | (Forwarded, SellerResponded)
                | (Forwarded | SellerResponded, Completed | ConvertedToDeal)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Completed | Self::ConvertedToDeal)
    }

    pub fn is_seller_visible(&self) -> bool {
        Self::SELLER_VISIBLE.contains(self)
    }

    /// Buyer and seller may exchange messages only while the inquiry is live.
    pub fn is_open_for_messages(&self) -> bool {
        matches!(self, Self::Forwarded | Self::SellerResponded)
    }

    /// Status wording shown to sellers in place of moderation details.
    pub fn seller_label(&self) -> &'static str {
        match self {
            Self::Forwarded => "Approved by moderation",
            Self::SellerResponded => "Reply sent for review",
            Self::Completed => "Completed",
            Self::ConvertedToDeal => "Converted to deal",
            Self::PendingReview | Self::ChangesRequested | Self::Rejected => "Under review",
        }
    }
}

impl InquiryAction {
    pub fn target_status(&self) -> InquiryStatus {
        match self {
            Self::Approve => InquiryStatus::Forwarded,
            Self::Reject => InquiryStatus::Rejected,
            Self::RequestChanges => InquiryStatus::ChangesRequested,
        }
    }
}

impl MessageAction {
    pub fn target_status(&self) -> MessageStatus {
        match self {
            Self::Approve | Self::Edit => MessageStatus::Approved,
            Self::Reject => MessageStatus::Rejected,
        }
    }
}

/// JWT claims issued by `/auth/*` and checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}
