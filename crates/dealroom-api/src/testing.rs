//! In-memory application state and fixtures shared by unit tests.

use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use dealroom_db::Database;
use dealroom_db::models::{DomainRow, UserRow};
use dealroom_db::queries::{domains, users};
use dealroom_types::api::{BuyerContact, ModerateInquiryRequest, SubmitInquiryRequest};
use dealroom_types::models::{DomainStatus, InquiryAction, Role};

use crate::auth::AppStateInner;
use crate::disclosure::Viewer;
use crate::intermediary::IntermediaryDirectory;
use crate::notify::Notifier;
use crate::inquiries;

pub const ADMIN_EMAIL: &str = "moderation@dealroom.test";

pub struct Harness {
    pub state: AppStateInner,
    pub admin: Viewer,
    pub buyer: Viewer,
    pub seller: Viewer,
    pub domain_id: Uuid,
}

pub fn harness() -> Harness {
    let state = AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: "test-secret".into(),
        token_ttl: chrono::Duration::hours(1),
        intermediary: IntermediaryDirectory::new(ADMIN_EMAIL, Duration::from_secs(300)),
        notifier: Notifier::new(64),
    };
    let admin = user_with_email(&state, Role::Admin, ADMIN_EMAIL);
    let buyer = user(&state, Role::Buyer);
    let seller = user(&state, Role::Seller);
    let domain_id = domain(&state, &seller, DomainStatus::Verified);
    Harness {
        state,
        admin,
        buyer,
        seller,
        domain_id,
    }
}

pub fn user(state: &AppStateInner, role: Role) -> Viewer {
    user_with_email(state, role, &format!("{}@dealroom.test", Uuid::new_v4().simple()))
}

fn user_with_email(state: &AppStateInner, role: Role, email: &str) -> Viewer {
    let id = Uuid::new_v4();
    state
        .db
        .with_conn(|conn| {
            users::insert_user(
                conn,
                &UserRow {
                    id,
                    email: email.into(),
                    name: format!("{} user", role),
                    role,
                    password: "not-a-hash".into(),
                    created_at: Utc::now(),
                },
            )
        })
        .unwrap();
    Viewer { id, role }
}

pub fn domain(state: &AppStateInner, owner: &Viewer, status: DomainStatus) -> Uuid {
    let id = Uuid::new_v4();
    state
        .db
        .with_conn(|conn| {
            domains::insert_domain(
                conn,
                &DomainRow {
                    id,
                    name: format!("{}.com", id.simple()),
                    owner_id: owner.id,
                    status,
                    asking_price_cents: Some(500_000),
                    created_at: Utc::now(),
                },
            )
        })
        .unwrap();
    id
}

pub fn contact() -> BuyerContact {
    BuyerContact {
        name: "Jane Buyer".into(),
        email: "jane@buyer.test".into(),
        phone: Some("+1 555 0100".into()),
        company: Some("Acme".into()),
    }
}

pub fn submit_request(domain_id: Uuid) -> SubmitInquiryRequest {
    SubmitInquiryRequest {
        domain_id,
        contact: contact(),
        budget_range: "$5k-$10k".into(),
        intended_use: "Brand for a new product line".into(),
        timeline: "Within 3 months".into(),
        message: "Would you consider an offer?".into(),
    }
}

impl Harness {
    /// Submit an inquiry on the harness domain, as `buyer` or anonymously.
    pub fn submit(&self, buyer: Option<&Viewer>) -> Uuid {
        inquiries::submit_inquiry(&self.state, buyer, submit_request(self.domain_id))
            .unwrap()
            .inquiry_id
    }

    pub fn decide(&self, inquiry_id: Uuid, action: InquiryAction) {
        let req = ModerateInquiryRequest {
            action,
            notes: Some("checked".into()),
            rejection_reason: Some("Off-platform contact details".into()),
            requested_changes: Some(vec!["Clarify budget".into()]),
        };
        inquiries::moderate_inquiry(&self.state, &self.admin, inquiry_id, req).unwrap();
    }

    /// A buyer-owned inquiry that has been approved and forwarded.
    pub fn forwarded(&self) -> Uuid {
        let id = self.submit(Some(&self.buyer));
        self.decide(id, InquiryAction::Approve);
        id
    }
}
