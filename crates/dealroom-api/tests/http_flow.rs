use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use dealroom_api::auth::{AppStateInner, create_token};
use dealroom_api::intermediary::IntermediaryDirectory;
use dealroom_api::notify::Notifier;
use dealroom_db::Database;
use dealroom_db::models::{DomainRow, UserRow};
use dealroom_db::queries::{domains, users};
use dealroom_types::models::{DomainStatus, Role};

const SECRET: &str = "integration-secret";
const ADMIN_EMAIL: &str = "moderation@dealroom.test";

struct App {
    router: Router,
    admin: String,
    buyer: String,
    seller: String,
    domain_id: Uuid,
}

fn account(db: &Database, role: Role, email: &str) -> (Uuid, String) {
    let id = Uuid::new_v4();
    db.with_conn(|conn| {
        users::insert_user(
            conn,
            &UserRow {
                id,
                email: email.into(),
                name: format!("{} account", role),
                role,
                password: "unused".into(),
                created_at: chrono::Utc::now(),
            },
        )
    })
    .unwrap();
    (id, create_token(SECRET, id, role, chrono::Duration::hours(1)).unwrap())
}

fn app() -> App {
    let db = Database::open_in_memory().unwrap();
    let (_, admin) = account(&db, Role::Admin, ADMIN_EMAIL);
    let (_, buyer) = account(&db, Role::Buyer, "buyer@dealroom.test");
    let (seller_id, seller) = account(&db, Role::Seller, "seller@dealroom.test");

    let domain_id = Uuid::new_v4();
    db.with_conn(|conn| {
        domains::insert_domain(
            conn,
            &DomainRow {
                id: domain_id,
                name: "brandable.io".into(),
                owner_id: seller_id,
                status: DomainStatus::Verified,
                asking_price_cents: Some(1_200_000),
                created_at: chrono::Utc::now(),
            },
        )
    })
    .unwrap();

    let state = Arc::new(AppStateInner {
        db,
        jwt_secret: SECRET.into(),
        token_ttl: chrono::Duration::hours(1),
        intermediary: IntermediaryDirectory::new(ADMIN_EMAIL, Duration::from_secs(300)),
        notifier: Notifier::default(),
    });

    App {
        router: dealroom_api::router(state),
        admin,
        buyer,
        seller,
        domain_id,
    }
}

async fn call(router: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn inquiry_body(domain_id: Uuid) -> Value {
    json!({
        "domain_id": domain_id,
        "contact": {
            "name": "Jane Buyer",
            "email": "jane@buyer.test",
            "phone": "+1 555 0100"
        },
        "budget_range": "$10k-$20k",
        "intended_use": "Product launch",
        "timeline": "Next quarter",
        "message": "Is this still available?"
    })
}

#[tokio::test]
async fn inquiry_reaches_seller_only_after_approval() {
    let app = app();

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/inquiries",
        Some(&app.buyer),
        Some(inquiry_body(app.domain_id)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "PENDING_REVIEW");
    let inquiry_id = body["inquiry_id"].as_str().unwrap().to_string();
    let path = format!("/inquiries/{}", inquiry_id);

    let (status, body) = call(&app.router, Method::GET, &path, Some(&app.seller), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = call(&app.router, Method::GET, "/inquiries/received", Some(&app.seller), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);

    let (status, body) = call(&app.router, Method::GET, "/admin/inquiries/pending", Some(&app.admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["contact"]["email"], "jane@buyer.test");

    let (status, _) = call(
        &app.router,
        Method::POST,
        &format!("/admin/inquiries/{}/moderate", inquiry_id),
        Some(&app.admin),
        Some(json!({ "action": "APPROVE", "notes": "clean" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app.router, Method::GET, &path, Some(&app.seller), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "FORWARDED");
    assert_eq!(body["buyer"]["name"], "Anonymous Buyer");
    assert_eq!(body["buyer"]["email"], "hidden@example.com");
    let raw = body.to_string();
    assert!(!raw.contains("jane@buyer.test"));
    assert!(!raw.contains("Jane Buyer"));
    assert!(body.get("contact").is_none());
}

#[tokio::test]
async fn messages_flow_through_moderation() {
    let app = app();

    let (_, body) = call(
        &app.router,
        Method::POST,
        "/inquiries",
        Some(&app.buyer),
        Some(inquiry_body(app.domain_id)),
    )
    .await;
    let inquiry_id = body["inquiry_id"].as_str().unwrap().to_string();
    call(
        &app.router,
        Method::POST,
        &format!("/admin/inquiries/{}/moderate", inquiry_id),
        Some(&app.admin),
        Some(json!({ "action": "APPROVE" })),
    )
    .await;

    let thread = format!("/inquiries/{}/messages", inquiry_id);
    let (status, body) = call(
        &app.router,
        Method::POST,
        &thread,
        Some(&app.seller),
        Some(json!({ "content": "Email me at owner@brandable.io" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "PENDING");
    let message_id = body["message_id"].as_str().unwrap().to_string();

    let (_, body) = call(&app.router, Method::GET, &thread, Some(&app.buyer), None).await;
    assert_eq!(body["total"], 0);

    let (_, body) = call(&app.router, Method::GET, "/admin/messages/pending", Some(&app.admin), None).await;
    assert_eq!(body["items"][0]["id"], message_id.as_str());

    let (status, body) = call(
        &app.router,
        Method::POST,
        &format!("/admin/messages/{}/moderate", message_id),
        Some(&app.admin),
        Some(json!({ "action": "EDIT", "edited_content": "Happy to discuss price here" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["moderation"][0]["original_content"], "Email me at owner@brandable.io");

    let (_, body) = call(&app.router, Method::GET, &thread, Some(&app.buyer), None).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["content"], "Happy to discuss price here");
    assert_eq!(body["items"][0]["sender"]["name"], "Domain Owner");
    assert_eq!(body["items"][0]["from_me"], false);

    let (_, body) = call(&app.router, Method::GET, &format!("/inquiries/{}", inquiry_id), Some(&app.buyer), None).await;
    assert_eq!(body["status"], "SELLER_RESPONDED");
}

#[tokio::test]
async fn auth_and_input_errors_use_the_error_envelope() {
    let app = app();

    let (status, body) = call(&app.router, Method::GET, "/inquiries/mine", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = call(&app.router, Method::GET, "/inquiries/mine", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app.router, Method::GET, "/admin/inquiries/pending", Some(&app.buyer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app.router, Method::GET, "/inquiries/not-a-uuid", Some(&app.buyer), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = call(
        &app.router,
        Method::GET,
        "/inquiries/mine?page=1&limit=500",
        Some(&app.buyer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app.router,
        Method::POST,
        "/admin/inquiries/bulk-moderate",
        Some(&app.admin),
        Some(json!({ "inquiry_ids": [], "action": "APPROVE" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let mut own = inquiry_body(app.domain_id);
    own["message"] = json!("");
    let (status, _) = call(&app.router, Method::POST, "/inquiries", None, Some(own)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app.router,
        Method::POST,
        "/inquiries",
        Some(&app.seller),
        Some(inquiry_body(app.domain_id)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
