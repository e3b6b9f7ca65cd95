pub mod auth;
pub mod disclosure;
pub mod domains;
pub mod error;
pub mod inquiries;
pub mod intermediary;
pub mod messages;
pub mod middleware;
pub mod moderation;
pub mod notify;
pub mod validate;

#[cfg(test)]
mod testing;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::auth::{AppState, AppStateInner};
use crate::error::{ApiError, ApiResult};

/// Route table. The server binary adds CORS and tracing layers on top.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/domains/{domain_id}", get(domains::get))
        .route("/inquiries", post(inquiries::submit))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/domains", post(domains::create))
        .route("/domains/mine", get(domains::list_mine))
        .route("/inquiries/mine", get(inquiries::list_mine))
        .route("/inquiries/received", get(inquiries::list_received))
        .route("/inquiries/{inquiry_id}", get(inquiries::get).put(inquiries::resubmit))
        .route(
            "/inquiries/{inquiry_id}/messages",
            get(messages::list).post(messages::send),
        )
        .route("/admin/domains/{domain_id}/verify", post(domains::verify))
        .route("/admin/inquiries/pending", get(inquiries::moderation_queue))
        .route("/admin/inquiries/bulk-moderate", post(inquiries::bulk_moderate))
        .route("/admin/inquiries/{inquiry_id}/moderate", post(inquiries::moderate))
        .route("/admin/inquiries/{inquiry_id}/complete", post(inquiries::complete))
        .route("/admin/inquiries/{inquiry_id}/convert", post(inquiries::convert))
        .route("/admin/messages/pending", get(messages::moderation_queue))
        .route("/admin/messages/bulk-moderate", post(messages::bulk_moderate))
        .route("/admin/messages/{message_id}/moderate", post(messages::moderate))
        .layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_blocking<F, T>(state: AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&AppStateInner) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e)))?
}
