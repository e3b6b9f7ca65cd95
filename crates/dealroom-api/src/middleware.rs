use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use dealroom_types::models::Claims;

use crate::auth::AppState;
use crate::disclosure::Viewer;
use crate::error::{ApiError, ApiResult};

/// Extract and validate the JWT from the Authorization header and attach the
/// caller as a [`Viewer`] extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let viewer = bearer_viewer(req.headers(), &state.jwt_secret)?
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;

    req.extensions_mut().insert(viewer);
    Ok(next.run(req).await)
}

/// `Ok(None)` when no Authorization header is present; a header that is
/// present but invalid is always an error.
pub fn bearer_viewer(headers: &HeaderMap, secret: &str) -> ApiResult<Option<Viewer>> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("malformed Authorization header".into()))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized("invalid or expired token".into()))?;

    Ok(Some(Viewer {
        id: token_data.claims.sub,
        role: token_data.claims.role,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use dealroom_types::models::Role;
    use uuid::Uuid;

    #[test]
    fn token_round_trip() {
        let id = Uuid::new_v4();
        let token = crate::auth::create_token("s3cret", id, Role::Seller, chrono::Duration::hours(1)).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );

        let viewer = bearer_viewer(&headers, "s3cret").unwrap().unwrap();
        assert_eq!(viewer, Viewer { id, role: Role::Seller });
        assert!(matches!(bearer_viewer(&headers, "other"), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn absent_header_is_anonymous() {
        assert_eq!(bearer_viewer(&HeaderMap::new(), "s3cret").unwrap(), None);
    }
}
