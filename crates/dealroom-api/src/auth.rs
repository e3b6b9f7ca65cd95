use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use dealroom_db::Database;
use dealroom_db::models::UserRow;
use dealroom_db::queries::users;
use dealroom_types::api::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use dealroom_types::models::{Claims, Role};

use crate::error::{ApiError, ApiResult};
use crate::intermediary::IntermediaryDirectory;
use crate::notify::Notifier;
use crate::{run_blocking, validate};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub intermediary: IntermediaryDirectory,
    pub notifier: Notifier,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = run_blocking(state, move |state| register_user(state, req)).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    run_blocking(state, move |state| login_user(state, req)).await.map(Json)
}

pub fn register_user(state: &AppStateInner, req: RegisterRequest) -> ApiResult<RegisterResponse> {
    if req.role == Role::Admin {
        return Err(ApiError::forbidden("admin accounts cannot self-register"));
    }
    let email = validate::email(&req.email)?;
    let name = validate::required("name", &req.name, 100)?;
    if req.password.len() < 8 {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }

    let user = UserRow {
        id: Uuid::new_v4(),
        email,
        name,
        role: req.role,
        password: hash_password(&req.password)?,
        created_at: chrono::Utc::now(),
    };
    let user_id = user.id;

    state.db.transaction(|tx| {
        if users::find_user_by_email(tx, &user.email)?.is_some() {
            return Err(ApiError::Conflict("an account with this email already exists".into()));
        }
        users::insert_user(tx, &user)?;
        Ok(())
    })?;
    info!("Registered {} account {}", req.role, user_id);

    let token = create_token(&state.jwt_secret, user_id, req.role, state.token_ttl)?;
    Ok(RegisterResponse { user_id, token })
}

pub fn login_user(state: &AppStateInner, req: LoginRequest) -> ApiResult<LoginResponse> {
    let invalid = || ApiError::Unauthorized("invalid email or password".into());

    let email = req.email.trim().to_lowercase();
    let user = state.db.get_user_by_email(&email)?.ok_or_else(invalid)?;

    let parsed_hash =
        PasswordHash::new(&user.password).map_err(|e| anyhow::anyhow!("stored hash unreadable: {}", e))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    let token = create_token(&state.jwt_secret, user.id, user.role, state.token_ttl)?;
    Ok(LoginResponse {
        user_id: user.id,
        role: user.role,
        token,
    })
}

/// Create the admin intermediary account unless it already exists.
/// Returns its id either way.
pub fn seed_admin(db: &Database, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let email = email.trim().to_lowercase();
    if let Some(existing) = db.with_conn(|conn| users::find_admin_id_by_email(conn, &email))? {
        return Ok(existing);
    }
    if db.get_user_by_email(&email)?.is_some() {
        anyhow::bail!("{} is registered but is not an admin account", email);
    }

    let id = Uuid::new_v4();
    let password = hash_password(password).map_err(|e| anyhow::anyhow!("{}", e))?;
    db.with_conn(|conn| {
        users::insert_user(
            conn,
            &UserRow {
                id,
                email: email.clone(),
                name: "Dealroom Moderation".into(),
                role: Role::Admin,
                password,
                created_at: chrono::Utc::now(),
            },
        )
    })?;
    info!("Seeded admin intermediary {}", email);
    Ok(id)
}

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn create_token(secret: &str, user_id: Uuid, role: Role, ttl: chrono::Duration) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        role,
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
