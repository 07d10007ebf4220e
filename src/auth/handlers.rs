use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::api::users::UserResponse;
use crate::auth::extractor::CurrentUser;
use crate::auth::RegisterInput;
use crate::error::{AppError, AuthError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChangeRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
    pub new_password_confirmation: Option<String>,
}

fn client_key(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn enforce_rate_limit(req: &HttpRequest, state: &AppState) -> Result<(), AppError> {
    let key = client_key(req);
    if state.rate_limiter.check_rate_limit(&key).await {
        Ok(())
    } else {
        warn!("Rate limit exceeded for client {}", key);
        Err(AuthError::RateLimited.into())
    }
}

pub async fn login(
    req: web::Json<LoginRequest>,
    http: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    enforce_rate_limit(&http, &state).await?;
    info!("Received login request for user: {}", req.username);
    match state.auth_service.authenticate(&req.username, &req.password).await {
        Ok(token) => {
            info!("Login successful for user: {}", req.username);
            Ok(HttpResponse::Ok().json(AuthResponse { token }))
        }
        Err(e) => {
            warn!("Login failed for user: {}: {}", req.username, e);
            Err(e)
        }
    }
}

/// Creates the account and logs it in.
pub async fn register(
    req: web::Json<RegisterInput>,
    http: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    enforce_rate_limit(&http, &state).await?;
    let username = req.username.as_deref().unwrap_or_default();
    info!("Received registration request for user: {}", username);

    let user = match state.auth_service.register(&req).await {
        Ok((user, _)) => {
            info!("Registration successful for user: {}", user.username);
            user
        }
        Err(e) => {
            warn!("Registration failed for user: {}: {}", username, e);
            return Err(e);
        }
    };

    let token = match state.auth_service.issue_token(&user).await {
        Ok(token) => token,
        Err(e) => {
            error!("Post-registration login failed for user {}: {}", user.id, e);
            return Err(e);
        }
    };

    let viewer = user.clone();
    let user = UserResponse::build(state.store.as_ref(), user, Some(&viewer)).await?;
    Ok(HttpResponse::Created().json(RegisterResponse { token, user }))
}

pub async fn logout(
    current: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state.auth_service.invalidate_token(&current.token).await?;
    info!("User {} logged out", current.user.id);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Successfully logged out"
    })))
}

pub async fn change_password(
    req: web::Json<PasswordChangeRequest>,
    current: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state
        .auth_service
        .change_password(
            &current.user,
            &current.token,
            req.old_password.as_deref(),
            req.new_password.as_deref(),
            req.new_password_confirmation.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Password updated"
    })))
}

pub async fn me(current: CurrentUser, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let viewer = current.user.clone();
    let body = UserResponse::build(state.store.as_ref(), current.user, Some(&viewer)).await?;
    Ok(HttpResponse::Ok().json(body))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/password", web::put().to(change_password))
            .route("/me", web::get().to(me)),
    );
}
