use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::api::pagination::{paginate, PageQuery};
use crate::auth::extractor::{CurrentUser, MaybeUser};
use crate::auth::permissions::{is_self_or_staff, require_self_or_staff};
use crate::auth::{AccountChanges, RegisterInput};
use crate::db::{BingoStore, Page, User};
use crate::error::AppError;
use crate::{AppState, Result};

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub url: String,
    pub username: String,
    /// Only present for the account holder and staff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
    pub bingo_cards: Vec<i64>,
    pub profile: Option<i64>,
}

impl UserResponse {
    pub async fn build(store: &dyn BingoStore, user: User, viewer: Option<&User>) -> Result<Self> {
        let bingo_cards = store.card_ids_for_user(user.id, viewer.is_some()).await?;
        let profile = store.get_profile_by_user(user.id).await?.map(|p| p.id);
        let email = viewer
            .filter(|v| is_self_or_staff(v, user.id))
            .map(|_| user.email.clone());

        Ok(Self {
            id: user.id,
            url: format!("/api/users/{}", user.id),
            username: user.username,
            email,
            is_staff: user.is_staff,
            date_joined: user.date_joined,
            bingo_cards,
            profile,
        })
    }
}

async fn find_user(state: &AppState, id: i64) -> Result<User> {
    state.store.get_user(id).await?.ok_or(AppError::NotFound)
}

pub async fn list_users(
    req: HttpRequest,
    query: web::Query<PageQuery>,
    viewer: MaybeUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let request = query.request(state.config.pagination.page_size)?;
    let page = state.store.list_users(request).await?;

    let mut results = Vec::with_capacity(page.items.len());
    for user in page.items {
        results.push(UserResponse::build(state.store.as_ref(), user, viewer.user()).await?);
    }
    let page = Page {
        count: page.count,
        items: results,
    };
    Ok(HttpResponse::Ok().json(paginate(&req, request, page)?))
}

pub async fn create_user(
    input: web::Json<RegisterInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let (user, _) = state.auth_service.register(&input).await?;
    info!("Created user {} through the API", user.id);

    let viewer = user.clone();
    let body = UserResponse::build(state.store.as_ref(), user, Some(&viewer)).await?;
    Ok(HttpResponse::Created().json(body))
}

pub async fn get_user(
    path: web::Path<i64>,
    viewer: MaybeUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user = find_user(&state, path.into_inner()).await?;
    let body = UserResponse::build(state.store.as_ref(), user, viewer.user()).await?;
    Ok(HttpResponse::Ok().json(body))
}

pub async fn update_user(
    path: web::Path<i64>,
    input: web::Json<AccountChanges>,
    current: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let target = find_user(&state, path.into_inner()).await?;
    require_self_or_staff(&current.user, target.id)?;

    let updated = state.auth_service.update_account(&target, &input).await?;
    let body = UserResponse::build(state.store.as_ref(), updated, Some(&current.user)).await?;
    Ok(HttpResponse::Ok().json(body))
}

pub async fn delete_user(
    path: web::Path<i64>,
    current: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let target = find_user(&state, path.into_inner()).await?;
    require_self_or_staff(&current.user, target.id)?;

    match state.store.delete_user(target.id).await {
        Ok(()) => {
            info!("User {} deleted by {}", target.id, current.user.id);
            Ok(HttpResponse::NoContent().finish())
        }
        Err(e) => {
            error!("Failed to delete user {}: {}", target.id, e);
            Err(e)
        }
    }
}
