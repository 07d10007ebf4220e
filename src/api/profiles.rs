use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::pagination::{paginate, PageQuery};
use crate::auth::extractor::{CurrentUser, MaybeUser};
use crate::auth::permissions::{is_self_or_staff, require_self_or_staff};
use crate::db::models::{ProfileChanges, ProfileSummary};
use crate::error::{AppError, AuthError, FieldErrors};
use crate::validation::{max_length, validate_url};
use crate::{AppState, Result};

pub const PICTURE_MAX: usize = 100;
pub const ABOUT_ME_MAX: usize = 140;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub url: String,
    pub user: i64,
    pub username: String,
    pub slug: String,
    pub created_date: DateTime<Utc>,
    pub picture: String,
    pub website: String,
    pub private: bool,
    pub about_me: String,
}

impl From<ProfileSummary> for ProfileResponse {
    fn from(summary: ProfileSummary) -> Self {
        let profile = summary.profile;
        Self {
            id: profile.id,
            url: format!("/api/profiles/{}", profile.id),
            user: profile.user_id,
            username: summary.username,
            slug: profile.slug,
            created_date: profile.created_date,
            picture: profile.picture,
            website: profile.website,
            private: profile.private,
            about_me: profile.about_me,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfilePayload {
    pub picture: Option<String>,
    pub website: Option<String>,
    pub private: Option<bool>,
    pub about_me: Option<String>,
}

impl ProfilePayload {
    /// Empty strings are allowed for every text field and clear it.
    pub fn validate(&self) -> Result<ProfileChanges> {
        let mut errors = FieldErrors::new();
        let picture = self.picture.as_deref().map(str::trim);
        if let Some(picture) = picture {
            max_length(&mut errors, "picture", picture, PICTURE_MAX);
        }
        let website = self.website.as_deref().map(str::trim);
        if let Some(website) = website {
            validate_url(&mut errors, "website", website);
        }
        let about_me = self.about_me.as_deref().map(str::trim);
        if let Some(about_me) = about_me {
            max_length(&mut errors, "about_me", about_me, ABOUT_ME_MAX);
        }
        errors.into_result()?;

        Ok(ProfileChanges {
            picture: picture.map(str::to_string),
            website: website.map(str::to_string),
            private: self.private,
            about_me: about_me.map(str::to_string),
        })
    }
}

async fn find_profile(state: &AppState, id: i64) -> Result<ProfileSummary> {
    state.store.get_profile(id).await?.ok_or(AppError::NotFound)
}

pub async fn list_profiles(
    req: HttpRequest,
    query: web::Query<PageQuery>,
    viewer: MaybeUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let request = query.request(state.config.pagination.page_size)?;
    let page = state
        .store
        .list_profiles(viewer.is_authenticated(), request)
        .await?
        .map(ProfileResponse::from);
    Ok(HttpResponse::Ok().json(paginate(&req, request, page)?))
}

/// Profile pages require a login; private ones are limited to their owner
/// and staff.
pub async fn get_profile(
    path: web::Path<i64>,
    viewer: MaybeUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let Some(user) = viewer.user() else {
        return Err(AuthError::MissingToken.into());
    };
    let summary = find_profile(&state, path.into_inner()).await?;
    if summary.profile.private && !is_self_or_staff(user, summary.profile.user_id) {
        warn!("User {} denied private profile {}", user.id, summary.profile.id);
        return Err(AppError::PermissionDenied);
    }
    Ok(HttpResponse::Ok().json(ProfileResponse::from(summary)))
}

pub async fn update_profile(
    path: web::Path<i64>,
    input: web::Json<ProfilePayload>,
    current: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let summary = find_profile(&state, path.into_inner()).await?;
    require_self_or_staff(&current.user, summary.profile.user_id)?;

    let changes = input.validate()?;
    let profile = state.store.update_profile(summary.profile.id, changes).await?;
    info!("Profile {} updated by user {}", profile.id, current.user.id);

    Ok(HttpResponse::Ok().json(ProfileResponse::from(ProfileSummary {
        profile,
        username: summary.username,
    })))
}
