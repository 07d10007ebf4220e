use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::info;

use crate::api::cards::{SquareResponse, SQUARE_TEXT_MAX};
use crate::api::pagination::{paginate, PageQuery};
use crate::auth::extractor::{CurrentUser, MaybeUser};
use crate::auth::permissions::require_owner;
use crate::db::models::{BingoCardSquare, CardDetail};
use crate::error::{AppError, AuthError, FieldErrors};
use crate::validation::{self, max_length};
use crate::{AppState, Result};

#[derive(Debug, Default, Deserialize)]
pub struct SquarePayload {
    pub text: Option<String>,
}

impl SquarePayload {
    pub fn validate(&self) -> Result<String> {
        let mut errors = FieldErrors::new();
        let text = validation::required(&mut errors, "text", self.text.as_deref())
            .filter(|t| max_length(&mut errors, "text", t, SQUARE_TEXT_MAX))
            .map(str::to_string);
        errors.into_result()?;
        text.ok_or_else(|| AppError::ValidationError("missing square text".into()))
    }
}

/// A square together with the card that owns it.
async fn find_square(state: &AppState, id: i64) -> Result<(BingoCardSquare, CardDetail)> {
    let square = state.store.get_square(id).await?.ok_or(AppError::NotFound)?;
    let card = state
        .store
        .get_card(square.card_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok((square, card))
}

pub async fn list_squares(
    req: HttpRequest,
    query: web::Query<PageQuery>,
    viewer: MaybeUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let request = query.request(state.config.pagination.page_size)?;
    let page = state
        .store
        .list_squares(viewer.is_authenticated(), request)
        .await?
        .map(SquareResponse::from);
    Ok(HttpResponse::Ok().json(paginate(&req, request, page)?))
}

pub async fn get_square(
    path: web::Path<i64>,
    viewer: MaybeUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let (square, card) = find_square(&state, path.into_inner()).await?;
    if card.card.private && !viewer.is_authenticated() {
        return Err(AuthError::MissingToken.into());
    }
    Ok(HttpResponse::Ok().json(SquareResponse::from(square)))
}

/// Only the text is editable, and only by the card's creator.
pub async fn update_square(
    path: web::Path<i64>,
    input: web::Json<SquarePayload>,
    current: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let (square, card) = find_square(&state, path.into_inner()).await?;
    require_owner(&current.user, card.card.creator_id)?;

    let text = input.validate()?;
    let updated = state.store.update_square(square.id, text).await?;
    info!("User {} edited square {} of card {}", current.user.id, updated.id, card.card.id);
    Ok(HttpResponse::Ok().json(SquareResponse::from(updated)))
}
