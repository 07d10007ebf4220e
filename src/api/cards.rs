use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::api::pagination::{paginate, PageQuery};
use crate::auth::extractor::{CurrentUser, MaybeUser};
use crate::auth::permissions::require_owner;
use crate::db::models::{
    BingoCardSquare, CardChanges, CardDetail, CardFilter, NewCard, DEFAULT_FREE_SPACE,
    SQUARES_PER_CARD,
};
use crate::db::PageRequest;
use crate::error::{AppError, AuthError, FieldErrors};
use crate::validation::{self, max_length};
use crate::{AppState, Result};

pub const TITLE_MAX: usize = 50;
pub const FREE_SPACE_MAX: usize = 40;
pub const SQUARE_TEXT_MAX: usize = 40;

pub const WRONG_SQUARE_COUNT: &str = "Must have exactly 24 squares";

#[derive(Debug, Serialize)]
pub struct SquareResponse {
    pub id: i64,
    pub url: String,
    pub card: i64,
    pub position: i32,
    pub text: String,
    pub created_date: DateTime<Utc>,
}

impl From<BingoCardSquare> for SquareResponse {
    fn from(square: BingoCardSquare) -> Self {
        Self {
            id: square.id,
            url: format!("/api/squares/{}", square.id),
            card: square.card_id,
            position: square.position,
            text: square.text,
            created_date: square.created_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub slug: String,
    pub free_space: String,
    pub creator: String,
    pub creator_id: i64,
    pub private: bool,
    pub created_date: DateTime<Utc>,
    pub squares: Vec<SquareResponse>,
}

impl From<CardDetail> for CardResponse {
    fn from(detail: CardDetail) -> Self {
        let card = detail.card;
        Self {
            id: card.id,
            url: format!("/api/cards/{}", card.id),
            title: card.title,
            slug: card.slug,
            free_space: card.free_space,
            creator: detail.creator,
            creator_id: card.creator_id,
            private: card.private,
            created_date: card.created_date,
            squares: detail.squares.into_iter().map(SquareResponse::from).collect(),
        }
    }
}

/// A square may be sent as `{"text": "..."}` or as a bare string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SquareInput {
    Text(String),
    Object { text: Option<String> },
}

impl SquareInput {
    fn text(&self) -> Option<&str> {
        match self {
            SquareInput::Text(text) => Some(text),
            SquareInput::Object { text } => text.as_deref(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CardPayload {
    pub title: Option<String>,
    pub free_space: Option<String>,
    pub private: Option<bool>,
    pub squares: Option<Vec<SquareInput>>,
}

impl CardPayload {
    /// Checks the payload. With `partial` unset, missing `title` and
    /// `squares` are errors and missing optional fields take their defaults.
    pub fn validate(&self, partial: bool) -> Result<CardChanges> {
        let mut errors = FieldErrors::new();

        let title = match self.title.as_deref() {
            None if partial => None,
            value => validation::required(&mut errors, "title", value)
                .filter(|t| max_length(&mut errors, "title", t, TITLE_MAX))
                .map(str::to_string),
        };

        let free_space = match self.free_space.as_deref().map(str::trim) {
            None if partial => None,
            None | Some("") => Some(DEFAULT_FREE_SPACE.to_string()),
            Some(text) => {
                max_length(&mut errors, "free_space", text, FREE_SPACE_MAX);
                Some(text.to_string())
            }
        };

        let private = match self.private {
            None if !partial => Some(false),
            private => private,
        };

        let squares = match &self.squares {
            None if partial => None,
            None => {
                errors.add("squares", validation::REQUIRED);
                None
            }
            Some(squares) => {
                if squares.len() != SQUARES_PER_CARD {
                    errors.add("squares", WRONG_SQUARE_COUNT);
                }
                let mut texts = Vec::with_capacity(squares.len());
                for (position, square) in squares.iter().enumerate() {
                    let field = format!("squares.{}.text", position);
                    if let Some(text) = validation::required(&mut errors, &field, square.text()) {
                        max_length(&mut errors, &field, text, SQUARE_TEXT_MAX);
                        texts.push(text.to_string());
                    }
                }
                Some(texts)
            }
        };

        errors.into_result()?;
        Ok(CardChanges {
            title,
            free_space,
            private,
            squares,
        })
    }
}

async fn find_card(state: &AppState, id: i64) -> Result<CardDetail> {
    state.store.get_card(id).await?.ok_or(AppError::NotFound)
}

async fn list_filtered(
    req: &HttpRequest,
    query: &PageQuery,
    filter: CardFilter,
    state: &AppState,
) -> Result<HttpResponse> {
    let request = query.request(state.config.pagination.page_size)?;
    let page = state
        .store
        .list_cards(filter, request)
        .await?
        .map(CardResponse::from);
    Ok(HttpResponse::Ok().json(paginate(req, request, page)?))
}

pub async fn list_cards(
    req: HttpRequest,
    query: web::Query<PageQuery>,
    viewer: MaybeUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let filter = CardFilter {
        include_private: viewer.is_authenticated(),
        creator_id: None,
    };
    list_filtered(&req, &query, filter, &state).await
}

/// The newest visible cards, unpaginated, for the home page.
pub async fn recent_cards(viewer: MaybeUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    let filter = CardFilter {
        include_private: viewer.is_authenticated(),
        creator_id: None,
    };
    let request = PageRequest::new(1, state.config.pagination.recent_cards);
    let page = state.store.list_cards(filter, request).await?;
    let cards: Vec<CardResponse> = page.items.into_iter().map(CardResponse::from).collect();
    Ok(HttpResponse::Ok().json(cards))
}

pub async fn my_cards(
    req: HttpRequest,
    query: web::Query<PageQuery>,
    current: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let filter = CardFilter {
        include_private: true,
        creator_id: Some(current.user.id),
    };
    list_filtered(&req, &query, filter, &state).await
}

pub async fn create_card(
    input: web::Json<CardPayload>,
    current: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let changes = input.validate(false)?;
    let (Some(title), Some(squares)) = (changes.title, changes.squares) else {
        return Err(AppError::ValidationError("incomplete card".into()));
    };

    let new_card = NewCard {
        title,
        free_space: changes
            .free_space
            .unwrap_or_else(|| DEFAULT_FREE_SPACE.to_string()),
        creator_id: current.user.id,
        private: changes.private.unwrap_or(false),
        squares,
    };

    match state.store.create_card(new_card).await {
        Ok(detail) => {
            info!("User {} created card {}", current.user.id, detail.card.id);
            Ok(HttpResponse::Created().json(CardResponse::from(detail)))
        }
        Err(e) => {
            error!("Failed to create card for user {}: {}", current.user.id, e);
            Err(e)
        }
    }
}

/// Private cards are visible to any logged-in user, never to anonymous ones.
pub async fn get_card(
    path: web::Path<i64>,
    viewer: MaybeUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let detail = find_card(&state, path.into_inner()).await?;
    if detail.card.private && !viewer.is_authenticated() {
        return Err(AuthError::MissingToken.into());
    }
    Ok(HttpResponse::Ok().json(CardResponse::from(detail)))
}

async fn apply_update(
    id: i64,
    input: &CardPayload,
    partial: bool,
    current: &CurrentUser,
    state: &AppState,
) -> Result<HttpResponse> {
    let detail = find_card(state, id).await?;
    require_owner(&current.user, detail.card.creator_id)?;

    let changes = input.validate(partial)?;
    let updated = state.store.update_card(detail.card.id, changes).await?;
    info!("User {} updated card {}", current.user.id, updated.card.id);
    Ok(HttpResponse::Ok().json(CardResponse::from(updated)))
}

pub async fn replace_card(
    path: web::Path<i64>,
    input: web::Json<CardPayload>,
    current: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    apply_update(path.into_inner(), &input, false, &current, &state).await
}

pub async fn patch_card(
    path: web::Path<i64>,
    input: web::Json<CardPayload>,
    current: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    apply_update(path.into_inner(), &input, true, &current, &state).await
}

pub async fn delete_card(
    path: web::Path<i64>,
    current: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let detail = find_card(&state, path.into_inner()).await?;
    require_owner(&current.user, detail.card.creator_id)?;

    state.store.delete_card(detail.card.id).await?;
    info!("User {} deleted card {}", current.user.id, detail.card.id);
    Ok(HttpResponse::NoContent().finish())
}
