//! Live-search endpoints answering `?suggestion=<prefix>` with an HTML
//! fragment the front-end drops straight into the page.

pub mod render;

use actix_web::{http::header::ContentType, web, HttpResponse};
use serde::Deserialize;
use tracing::debug;

use crate::auth::extractor::MaybeUser;
use crate::{AppState, Result};

#[derive(Debug, Default, Deserialize)]
pub struct SuggestQuery {
    /// Absent means an empty prefix, which matches everything.
    pub suggestion: Option<String>,
}

impl SuggestQuery {
    fn prefix(&self) -> &str {
        self.suggestion.as_deref().unwrap_or_default()
    }
}

fn fragment(body: String) -> HttpResponse {
    HttpResponse::Ok().content_type(ContentType::html()).body(body)
}

pub async fn suggest_cards(
    query: web::Query<SuggestQuery>,
    viewer: MaybeUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let cards = state
        .store
        .search_cards(
            query.prefix(),
            viewer.is_authenticated(),
            state.config.search.max_results,
        )
        .await?;
    debug!("Card suggestions for {:?}: {}", query.prefix(), cards.len());
    Ok(fragment(render::card_results(&cards)))
}

pub async fn suggest_profiles(
    query: web::Query<SuggestQuery>,
    viewer: MaybeUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let profiles = state
        .store
        .search_profiles(
            query.prefix(),
            viewer.is_authenticated(),
            state.config.search.max_results,
        )
        .await?;
    debug!("Profile suggestions for {:?}: {}", query.prefix(), profiles.len());
    Ok(fragment(render::profile_results(&profiles)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/cards/suggest").route(web::get().to(suggest_cards)))
        .service(web::resource("/profile/suggest").route(web::get().to(suggest_profiles)));
}
