use actix_web::{web, HttpRequest, HttpResponse};

use crate::api::pagination::{paginate, PageQuery};
use crate::error::AppError;
use crate::{AppState, Result};

pub async fn list_contacts(
    req: HttpRequest,
    query: web::Query<PageQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let request = query.request(state.config.pagination.page_size)?;
    let contacts = state.store.list_contacts().await?;
    Ok(HttpResponse::Ok().json(paginate(&req, request, request.slice(&contacts))?))
}

/// The contact record with the most recent date.
pub async fn latest_contact(state: web::Data<AppState>) -> Result<HttpResponse> {
    let contact = state.store.latest_contact().await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(contact))
}

pub async fn get_contact(path: web::Path<i64>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let contact = state
        .store
        .get_contact(path.into_inner())
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(contact))
}
