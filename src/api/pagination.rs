use actix_web::HttpRequest;
use serde::{Deserialize, Serialize};

use crate::db::{Page, PageRequest};
use crate::error::AppError;
use crate::Result;

/// `?page=N`, one-based. Kept as a string so a malformed value maps to
/// "Invalid page." instead of a query deserialisation error.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn request(&self, per_page: u32) -> Result<PageRequest> {
        match self.page.as_deref() {
            None => Ok(PageRequest::new(1, per_page)),
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n >= 1 => Ok(PageRequest::new(n, per_page)),
                _ => Err(AppError::InvalidPage),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Wraps one page in the list envelope. The first page always exists, even
/// when empty; any page past the last is rejected.
pub fn paginate<T>(req: &HttpRequest, request: PageRequest, page: Page<T>) -> Result<Paginated<T>> {
    let per_page = request.per_page as u64;
    let last = ((page.count + per_page - 1) / per_page).max(1);
    let current = request.page as u64;
    if current > last {
        return Err(AppError::InvalidPage);
    }

    let link = |n: u64| format!("{}?page={}", req.path(), n);
    Ok(Paginated {
        count: page.count,
        next: (current < last).then(|| link(current + 1)),
        previous: (current > 1).then(|| link(current - 1)),
        results: page.items,
    })
}
