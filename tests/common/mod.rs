#![allow(dead_code)]

use std::sync::Arc;

use bingo_server::auth::RegisterInput;
use bingo_server::db::User;
use bingo_server::{AppState, MemoryStore, Settings};
use serde_json::{json, Value};

/// Builds the full application around `$state`, as `main` does.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(actix_web::middleware::NormalizePath::trim())
                .app_data(actix_web::web::Data::new($state.clone()))
                .configure(bingo_server::configure),
        )
        .await
    };
}

pub fn test_state() -> AppState {
    let settings = Settings::new_for_test().expect("Failed to load test config");
    AppState::with_store(settings, Arc::new(MemoryStore::new()))
}

/// Also hands back the concrete store for test-only helpers such as
/// `set_staff`.
pub fn test_state_and_store() -> (AppState, Arc<MemoryStore>) {
    let settings = Settings::new_for_test().expect("Failed to load test config");
    let store = Arc::new(MemoryStore::new());
    (AppState::with_store(settings, store.clone()), store)
}

pub fn test_state_with(adjust: impl FnOnce(&mut Settings)) -> AppState {
    let mut settings = Settings::new_for_test().expect("Failed to load test config");
    adjust(&mut settings);
    AppState::with_store(settings, Arc::new(MemoryStore::new()))
}

/// Registers `username` (password `rubytuesday`) and logs it in.
pub async fn user_with_token(state: &AppState, username: &str) -> (User, String) {
    let (user, _) = state
        .auth_service
        .register(&RegisterInput {
            username: Some(username.to_string()),
            email: Some(format!("{}@test.test", username)),
            password: Some("rubytuesday".to_string()),
            password_confirmation: None,
        })
        .await
        .expect("registration failed");
    let token = state
        .auth_service
        .issue_token(&user)
        .await
        .expect("token issue failed");
    (user, token)
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

pub fn squares(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| json!({ "text": format!("square {}", i) }))
        .collect()
}

pub fn card_json(title: &str, private: bool) -> Value {
    json!({
        "title": title,
        "free_space": "",
        "private": private,
        "squares": squares(24),
    })
}
