#[macro_use]
mod common;

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::test;

use common::{bearer, card_json, test_state, user_with_token};

async fn body_text<B: MessageBody>(resp: ServiceResponse<B>) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

#[actix_web::test]
async fn test_card_suggestions() {
    let state = test_state();
    let app = test_app!(state);
    let (_, token) = user_with_token(&state, "searcher").await;

    for (title, private) in [
        ("Road Trip", false),
        ("road works", false),
        ("Road <b>rage</b>", false),
        ("Roadside secrets", true),
        ("Office party", false),
    ] {
        test::TestRequest::post()
            .uri("/api/cards")
            .insert_header(bearer(&token))
            .set_json(card_json(title, private))
            .send_request(&app)
            .await;
    }

    let resp = test::TestRequest::get()
        .uri("/cards/suggest/?suggestion=ROAD")
        .send_request(&app)
        .await;
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/html; charset=utf-8"
    );
    let html = body_text(resp).await;
    assert!(html.contains("Road Trip"));
    assert!(html.contains("road works"));
    assert!(html.contains("Road &lt;b&gt;rage&lt;/b&gt;"));
    assert!(!html.contains("<b>rage"));
    assert!(!html.contains("Roadside secrets"));
    assert!(!html.contains("Office party"));

    let resp = test::TestRequest::get()
        .uri("/cards/suggest/?suggestion=road")
        .insert_header(bearer(&token))
        .send_request(&app)
        .await;
    let html = body_text(resp).await;
    assert!(html.contains("Roadside secrets"));
    assert_eq!(html.matches("<li>").count(), 4);
}

#[actix_web::test]
async fn test_missing_suggestion_matches_everything() {
    let state = test_state();
    let app = test_app!(state);
    let (_, token) = user_with_token(&state, "lister").await;
    for title in ["Alpha", "Beta"] {
        test::TestRequest::post()
            .uri("/api/cards")
            .insert_header(bearer(&token))
            .set_json(card_json(title, false))
            .send_request(&app)
            .await;
    }

    let resp = test::TestRequest::get().uri("/cards/suggest/").send_request(&app).await;
    let html = body_text(resp).await;
    assert_eq!(html.matches("<li>").count(), 2);
    // Newest first
    assert!(html.find("Beta").unwrap() < html.find("Alpha").unwrap());
}

#[actix_web::test]
async fn test_no_matches_and_wildcards() {
    let state = test_state();
    let app = test_app!(state);
    let (_, token) = user_with_token(&state, "percent").await;
    test::TestRequest::post()
        .uri("/api/cards")
        .insert_header(bearer(&token))
        .set_json(card_json("100 things", false))
        .send_request(&app)
        .await;

    let resp = test::TestRequest::get()
        .uri("/cards/suggest/?suggestion=%25")
        .send_request(&app)
        .await;
    let html = body_text(resp).await;
    assert!(html.contains("No cards found."));
}

#[actix_web::test]
async fn test_profile_suggestions_hide_private() {
    let state = test_state();
    let app = test_app!(state);
    let (_, token) = user_with_token(&state, "jerry").await;
    let (smith, smith_token) = user_with_token(&state, "JerrySmith").await;
    user_with_token(&state, "Summer").await;

    let profile = state
        .store
        .get_profile_by_user(smith.id)
        .await
        .unwrap()
        .unwrap();
    let resp = test::TestRequest::patch()
        .uri(&format!("/api/profiles/{}", profile.id))
        .insert_header(bearer(&smith_token))
        .set_json(serde_json::json!({ "private": true }))
        .send_request(&app)
        .await;
    assert!(resp.status().is_success());

    let resp = test::TestRequest::get()
        .uri("/profile/suggest/?suggestion=jer")
        .send_request(&app)
        .await;
    let html = body_text(resp).await;
    assert_eq!(html.matches("<li>").count(), 1);
    assert!(html.contains(">jerry</a>"));

    let resp = test::TestRequest::get()
        .uri("/profile/suggest/?suggestion=jer")
        .insert_header(bearer(&token))
        .send_request(&app)
        .await;
    let html = body_text(resp).await;
    assert_eq!(html.matches("<li>").count(), 2);
    // Newest users first
    assert!(html.find(">JerrySmith<").unwrap() < html.find(">jerry<").unwrap());

    let resp = test::TestRequest::get()
        .uri("/profile/suggest/?suggestion=zzz")
        .send_request(&app)
        .await;
    assert!(body_text(resp).await.contains("No profiles found."));
}
