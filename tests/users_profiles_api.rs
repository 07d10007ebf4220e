#[macro_use]
mod common;

use actix_web::test;
use serde_json::{json, Value};

use common::{bearer, card_json, test_state, test_state_and_store, user_with_token};

#[actix_web::test]
async fn test_user_email_visibility() {
    let state = test_state();
    let app = test_app!(state);
    let (user, token) = user_with_token(&state, "privacy").await;
    let (_, other) = user_with_token(&state, "nosy").await;
    let uri = format!("/api/users/{}", user.id);

    let anonymous: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(anonymous["username"], "privacy");
    assert!(anonymous.get("email").is_none());
    assert_eq!(anonymous["url"], uri);

    let stranger: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&uri)
            .insert_header(bearer(&other))
            .to_request(),
    )
    .await;
    assert!(stranger.get("email").is_none());

    let own: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&uri)
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(own["email"], "privacy@test.test");
}

#[actix_web::test]
async fn test_user_card_ids_respect_privacy() {
    let state = test_state();
    let app = test_app!(state);
    let (user, token) = user_with_token(&state, "cardholder").await;

    for (title, private) in [("Open", false), ("Closed", true)] {
        test::TestRequest::post()
            .uri("/api/cards")
            .insert_header(bearer(&token))
            .set_json(card_json(title, private))
            .send_request(&app)
            .await;
    }
    let uri = format!("/api/users/{}", user.id);

    let anonymous: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(anonymous["bingo_cards"].as_array().unwrap().len(), 1);

    let own: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&uri)
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(own["bingo_cards"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn test_create_and_list_users() {
    let state = test_state();
    let app = test_app!(state);

    let response = test::TestRequest::post()
        .uri("/api/users")
        .set_json(json!({
            "username": "apiuser",
            "email": "api@test.test",
            "password": "rubytuesday"
        }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 201);

    let response = test::TestRequest::post()
        .uri("/api/users")
        .set_json(json!({ "username": "bad name!", "password": "rubytuesday" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 400);

    let list: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/users").to_request(),
    )
    .await;
    assert_eq!(list["count"], 1);
    assert_eq!(list["results"][0]["username"], "apiuser");
}

#[actix_web::test]
async fn test_user_update_and_delete_permissions() {
    let state = test_state();
    let app = test_app!(state);
    let (user, token) = user_with_token(&state, "selfish").await;
    let (_, other) = user_with_token(&state, "outsider").await;
    let uri = format!("/api/users/{}", user.id);

    let response = test::TestRequest::patch()
        .uri(&uri)
        .insert_header(bearer(&other))
        .set_json(json!({ "email": "hijack@test.test" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 403);

    let response = test::TestRequest::patch()
        .uri(&uri)
        .insert_header(bearer(&token))
        .set_json(json!({ "email": "new@test.test" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["email"], "new@test.test");
    assert_eq!(body["username"], "selfish");

    let response = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&other))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 403);

    let response = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&token))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 204);

    let response = test::TestRequest::get().uri(&uri).send_request(&app).await;
    assert_eq!(response.status(), 404);
}

#[actix_web::test]
async fn test_staff_may_edit_other_accounts() {
    let (state, store) = test_state_and_store();
    let app = test_app!(state);
    let (user, _) = user_with_token(&state, "regular").await;
    let (staff, staff_token) = user_with_token(&state, "moderator").await;
    store.set_staff(staff.id, true).await;

    let response = test::TestRequest::patch()
        .uri(&format!("/api/users/{}", user.id))
        .insert_header(bearer(&staff_token))
        .set_json(json!({ "username": "renamed-by-staff" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["username"], "renamed-by-staff");
    assert_eq!(body["email"], "regular@test.test");
}

#[actix_web::test]
async fn test_profile_detail_privacy() {
    let state = test_state();
    let app = test_app!(state);
    let (user, token) = user_with_token(&state, "hermit").await;
    let (_, other) = user_with_token(&state, "visitor").await;
    let profile = state
        .store
        .get_profile_by_user(user.id)
        .await
        .unwrap()
        .unwrap();
    let uri = format!("/api/profiles/{}", profile.id);

    // Login required even for public profiles
    let response = test::TestRequest::get().uri(&uri).send_request(&app).await;
    assert_eq!(response.status(), 401);

    let response = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&other))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);

    let response = test::TestRequest::patch()
        .uri(&uri)
        .insert_header(bearer(&token))
        .set_json(json!({
            "private": true,
            "website": "https://hermit.example.com",
            "about_me": "Leave me be."
        }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    let updated: Value = test::read_body_json(response).await;
    assert_eq!(updated["private"], true);
    assert_eq!(updated["slug"], "hermit");
    assert_eq!(updated["username"], "hermit");

    let response = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&other))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 403);

    let response = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&token))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);

    let anonymous_list: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/profiles").to_request(),
    )
    .await;
    assert_eq!(anonymous_list["count"], 1);
    assert_eq!(anonymous_list["results"][0]["username"], "visitor");
}

#[actix_web::test]
async fn test_profile_update_permissions_and_validation() {
    let state = test_state();
    let app = test_app!(state);
    let (user, token) = user_with_token(&state, "owner").await;
    let (_, other) = user_with_token(&state, "intruder").await;
    let profile = state
        .store
        .get_profile_by_user(user.id)
        .await
        .unwrap()
        .unwrap();
    let uri = format!("/api/profiles/{}", profile.id);

    let response = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&other))
        .set_json(json!({ "about_me": "defaced" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 403);

    let response = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&token))
        .set_json(json!({ "website": "ftp://files.example.com" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["error"]["fields"]["website"][0], "Enter a valid URL.");
}

#[actix_web::test]
async fn test_contact_endpoints() {
    use bingo_server::db::models::NewContact;
    use chrono::NaiveDate;

    let state = test_state();
    let app = test_app!(state);

    let response = test::TestRequest::get().uri("/api/contact/latest").send_request(&app).await;
    assert_eq!(response.status(), 404);

    for (title, day) in [("Old", 1), ("New", 20)] {
        state
            .store
            .create_contact(NewContact {
                title: title.to_string(),
                facebook: String::new(),
                github: "https://github.com/bingo".to_string(),
                linkedin: String::new(),
                twitter: String::new(),
                email: "owner@test.test".to_string(),
                contact_date: NaiveDate::from_ymd_opt(2017, 8, day).unwrap(),
            })
            .await
            .unwrap();
    }

    let latest: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/contact/latest").to_request(),
    )
    .await;
    assert_eq!(latest["title"], "New");

    let list: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/contact").to_request(),
    )
    .await;
    assert_eq!(list["count"], 2);

    let id = latest["id"].as_i64().unwrap();
    let one: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/contact/{}", id))
            .to_request(),
    )
    .await;
    assert_eq!(one["contact_date"], "2017-08-20");
}
