//! `PgStore` against a live database. Skipped unless `DATABASE_URL` is set,
//! e.g. `DATABASE_URL=postgres://bingo@localhost/bingo_test`.

use bingo_server::db::models::{
    CardChanges, CardFilter, NewCard, NewContact, NewUser, PageRequest, ProfileChanges, User,
    UserChanges, UserSession, DEFAULT_FREE_SPACE, SQUARES_PER_CARD,
};
use bingo_server::db::{BingoStore, PgStore};
use bingo_server::error::DatabaseError;
use bingo_server::{AppError, Settings};
use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

async fn setup_store() -> Option<PgStore> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres store test");
        return None;
    };

    let mut config = Settings::new_for_test().unwrap().database;
    config.url = url;
    config.max_connections = 5;
    let store = PgStore::connect(&config).await.unwrap();
    store.migrate().await.unwrap();
    Some(store)
}

/// Lowercase hex, unique per call.
fn tag() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

async fn create_user(store: &PgStore, username: &str) -> User {
    let (user, _) = store
        .create_user(NewUser {
            username: username.to_string(),
            email: format!("{}@test.test", username),
            password_hash: "sha256$1$salt$hash".to_string(),
            is_staff: false,
        })
        .await
        .unwrap();
    user
}

fn new_card(creator_id: i64, title: &str, private: bool) -> NewCard {
    NewCard {
        title: title.to_string(),
        free_space: DEFAULT_FREE_SPACE.to_string(),
        creator_id,
        private,
        squares: (0..SQUARES_PER_CARD).map(|i| format!("square {}", i)).collect(),
    }
}

#[tokio::test]
async fn test_create_user_with_profile() {
    let Some(store) = setup_store().await else { return };
    let username = format!("Pg-{}", tag());

    let (user, profile) = store
        .create_user(NewUser {
            username: username.clone(),
            email: "pg@test.test".to_string(),
            password_hash: "sha256$1$salt$hash".to_string(),
            is_staff: false,
        })
        .await
        .unwrap();
    assert_eq!(profile.user_id, user.id);
    assert_eq!(profile.slug, username.to_lowercase());
    assert!(!profile.private);

    let found = store.get_user_by_username(&username).await.unwrap().unwrap();
    assert_eq!(found.id, user.id);
    assert_eq!(
        store.get_profile_by_user(user.id).await.unwrap().unwrap().id,
        profile.id
    );

    let duplicate = store
        .create_user(NewUser {
            username: username.clone(),
            email: String::new(),
            password_hash: "sha256$1$salt$hash".to_string(),
            is_staff: false,
        })
        .await;
    assert!(matches!(
        duplicate,
        Err(AppError::DatabaseError(DatabaseError::Duplicate(_)))
    ));

    // Omitted fields stay as they were
    let updated = store
        .update_user(
            user.id,
            UserChanges {
                email: Some("changed@test.test".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.email, "changed@test.test");
    assert_eq!(updated.username, username);
    assert_eq!(updated.password_hash, user.password_hash);

    let profile = store
        .update_profile(
            profile.id,
            ProfileChanges {
                private: Some(true),
                about_me: Some("Quiet.".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(profile.private);
    assert_eq!(profile.about_me, "Quiet.");
    assert_eq!(profile.website, "");

    let summary = store.get_profile(profile.id).await.unwrap().unwrap();
    assert_eq!(summary.username, username);
}

#[tokio::test]
async fn test_update_card_replaces_squares() {
    let Some(store) = setup_store().await else { return };
    let user = create_user(&store, &format!("pgcards{}", tag())).await;

    let card = store.create_card(new_card(user.id, "Before Title", false)).await.unwrap();
    assert_eq!(card.card.slug, "before-title");
    assert_eq!(card.creator, user.username);
    assert_eq!(card.squares.len(), SQUARES_PER_CARD);
    assert_eq!(card.squares[23].position, 23);

    let replacement: Vec<String> = (0..SQUARES_PER_CARD).map(|i| format!("new {}", i)).collect();
    let updated = store
        .update_card(
            card.card.id,
            CardChanges {
                title: Some("After Title".to_string()),
                squares: Some(replacement),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.card.slug, "after-title");
    assert_eq!(updated.card.free_space, DEFAULT_FREE_SPACE);
    assert_eq!(updated.squares.len(), SQUARES_PER_CARD);
    for (i, square) in updated.squares.iter().enumerate() {
        assert_eq!(square.position, i as i32);
        assert_eq!(square.text, format!("new {}", i));
    }

    let patched = store
        .update_card(
            card.card.id,
            CardChanges {
                private: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(patched.card.private);
    assert_eq!(patched.card.title, "After Title");
    assert_eq!(patched.squares, updated.squares);

    let square = store
        .update_square(patched.squares[4].id, "edited".to_string())
        .await
        .unwrap();
    assert_eq!(square.text, "edited");
    assert_eq!(square.position, 4);

    let missing = store.update_card(-1, CardChanges::default()).await;
    assert!(matches!(
        missing,
        Err(AppError::DatabaseError(DatabaseError::NotFound))
    ));
}

#[tokio::test]
async fn test_card_listing_respects_privacy() {
    let Some(store) = setup_store().await else { return };
    let user = create_user(&store, &format!("pglist{}", tag())).await;

    let public = store.create_card(new_card(user.id, "Public one", false)).await.unwrap();
    let private = store.create_card(new_card(user.id, "Private one", true)).await.unwrap();

    let mine = CardFilter {
        include_private: true,
        creator_id: Some(user.id),
    };
    let page = store.list_cards(mine, PageRequest::new(1, 10)).await.unwrap();
    assert_eq!(page.count, 2);
    // Newest first
    assert_eq!(page.items[0].card.id, private.card.id);

    let visible = CardFilter {
        include_private: false,
        creator_id: Some(user.id),
    };
    let page = store.list_cards(visible, PageRequest::new(1, 10)).await.unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.items[0].card.id, public.card.id);

    assert_eq!(
        store.card_ids_for_user(user.id, false).await.unwrap(),
        vec![public.card.id]
    );
    assert_eq!(store.card_ids_for_user(user.id, true).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_prefix_search_escapes_wildcards() {
    let Some(store) = setup_store().await else { return };
    let tag = tag();
    let user = create_user(&store, &format!("{}_a", tag)).await;
    create_user(&store, &format!("{}xa", tag)).await;

    let upper = tag.to_uppercase();
    store
        .create_card(new_card(user.id, &format!("{}%done", upper), false))
        .await
        .unwrap();
    store
        .create_card(new_card(user.id, &format!("{}xdone", upper), false))
        .await
        .unwrap();
    store
        .create_card(new_card(user.id, &format!("{}%secret", upper), true))
        .await
        .unwrap();

    let cards = store.search_cards(&format!("{}%", tag), false, 25).await.unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].card.title, format!("{}%done", upper));

    let cards = store.search_cards(&format!("{}%", tag), true, 25).await.unwrap();
    assert_eq!(cards.len(), 2);

    assert!(store
        .search_cards(&format!("{}_", tag), true, 25)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(store.search_cards(&tag, true, 2).await.unwrap().len(), 2);

    let profiles = store.search_profiles(&format!("{}_", tag), false, 25).await.unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].username, user.username);
    assert_eq!(store.search_profiles(&tag, false, 25).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_user_cascades() {
    let Some(store) = setup_store().await else { return };
    let user = create_user(&store, &format!("pgdoomed{}", tag())).await;
    let card = store.create_card(new_card(user.id, "Doomed", false)).await.unwrap();
    let square_id = card.squares[0].id;
    let token = format!("token-{}", tag());
    store
        .create_session(&UserSession::new(user.id, token.clone(), 1))
        .await
        .unwrap();

    store.delete_user(user.id).await.unwrap();

    assert!(store.get_user(user.id).await.unwrap().is_none());
    assert!(store.get_profile_by_user(user.id).await.unwrap().is_none());
    assert!(store.get_card(card.card.id).await.unwrap().is_none());
    assert!(store.get_square(square_id).await.unwrap().is_none());
    assert!(store.get_session_by_token(&token).await.unwrap().is_none());

    let again = store.delete_user(user.id).await;
    assert!(matches!(
        again,
        Err(AppError::DatabaseError(DatabaseError::NotFound))
    ));
}

#[tokio::test]
async fn test_session_lifecycle() {
    let Some(store) = setup_store().await else { return };
    let user = create_user(&store, &format!("pgsession{}", tag())).await;

    let stale = format!("stale-{}", tag());
    let fresh = format!("fresh-{}", tag());
    let other = format!("other-{}", tag());
    let mut expired = UserSession::new(user.id, stale.clone(), 1);
    expired.expires_at = Utc::now() - Duration::minutes(5);
    store.create_session(&expired).await.unwrap();
    store
        .create_session(&UserSession::new(user.id, fresh.clone(), 1))
        .await
        .unwrap();
    store
        .create_session(&UserSession::new(user.id, other.clone(), 1))
        .await
        .unwrap();

    assert!(store.cleanup_expired_sessions().await.unwrap() >= 1);
    assert!(store.get_session_by_token(&stale).await.unwrap().is_none());

    let before = store.get_session_by_token(&fresh).await.unwrap().unwrap();
    store.touch_session(&fresh).await.unwrap();
    let after = store.get_session_by_token(&fresh).await.unwrap().unwrap();
    assert!(after.last_activity >= before.last_activity);

    assert_eq!(
        store.delete_user_sessions(user.id, Some(fresh.clone())).await.unwrap(),
        1
    );
    assert!(store.get_session_by_token(&other).await.unwrap().is_none());

    store.delete_session(&fresh).await.unwrap();
    assert!(store.get_session_by_token(&fresh).await.unwrap().is_none());
}

#[tokio::test]
async fn test_contacts() {
    let Some(store) = setup_store().await else { return };
    let title = format!("pg{}", tag());

    let contact = store
        .create_contact(NewContact {
            title: title.clone(),
            facebook: String::new(),
            github: "https://github.com/bingo".to_string(),
            linkedin: String::new(),
            twitter: String::new(),
            email: "owner@test.test".to_string(),
            contact_date: NaiveDate::from_ymd_opt(2017, 8, 1).unwrap(),
        })
        .await
        .unwrap();

    let found = store.get_contact(contact.id).await.unwrap().unwrap();
    assert_eq!(found, contact);
    assert!(store.latest_contact().await.unwrap().is_some());
    assert!(store
        .list_contacts()
        .await
        .unwrap()
        .iter()
        .any(|c| c.title == title));
}
