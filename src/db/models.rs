use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Number of squares surrounding the free space.
pub const SQUARES_PER_CARD: usize = 24;

pub const DEFAULT_FREE_SPACE: &str = "Free Space";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_staff: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn apply(&self, user: &mut User) {
        if let Some(username) = &self.username {
            user.username = username.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(hash) = &self.password_hash {
            user.password_hash = hash.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    pub created_date: DateTime<Utc>,
    pub slug: String,
    pub picture: String,
    pub website: String,
    pub private: bool,
    pub about_me: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub picture: Option<String>,
    pub website: Option<String>,
    pub private: Option<bool>,
    pub about_me: Option<String>,
}

impl ProfileChanges {
    pub fn apply(&self, profile: &mut UserProfile) {
        if let Some(picture) = &self.picture {
            profile.picture = picture.clone();
        }
        if let Some(website) = &self.website {
            profile.website = website.clone();
        }
        if let Some(private) = self.private {
            profile.private = private;
        }
        if let Some(about_me) = &self.about_me {
            profile.about_me = about_me.clone();
        }
    }
}

/// A profile joined with its owner's username, as listed and searched.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ProfileSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub profile: UserProfile,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct BingoCard {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub free_space: String,
    pub created_date: DateTime<Utc>,
    pub creator_id: i64,
    pub private: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct BingoCardSquare {
    pub id: i64,
    pub card_id: i64,
    pub position: i32,
    pub text: String,
    pub created_date: DateTime<Utc>,
}

/// A card with its creator's username and its squares in board order.
#[derive(Debug, Clone, PartialEq)]
pub struct CardDetail {
    pub card: BingoCard,
    pub creator: String,
    pub squares: Vec<BingoCardSquare>,
}

#[derive(Debug, Clone)]
pub struct NewCard {
    pub title: String,
    pub free_space: String,
    pub creator_id: i64,
    pub private: bool,
    pub squares: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CardChanges {
    pub title: Option<String>,
    pub free_space: Option<String>,
    pub private: Option<bool>,
    /// Replaces every square when present.
    pub squares: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CardFilter {
    pub include_private: bool,
    pub creator_id: Option<i64>,
}

impl CardFilter {
    pub fn matches(&self, card: &BingoCard) -> bool {
        (self.include_private || !card.private)
            && self.creator_id.map_or(true, |id| card.creator_id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Contact {
    pub id: i64,
    pub title: String,
    pub facebook: String,
    pub github: String,
    pub linkedin: String,
    pub twitter: String,
    pub email: String,
    pub contact_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewContact {
    pub title: String,
    pub facebook: String,
    pub github: String,
    pub linkedin: String,
    pub twitter: String,
    pub email: String,
    pub contact_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSession {
    pub id: Uuid,
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl UserSession {
    pub fn new(user_id: i64, token: String, expires_in_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token,
            expires_at: now + chrono::Duration::hours(expires_in_hours),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    /// Slices an already ordered, fully materialised list.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Page<T> {
        let start = (self.offset() as usize).min(items.len());
        let end = (start + self.per_page as usize).min(items.len());
        Page {
            count: items.len() as u64,
            items: items[start..end].to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub count: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: i64, creator_id: i64, private: bool) -> BingoCard {
        BingoCard {
            id,
            title: format!("card {}", id),
            slug: format!("card-{}", id),
            free_space: DEFAULT_FREE_SPACE.to_string(),
            created_date: Utc::now(),
            creator_id,
            private,
        }
    }

    #[test]
    fn test_page_request_clamps_and_slices() {
        let request = PageRequest::new(0, 0);
        assert_eq!(request, PageRequest { page: 1, per_page: 1 });

        let items: Vec<u32> = (0..10).collect();
        let page = PageRequest::new(2, 4).slice(&items);
        assert_eq!(page.count, 10);
        assert_eq!(page.items, vec![4, 5, 6, 7]);

        let last = PageRequest::new(3, 4).slice(&items);
        assert_eq!(last.items, vec![8, 9]);

        let beyond = PageRequest::new(9, 4).slice(&items);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.count, 10);
    }

    #[test]
    fn test_card_filter() {
        let public = card(1, 7, false);
        let private = card(2, 7, true);
        let other = card(3, 8, false);

        let anonymous = CardFilter::default();
        assert!(anonymous.matches(&public));
        assert!(!anonymous.matches(&private));

        let mine = CardFilter { include_private: true, creator_id: Some(7) };
        assert!(mine.matches(&public));
        assert!(mine.matches(&private));
        assert!(!mine.matches(&other));
    }

    #[test]
    fn test_session_expiry() {
        let session = UserSession::new(1, "token".into(), 1);
        assert!(!session.is_expired());

        let expired = UserSession::new(1, "token".into(), -1);
        assert!(expired.is_expired());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: 1,
            username: "RickSanchez".into(),
            email: "rick@example.com".into(),
            password_hash: "sha256$1$salt$hash".into(),
            is_staff: false,
            date_joined: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "RickSanchez");
    }

    #[test]
    fn test_changes_apply_only_present_fields() {
        let mut user = User {
            id: 1,
            username: "before".into(),
            email: "before@example.com".into(),
            password_hash: "hash".into(),
            is_staff: false,
            date_joined: Utc::now(),
        };
        UserChanges { username: Some("after".into()), ..Default::default() }.apply(&mut user);
        assert_eq!(user.username, "after");
        assert_eq!(user.email, "before@example.com");
        assert_eq!(user.password_hash, "hash");
    }
}
