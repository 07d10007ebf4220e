use async_trait::async_trait;

use crate::db::models::{
    BingoCardSquare, CardChanges, CardDetail, CardFilter, Contact, NewCard, NewContact,
    NewUser, Page, PageRequest, ProfileChanges, ProfileSummary, User, UserChanges,
    UserProfile, UserSession,
};
use crate::Result;

/// Persistence boundary for every handler. `PgStore` backs production,
/// `MemoryStore` backs development runs and the test suite.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BingoStore: Send + Sync {
    /// Inserts the user and its profile atomically.
    async fn create_user(&self, user: NewUser) -> Result<(User, UserProfile)>;
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn list_users(&self, page: PageRequest) -> Result<Page<User>>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User>;
    /// Cascades to the profile, cards, squares and sessions.
    async fn delete_user(&self, id: i64) -> Result<()>;

    async fn get_profile(&self, id: i64) -> Result<Option<ProfileSummary>>;
    async fn get_profile_by_user(&self, user_id: i64) -> Result<Option<UserProfile>>;
    async fn list_profiles(
        &self,
        include_private: bool,
        page: PageRequest,
    ) -> Result<Page<ProfileSummary>>;
    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<UserProfile>;
    /// Case-insensitive username prefix match, newest users first.
    async fn search_profiles(
        &self,
        prefix: &str,
        include_private: bool,
        limit: u32,
    ) -> Result<Vec<ProfileSummary>>;

    async fn create_card(&self, card: NewCard) -> Result<CardDetail>;
    async fn get_card(&self, id: i64) -> Result<Option<CardDetail>>;
    async fn list_cards(&self, filter: CardFilter, page: PageRequest) -> Result<Page<CardDetail>>;
    async fn update_card(&self, id: i64, changes: CardChanges) -> Result<CardDetail>;
    async fn delete_card(&self, id: i64) -> Result<()>;
    /// Case-insensitive title prefix match, newest cards first.
    async fn search_cards(
        &self,
        prefix: &str,
        include_private: bool,
        limit: u32,
    ) -> Result<Vec<CardDetail>>;
    async fn card_ids_for_user(&self, user_id: i64, include_private: bool) -> Result<Vec<i64>>;

    async fn list_squares(
        &self,
        include_private: bool,
        page: PageRequest,
    ) -> Result<Page<BingoCardSquare>>;
    async fn get_square(&self, id: i64) -> Result<Option<BingoCardSquare>>;
    async fn update_square(&self, id: i64, text: String) -> Result<BingoCardSquare>;

    async fn create_contact(&self, contact: NewContact) -> Result<Contact>;
    async fn list_contacts(&self) -> Result<Vec<Contact>>;
    async fn get_contact(&self, id: i64) -> Result<Option<Contact>>;
    async fn latest_contact(&self) -> Result<Option<Contact>>;

    async fn create_session(&self, session: &UserSession) -> Result<UserSession>;
    async fn get_session_by_token(&self, token: &str) -> Result<Option<UserSession>>;
    async fn touch_session(&self, token: &str) -> Result<()>;
    async fn delete_session(&self, token: &str) -> Result<()>;
    /// Drops every session of `user_id` except `except_token`.
    async fn delete_user_sessions(&self, user_id: i64, except_token: Option<String>) -> Result<u64>;
    async fn cleanup_expired_sessions(&self) -> Result<u64>;
}

/// Escapes `%`, `_` and `\` so user input matches literally in `LIKE`.
pub fn like_prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::like_prefix_pattern;

    #[test]
    fn test_like_prefix_pattern() {
        assert_eq!(like_prefix_pattern("rick"), "rick%");
        assert_eq!(like_prefix_pattern(""), "%");
        assert_eq!(like_prefix_pattern("100%_done"), "100\\%\\_done%");
        assert_eq!(like_prefix_pattern("a\\b"), "a\\\\b%");
    }
}
