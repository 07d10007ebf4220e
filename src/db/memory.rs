use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::db::models::{
    BingoCard, BingoCardSquare, CardChanges, CardDetail, CardFilter, Contact, NewCard,
    NewContact, NewUser, Page, PageRequest, ProfileChanges, ProfileSummary, User,
    UserChanges, UserProfile, UserSession,
};
use crate::db::slug::slugify;
use crate::db::store::BingoStore;
use crate::error::{AppError, DatabaseError};
use crate::Result;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    profiles: BTreeMap<i64, UserProfile>,
    cards: BTreeMap<i64, BingoCard>,
    squares: BTreeMap<i64, BingoCardSquare>,
    contacts: BTreeMap<i64, Contact>,
    sessions: HashMap<String, UserSession>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn summary(&self, profile: &UserProfile) -> Option<ProfileSummary> {
        self.users.get(&profile.user_id).map(|user| ProfileSummary {
            profile: profile.clone(),
            username: user.username.clone(),
        })
    }

    fn detail(&self, card: &BingoCard) -> CardDetail {
        let mut squares: Vec<BingoCardSquare> = self
            .squares
            .values()
            .filter(|s| s.card_id == card.id)
            .cloned()
            .collect();
        squares.sort_by_key(|s| s.position);
        CardDetail {
            card: card.clone(),
            creator: self
                .users
                .get(&card.creator_id)
                .map(|u| u.username.clone())
                .unwrap_or_default(),
            squares,
        }
    }

    fn insert_squares(&mut self, card_id: i64, texts: &[String]) {
        let now = Utc::now();
        for (position, text) in texts.iter().enumerate() {
            let id = self.next_id();
            self.squares.insert(
                id,
                BingoCardSquare {
                    id,
                    card_id,
                    position: position as i32,
                    text: text.clone(),
                    created_date: now,
                },
            );
        }
    }

    /// Cards newest first, ties broken by id.
    fn ordered_cards(&self, filter: impl Fn(&BingoCard) -> bool) -> Vec<&BingoCard> {
        let mut cards: Vec<&BingoCard> = self.cards.values().filter(|c| filter(c)).collect();
        cards.sort_by(|a, b| b.created_date.cmp(&a.created_date).then(b.id.cmp(&a.id)));
        cards
    }

    fn remove_card(&mut self, id: i64) {
        self.cards.remove(&id);
        self.squares.retain(|_, s| s.card_id != id);
    }
}

fn duplicate_username() -> AppError {
    AppError::DatabaseError(DatabaseError::Duplicate("users_username_key".to_string()))
}

/// In-process store holding every table behind one lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrites a card's creation time; lets tests build a stable ordering.
    pub async fn backdate_card(&self, id: i64, created_date: chrono::DateTime<Utc>) {
        if let Some(card) = self.tables.write().await.cards.get_mut(&id) {
            card.created_date = created_date;
        }
    }

    /// Grants staff rights; staff are otherwise only created by seeding.
    pub async fn set_staff(&self, user_id: i64, is_staff: bool) {
        if let Some(user) = self.tables.write().await.users.get_mut(&user_id) {
            user.is_staff = is_staff;
        }
    }
}

#[async_trait]
impl BingoStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<(User, UserProfile)> {
        let mut tables = self.tables.write().await;
        if tables.username_taken(&new.username, None) {
            return Err(duplicate_username());
        }

        let now = Utc::now();
        let user = User {
            id: tables.next_id(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            is_staff: new.is_staff,
            date_joined: now,
        };
        let profile = UserProfile {
            id: tables.next_id(),
            user_id: user.id,
            created_date: now,
            slug: slugify(&user.username),
            picture: String::new(),
            website: String::new(),
            private: false,
            about_me: String::new(),
        };
        tables.users.insert(user.id, user.clone());
        tables.profiles.insert(profile.id, profile.clone());
        Ok((user, profile))
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self, page: PageRequest) -> Result<Page<User>> {
        let tables = self.tables.read().await;
        let users: Vec<User> = tables.users.values().cloned().collect();
        Ok(page.slice(&users))
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User> {
        let mut tables = self.tables.write().await;
        if let Some(username) = &changes.username {
            if tables.username_taken(username, Some(id)) {
                return Err(duplicate_username());
            }
        }
        let user = tables.users.get_mut(&id).ok_or(DatabaseError::NotFound)?;
        changes.apply(user);
        let user = user.clone();

        if changes.username.is_some() {
            let slug = slugify(&user.username);
            if let Some(profile) = tables.profiles.values_mut().find(|p| p.user_id == id) {
                profile.slug = slug;
            }
        }
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Err(DatabaseError::NotFound.into());
        }
        tables.profiles.retain(|_, p| p.user_id != id);
        tables.sessions.retain(|_, s| s.user_id != id);
        let owned: Vec<i64> = tables
            .cards
            .values()
            .filter(|c| c.creator_id == id)
            .map(|c| c.id)
            .collect();
        for card_id in owned {
            tables.remove_card(card_id);
        }
        Ok(())
    }

    async fn get_profile(&self, id: i64) -> Result<Option<ProfileSummary>> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.get(&id).and_then(|p| tables.summary(p)))
    }

    async fn get_profile_by_user(&self, user_id: i64) -> Result<Option<UserProfile>> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.values().find(|p| p.user_id == user_id).cloned())
    }

    async fn list_profiles(
        &self,
        include_private: bool,
        page: PageRequest,
    ) -> Result<Page<ProfileSummary>> {
        let tables = self.tables.read().await;
        let mut profiles: Vec<ProfileSummary> = tables
            .profiles
            .values()
            .filter(|p| include_private || !p.private)
            .filter_map(|p| tables.summary(p))
            .collect();
        profiles.sort_by(|a, b| {
            a.profile
                .created_date
                .cmp(&b.profile.created_date)
                .then(a.profile.id.cmp(&b.profile.id))
        });
        Ok(page.slice(&profiles))
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<UserProfile> {
        let mut tables = self.tables.write().await;
        let profile = tables.profiles.get_mut(&id).ok_or(DatabaseError::NotFound)?;
        changes.apply(profile);
        Ok(profile.clone())
    }

    async fn search_profiles(
        &self,
        prefix: &str,
        include_private: bool,
        limit: u32,
    ) -> Result<Vec<ProfileSummary>> {
        let tables = self.tables.read().await;
        let prefix = prefix.to_lowercase();
        let mut users: Vec<&User> = tables
            .users
            .values()
            .filter(|u| u.username.to_lowercase().starts_with(&prefix))
            .collect();
        users.sort_by(|a, b| b.date_joined.cmp(&a.date_joined).then(b.id.cmp(&a.id)));

        Ok(users
            .into_iter()
            .filter_map(|u| tables.profiles.values().find(|p| p.user_id == u.id))
            .filter(|p| include_private || !p.private)
            .filter_map(|p| tables.summary(p))
            .take(limit as usize)
            .collect())
    }

    async fn create_card(&self, new: NewCard) -> Result<CardDetail> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&new.creator_id) {
            return Err(DatabaseError::NotFound.into());
        }
        let card = BingoCard {
            id: tables.next_id(),
            slug: slugify(&new.title),
            title: new.title,
            free_space: new.free_space,
            created_date: Utc::now(),
            creator_id: new.creator_id,
            private: new.private,
        };
        tables.cards.insert(card.id, card.clone());
        tables.insert_squares(card.id, &new.squares);
        Ok(tables.detail(&card))
    }

    async fn get_card(&self, id: i64) -> Result<Option<CardDetail>> {
        let tables = self.tables.read().await;
        Ok(tables.cards.get(&id).map(|c| tables.detail(c)))
    }

    async fn list_cards(&self, filter: CardFilter, page: PageRequest) -> Result<Page<CardDetail>> {
        let tables = self.tables.read().await;
        let cards: Vec<BingoCard> = tables
            .ordered_cards(|c| filter.matches(c))
            .into_iter()
            .cloned()
            .collect();
        Ok(page.slice(&cards).map(|c| tables.detail(&c)))
    }

    async fn update_card(&self, id: i64, changes: CardChanges) -> Result<CardDetail> {
        let mut tables = self.tables.write().await;
        let card = tables.cards.get_mut(&id).ok_or(DatabaseError::NotFound)?;
        if let Some(title) = changes.title {
            card.slug = slugify(&title);
            card.title = title;
        }
        if let Some(free_space) = changes.free_space {
            card.free_space = free_space;
        }
        if let Some(private) = changes.private {
            card.private = private;
        }
        let card = card.clone();

        if let Some(squares) = changes.squares {
            tables.squares.retain(|_, s| s.card_id != id);
            tables.insert_squares(id, &squares);
        }
        Ok(tables.detail(&card))
    }

    async fn delete_card(&self, id: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.cards.contains_key(&id) {
            return Err(DatabaseError::NotFound.into());
        }
        tables.remove_card(id);
        Ok(())
    }

    async fn search_cards(
        &self,
        prefix: &str,
        include_private: bool,
        limit: u32,
    ) -> Result<Vec<CardDetail>> {
        let tables = self.tables.read().await;
        let prefix = prefix.to_lowercase();
        Ok(tables
            .ordered_cards(|c| {
                (include_private || !c.private) && c.title.to_lowercase().starts_with(&prefix)
            })
            .into_iter()
            .take(limit as usize)
            .map(|c| tables.detail(c))
            .collect())
    }

    async fn card_ids_for_user(&self, user_id: i64, include_private: bool) -> Result<Vec<i64>> {
        let tables = self.tables.read().await;
        let filter = CardFilter { include_private, creator_id: Some(user_id) };
        Ok(tables
            .ordered_cards(|c| filter.matches(c))
            .into_iter()
            .map(|c| c.id)
            .collect())
    }

    async fn list_squares(
        &self,
        include_private: bool,
        page: PageRequest,
    ) -> Result<Page<BingoCardSquare>> {
        let tables = self.tables.read().await;
        let mut squares: Vec<BingoCardSquare> = tables
            .squares
            .values()
            .filter(|s| {
                include_private
                    || tables.cards.get(&s.card_id).map_or(false, |c| !c.private)
            })
            .cloned()
            .collect();
        squares.sort_by_key(|s| (s.card_id, s.position));
        Ok(page.slice(&squares))
    }

    async fn get_square(&self, id: i64) -> Result<Option<BingoCardSquare>> {
        Ok(self.tables.read().await.squares.get(&id).cloned())
    }

    async fn update_square(&self, id: i64, text: String) -> Result<BingoCardSquare> {
        let mut tables = self.tables.write().await;
        let square = tables.squares.get_mut(&id).ok_or(DatabaseError::NotFound)?;
        square.text = text;
        Ok(square.clone())
    }

    async fn create_contact(&self, new: NewContact) -> Result<Contact> {
        let mut tables = self.tables.write().await;
        let contact = Contact {
            id: tables.next_id(),
            title: new.title,
            facebook: new.facebook,
            github: new.github,
            linkedin: new.linkedin,
            twitter: new.twitter,
            email: new.email,
            contact_date: new.contact_date,
        };
        tables.contacts.insert(contact.id, contact.clone());
        Ok(contact)
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>> {
        Ok(self.tables.read().await.contacts.values().cloned().collect())
    }

    async fn get_contact(&self, id: i64) -> Result<Option<Contact>> {
        Ok(self.tables.read().await.contacts.get(&id).cloned())
    }

    async fn latest_contact(&self) -> Result<Option<Contact>> {
        let tables = self.tables.read().await;
        Ok(tables
            .contacts
            .values()
            .max_by(|a, b| a.contact_date.cmp(&b.contact_date).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn create_session(&self, session: &UserSession) -> Result<UserSession> {
        let mut tables = self.tables.write().await;
        tables.sessions.insert(session.token.clone(), session.clone());
        Ok(session.clone())
    }

    async fn get_session_by_token(&self, token: &str) -> Result<Option<UserSession>> {
        Ok(self.tables.read().await.sessions.get(token).cloned())
    }

    async fn touch_session(&self, token: &str) -> Result<()> {
        if let Some(session) = self.tables.write().await.sessions.get_mut(token) {
            session.last_activity = Utc::now();
        }
        Ok(())
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        self.tables.write().await.sessions.remove(token);
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: i64, except_token: Option<String>) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|token, s| {
            s.user_id != user_id || except_token.as_deref() == Some(token.as_str())
        });
        Ok((before - tables.sessions.len()) as u64)
    }

    async fn cleanup_expired_sessions(&self) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| !s.is_expired());
        Ok((before - tables.sessions.len()) as u64)
    }
}
