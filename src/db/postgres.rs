use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::db::models::{
    BingoCard, BingoCardSquare, CardChanges, CardDetail, CardFilter, Contact, NewCard,
    NewContact, NewUser, Page, PageRequest, ProfileChanges, ProfileSummary, User,
    UserChanges, UserProfile, UserSession,
};
use crate::db::slug::slugify;
use crate::db::store::{like_prefix_pattern, BingoStore};
use crate::error::DatabaseError;
use crate::Result;

const USER_COLUMNS: &str = "id, username, email, password_hash, is_staff, date_joined";
const PROFILE_COLUMNS: &str =
    "p.id, p.user_id, p.created_date, p.slug, p.picture, p.website, p.private, p.about_me";
const CARD_COLUMNS: &str =
    "c.id, c.title, c.slug, c.free_space, c.created_date, c.creator_id, c.private";
const SQUARE_COLUMNS: &str = "id, card_id, position, text, created_date";
const CONTACT_COLUMNS: &str =
    "id, title, facebook, github, linkedin, twitter, email, contact_date";

#[derive(Debug, FromRow)]
struct CardRow {
    #[sqlx(flatten)]
    card: BingoCard,
    creator: String,
}

pub struct PgStore {
    pool: PgPool,
}

#[derive(Debug, Clone)]
pub struct DbPoolStatus {
    pub total_connections: u32,
    pub active_connections: u32,
    pub idle_connections: u32,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut options = PgConnectOptions::from_str(&config.url)
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn pool_status(&self) -> DbPoolStatus {
        let size = self.pool.size();
        let idle = self.pool.num_idle() as u32;

        DbPoolStatus {
            total_connections: size,
            active_connections: size.saturating_sub(idle),
            idle_connections: idle,
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn insert_squares(
        transaction: &mut Transaction<'_, Postgres>,
        card_id: i64,
        texts: &[String],
    ) -> Result<()> {
        for (position, text) in texts.iter().enumerate() {
            sqlx::query("INSERT INTO bingo_card_squares (card_id, position, text) VALUES ($1, $2, $3)")
                .bind(card_id)
                .bind(position as i32)
                .bind(text)
                .execute(&mut **transaction)
                .await?;
        }
        Ok(())
    }

    /// Loads squares for all `rows` in one query and assembles details in row order.
    async fn attach_squares(&self, rows: Vec<CardRow>) -> Result<Vec<CardDetail>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.card.id).collect();
        let squares = sqlx::query_as::<_, BingoCardSquare>(&format!(
            "SELECT {} FROM bingo_card_squares WHERE card_id = ANY($1) ORDER BY card_id, position",
            SQUARE_COLUMNS
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_card: HashMap<i64, Vec<BingoCardSquare>> = HashMap::new();
        for square in squares {
            by_card.entry(square.card_id).or_default().push(square);
        }

        Ok(rows
            .into_iter()
            .map(|row| CardDetail {
                squares: by_card.remove(&row.card.id).unwrap_or_default(),
                creator: row.creator,
                card: row.card,
            })
            .collect())
    }

    async fn fetch_card_row(&self, id: i64) -> Result<Option<CardRow>> {
        let row = sqlx::query_as::<_, CardRow>(&format!(
            "SELECT {}, u.username AS creator FROM bingo_cards c \
             JOIN users u ON u.id = c.creator_id WHERE c.id = $1",
            CARD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn require_card(&self, id: i64) -> Result<CardDetail> {
        let row = self.fetch_card_row(id).await?.ok_or(DatabaseError::NotFound)?;
        Ok(self
            .attach_squares(vec![row])
            .await?
            .pop()
            .ok_or(DatabaseError::NotFound)?)
    }
}

#[async_trait]
impl BingoStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<(User, UserProfile)> {
        let mut transaction = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, is_staff) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .fetch_one(&mut *transaction)
        .await?;

        let profile = sqlx::query_as::<_, UserProfile>(
            "INSERT INTO user_profiles (user_id, created_date, slug) VALUES ($1, $2, $3) \
             RETURNING id, user_id, created_date, slug, picture, website, private, about_me",
        )
        .bind(user.id)
        .bind(user.date_joined)
        .bind(slugify(&user.username))
        .fetch_one(&mut *transaction)
        .await?;

        transaction.commit().await?;
        Ok((user, profile))
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self, page: PageRequest) -> Result<Page<User>> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let items = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY id LIMIT $1 OFFSET $2",
            USER_COLUMNS
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(Page { count: count as u64, items })
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User> {
        let mut transaction = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET username = COALESCE($2, username), email = COALESCE($3, email), \
             password_hash = COALESCE($4, password_hash) WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(&changes.username)
        .bind(&changes.email)
        .bind(&changes.password_hash)
        .fetch_optional(&mut *transaction)
        .await?
        .ok_or(DatabaseError::NotFound)?;

        if changes.username.is_some() {
            sqlx::query("UPDATE user_profiles SET slug = $2 WHERE user_id = $1")
                .bind(id)
                .bind(slugify(&user.username))
                .execute(&mut *transaction)
                .await?;
        }

        transaction.commit().await?;
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound.into());
        }
        Ok(())
    }

    async fn get_profile(&self, id: i64) -> Result<Option<ProfileSummary>> {
        let profile = sqlx::query_as::<_, ProfileSummary>(&format!(
            "SELECT {}, u.username FROM user_profiles p JOIN users u ON u.id = p.user_id \
             WHERE p.id = $1",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn get_profile_by_user(&self, user_id: i64) -> Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {} FROM user_profiles p WHERE p.user_id = $1",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn list_profiles(
        &self,
        include_private: bool,
        page: PageRequest,
    ) -> Result<Page<ProfileSummary>> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_profiles WHERE ($1 OR NOT private)",
        )
        .bind(include_private)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, ProfileSummary>(&format!(
            "SELECT {}, u.username FROM user_profiles p JOIN users u ON u.id = p.user_id \
             WHERE ($1 OR NOT p.private) ORDER BY p.created_date, p.id LIMIT $2 OFFSET $3",
            PROFILE_COLUMNS
        ))
        .bind(include_private)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { count: count as u64, items })
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<UserProfile> {
        let profile = sqlx::query_as::<_, UserProfile>(
            "UPDATE user_profiles SET picture = COALESCE($2, picture), \
             website = COALESCE($3, website), private = COALESCE($4, private), \
             about_me = COALESCE($5, about_me) WHERE id = $1 \
             RETURNING id, user_id, created_date, slug, picture, website, private, about_me",
        )
        .bind(id)
        .bind(&changes.picture)
        .bind(&changes.website)
        .bind(changes.private)
        .bind(&changes.about_me)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DatabaseError::NotFound)?;
        Ok(profile)
    }

    async fn search_profiles(
        &self,
        prefix: &str,
        include_private: bool,
        limit: u32,
    ) -> Result<Vec<ProfileSummary>> {
        let profiles = sqlx::query_as::<_, ProfileSummary>(&format!(
            "SELECT {}, u.username FROM user_profiles p JOIN users u ON u.id = p.user_id \
             WHERE LOWER(u.username) LIKE $1 AND ($2 OR NOT p.private) \
             ORDER BY u.date_joined DESC, u.id DESC LIMIT $3",
            PROFILE_COLUMNS
        ))
        .bind(like_prefix_pattern(&prefix.to_lowercase()))
        .bind(include_private)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(profiles)
    }

    async fn create_card(&self, card: NewCard) -> Result<CardDetail> {
        let mut transaction = self.pool.begin().await?;

        let card_id: i64 = sqlx::query_scalar(
            "INSERT INTO bingo_cards (title, slug, free_space, creator_id, private) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&card.title)
        .bind(slugify(&card.title))
        .bind(&card.free_space)
        .bind(card.creator_id)
        .bind(card.private)
        .fetch_one(&mut *transaction)
        .await?;

        Self::insert_squares(&mut transaction, card_id, &card.squares).await?;
        transaction.commit().await?;

        self.require_card(card_id).await
    }

    async fn get_card(&self, id: i64) -> Result<Option<CardDetail>> {
        match self.fetch_card_row(id).await? {
            Some(row) => Ok(self.attach_squares(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_cards(&self, filter: CardFilter, page: PageRequest) -> Result<Page<CardDetail>> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bingo_cards \
             WHERE ($1 OR NOT private) AND ($2::BIGINT IS NULL OR creator_id = $2)",
        )
        .bind(filter.include_private)
        .bind(filter.creator_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, CardRow>(&format!(
            "SELECT {}, u.username AS creator FROM bingo_cards c \
             JOIN users u ON u.id = c.creator_id \
             WHERE ($1 OR NOT c.private) AND ($2::BIGINT IS NULL OR c.creator_id = $2) \
             ORDER BY c.created_date DESC, c.id DESC LIMIT $3 OFFSET $4",
            CARD_COLUMNS
        ))
        .bind(filter.include_private)
        .bind(filter.creator_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            count: count as u64,
            items: self.attach_squares(rows).await?,
        })
    }

    async fn update_card(&self, id: i64, changes: CardChanges) -> Result<CardDetail> {
        let mut transaction = self.pool.begin().await?;

        let slug = changes.title.as_deref().map(slugify);
        let updated = sqlx::query(
            "UPDATE bingo_cards SET title = COALESCE($2, title), slug = COALESCE($3, slug), \
             free_space = COALESCE($4, free_space), private = COALESCE($5, private) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&slug)
        .bind(&changes.free_space)
        .bind(changes.private)
        .execute(&mut *transaction)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(DatabaseError::NotFound.into());
        }

        if let Some(squares) = &changes.squares {
            sqlx::query("DELETE FROM bingo_card_squares WHERE card_id = $1")
                .bind(id)
                .execute(&mut *transaction)
                .await?;
            Self::insert_squares(&mut transaction, id, squares).await?;
        }

        transaction.commit().await?;
        self.require_card(id).await
    }

    async fn delete_card(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM bingo_cards WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound.into());
        }
        Ok(())
    }

    async fn search_cards(
        &self,
        prefix: &str,
        include_private: bool,
        limit: u32,
    ) -> Result<Vec<CardDetail>> {
        let rows = sqlx::query_as::<_, CardRow>(&format!(
            "SELECT {}, u.username AS creator FROM bingo_cards c \
             JOIN users u ON u.id = c.creator_id \
             WHERE LOWER(c.title) LIKE $1 AND ($2 OR NOT c.private) \
             ORDER BY c.created_date DESC, c.id DESC LIMIT $3",
            CARD_COLUMNS
        ))
        .bind(like_prefix_pattern(&prefix.to_lowercase()))
        .bind(include_private)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        self.attach_squares(rows).await
    }

    async fn card_ids_for_user(&self, user_id: i64, include_private: bool) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM bingo_cards WHERE creator_id = $1 AND ($2 OR NOT private) \
             ORDER BY created_date DESC, id DESC",
        )
        .bind(user_id)
        .bind(include_private)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn list_squares(
        &self,
        include_private: bool,
        page: PageRequest,
    ) -> Result<Page<BingoCardSquare>> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bingo_card_squares s JOIN bingo_cards c ON c.id = s.card_id \
             WHERE ($1 OR NOT c.private)",
        )
        .bind(include_private)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, BingoCardSquare>(
            "SELECT s.id, s.card_id, s.position, s.text, s.created_date \
             FROM bingo_card_squares s JOIN bingo_cards c ON c.id = s.card_id \
             WHERE ($1 OR NOT c.private) ORDER BY s.card_id, s.position LIMIT $2 OFFSET $3",
        )
        .bind(include_private)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { count: count as u64, items })
    }

    async fn get_square(&self, id: i64) -> Result<Option<BingoCardSquare>> {
        let square = sqlx::query_as::<_, BingoCardSquare>(&format!(
            "SELECT {} FROM bingo_card_squares WHERE id = $1",
            SQUARE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(square)
    }

    async fn update_square(&self, id: i64, text: String) -> Result<BingoCardSquare> {
        let square = sqlx::query_as::<_, BingoCardSquare>(&format!(
            "UPDATE bingo_card_squares SET text = $2 WHERE id = $1 RETURNING {}",
            SQUARE_COLUMNS
        ))
        .bind(id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DatabaseError::NotFound)?;
        Ok(square)
    }

    async fn create_contact(&self, contact: NewContact) -> Result<Contact> {
        let contact = sqlx::query_as::<_, Contact>(&format!(
            "INSERT INTO contacts (title, facebook, github, linkedin, twitter, email, contact_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            CONTACT_COLUMNS
        ))
        .bind(&contact.title)
        .bind(&contact.facebook)
        .bind(&contact.github)
        .bind(&contact.linkedin)
        .bind(&contact.twitter)
        .bind(&contact.email)
        .bind(contact.contact_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(contact)
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>> {
        let contacts = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {} FROM contacts ORDER BY id",
            CONTACT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(contacts)
    }

    async fn get_contact(&self, id: i64) -> Result<Option<Contact>> {
        let contact = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {} FROM contacts WHERE id = $1",
            CONTACT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(contact)
    }

    async fn latest_contact(&self) -> Result<Option<Contact>> {
        let contact = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {} FROM contacts ORDER BY contact_date DESC, id DESC LIMIT 1",
            CONTACT_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(contact)
    }

    async fn create_session(&self, session: &UserSession) -> Result<UserSession> {
        let session = sqlx::query_as::<_, UserSession>(
            "INSERT INTO user_sessions (id, user_id, token, expires_at, created_at, last_activity) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, user_id, token, expires_at, created_at, last_activity",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.token)
        .bind(session.expires_at)
        .bind(session.created_at)
        .bind(session.last_activity)
        .fetch_one(&self.pool)
        .await?;
        Ok(session)
    }

    async fn get_session_by_token(&self, token: &str) -> Result<Option<UserSession>> {
        let session = sqlx::query_as::<_, UserSession>(
            "SELECT id, user_id, token, expires_at, created_at, last_activity \
             FROM user_sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn touch_session(&self, token: &str) -> Result<()> {
        sqlx::query("UPDATE user_sessions SET last_activity = NOW() WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM user_sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: i64, except_token: Option<String>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM user_sessions WHERE user_id = $1 AND ($2::TEXT IS NULL OR token <> $2)",
        )
        .bind(user_id)
        .bind(except_token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn cleanup_expired_sessions(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
