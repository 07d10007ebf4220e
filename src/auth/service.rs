use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::PasswordHasher;
use crate::config::AuthConfig;
use crate::db::models::{NewUser, User, UserChanges, UserProfile, UserSession};
use crate::db::BingoStore;
use crate::error::{AppError, AuthError, DatabaseError, FieldErrors};
use crate::validation::{self, validate_email, validate_password, validate_username};
use crate::Result;

pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
    pub jti: String, // Unique per token, so two logins in one second differ
}

/// Registration input as submitted; every field is checked by
/// [`AuthService::register`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

/// Account fields editable through the users API; `None` leaves a field as is.
#[derive(Debug, Default, Deserialize)]
pub struct AccountChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct AuthService {
    store: Arc<dyn BingoStore>,
    jwt_secret: String,
    token_expiry_hours: i64,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn BingoStore>,
        jwt_secret: String,
        token_expiry_hours: i64,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            store,
            jwt_secret,
            token_expiry_hours,
            hasher,
        }
    }

    pub fn from_config(store: Arc<dyn BingoStore>, config: &AuthConfig) -> Self {
        Self::new(
            store,
            config.jwt_secret.clone(),
            config.token_expiry_hours,
            PasswordHasher::new(config.password_iterations),
        )
    }

    pub fn hash_password(&self, password: &str) -> String {
        self.hasher.hash(password)
    }

    pub fn verify_password(&self, user: &User, password: &str) -> bool {
        self.hasher.verify(password, &user.password_hash)
    }

    /// Validates the input and creates the user together with its profile.
    pub async fn register(&self, input: &RegisterInput) -> Result<(User, UserProfile)> {
        let mut errors = FieldErrors::new();
        let username = validation::required(&mut errors, "username", input.username.as_deref());
        if let Some(username) = username {
            validate_username(&mut errors, username);
        }
        let email = input.email.as_deref().map(str::trim).unwrap_or_default();
        validate_email(&mut errors, "email", email);
        match input.password.as_deref() {
            None | Some("") => errors.add("password", validation::REQUIRED),
            Some(password) => validate_password(
                &mut errors,
                "password",
                password,
                input.password_confirmation.as_deref(),
                username,
            ),
        }

        if let Some(username) = username {
            if errors.get("username").is_none()
                && self.store.get_user_by_username(username).await?.is_some()
            {
                errors.add("username", DUPLICATE_USERNAME);
            }
        }
        errors.into_result()?;

        // Absent values were recorded as errors above.
        let (Some(username), Some(password)) = (username, input.password.as_deref()) else {
            return Err(AppError::ValidationError("incomplete registration".into()));
        };

        let new_user = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: self.hasher.hash(password),
            is_staff: false,
        };

        match self.store.create_user(new_user).await {
            Ok(created) => {
                info!("Registered user {} (id {})", created.0.username, created.0.id);
                Ok(created)
            }
            Err(AppError::DatabaseError(DatabaseError::Duplicate(_))) => {
                let mut errors = FieldErrors::new();
                errors.add("username", DUPLICATE_USERNAME);
                Err(errors.into())
            }
            Err(e) => Err(e),
        }
    }

    /// Checks credentials and opens a session; returns the bearer token.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<String> {
        let user = self
            .store
            .get_user_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.verify_password(&user, password) {
            warn!("Failed password check for {}", username);
            return Err(AuthError::InvalidCredentials.into());
        }

        self.issue_token(&user).await
    }

    pub async fn issue_token(&self, user: &User) -> Result<String> {
        let token = self.generate_token(user.id)?;
        let session = UserSession::new(user.id, token.clone(), self.token_expiry_hours);
        self.store.create_session(&session).await?;
        Ok(token)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User> {
        let claims = self.decode_token(token)?;

        let session = self
            .store
            .get_session_by_token(token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if session.is_expired() {
            return Err(AuthError::TokenExpired.into());
        }

        let user_id: i64 = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;
        if user_id != session.user_id {
            return Err(AuthError::InvalidToken.into());
        }

        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        self.store.touch_session(token).await?;

        Ok(user)
    }

    pub async fn invalidate_token(&self, token: &str) -> Result<()> {
        self.store.delete_session(token).await
    }

    /// Replaces the password and ends every other session of the user.
    pub async fn change_password(
        &self,
        user: &User,
        current_token: &str,
        old_password: Option<&str>,
        new_password: Option<&str>,
        confirmation: Option<&str>,
    ) -> Result<User> {
        let mut errors = FieldErrors::new();
        match old_password {
            Some(old) if !old.is_empty() => {
                if !self.verify_password(user, old) {
                    errors.add(
                        "old_password",
                        "Your old password was entered incorrectly. Please enter it again.",
                    );
                }
            }
            _ => errors.add("old_password", validation::REQUIRED),
        }
        match new_password {
            Some(new) if !new.is_empty() => validate_password(
                &mut errors,
                "new_password",
                new,
                confirmation,
                Some(&user.username),
            ),
            _ => errors.add("new_password", validation::REQUIRED),
        }
        errors.into_result()?;

        let changes = UserChanges {
            password_hash: new_password.map(|p| self.hasher.hash(p)),
            ..Default::default()
        };
        let updated = self.store.update_user(user.id, changes).await?;
        let dropped = self
            .store
            .delete_user_sessions(user.id, Some(current_token.to_string()))
            .await?;
        info!("Password changed for user {}; {} other sessions ended", user.id, dropped);
        Ok(updated)
    }

    /// Applies username, email and password changes; a new password is
    /// re-hashed before it is stored.
    pub async fn update_account(&self, user: &User, input: &AccountChanges) -> Result<User> {
        let mut errors = FieldErrors::new();
        let username = match input.username.as_deref().map(str::trim) {
            Some("") => {
                errors.add("username", validation::BLANK);
                None
            }
            Some(username) => {
                validate_username(&mut errors, username);
                Some(username)
            }
            None => None,
        };
        let email = input.email.as_deref().map(str::trim);
        if let Some(email) = email {
            validate_email(&mut errors, "email", email);
        }
        match input.password.as_deref() {
            Some("") => errors.add("password", validation::BLANK),
            Some(password) => validate_password(
                &mut errors,
                "password",
                password,
                None,
                Some(username.unwrap_or(&user.username)),
            ),
            None => {}
        }

        if let Some(username) = username {
            if errors.get("username").is_none() {
                if let Some(existing) = self.store.get_user_by_username(username).await? {
                    if existing.id != user.id {
                        errors.add("username", DUPLICATE_USERNAME);
                    }
                }
            }
        }
        errors.into_result()?;

        let changes = UserChanges {
            username: username.map(str::to_string),
            email: email.map(str::to_string),
            password_hash: input.password.as_deref().map(|p| self.hasher.hash(p)),
        };
        match self.store.update_user(user.id, changes).await {
            Ok(updated) => {
                info!("Updated account {}", updated.id);
                Ok(updated)
            }
            Err(AppError::DatabaseError(DatabaseError::Duplicate(_))) => {
                let mut errors = FieldErrors::new();
                errors.add("username", DUPLICATE_USERNAME);
                Err(errors.into())
            }
            Err(e) => Err(e),
        }
    }

    fn generate_token(&self, user_id: i64) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + Duration::hours(self.token_expiry_hours)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }

    fn decode_token(&self, token: &str) -> Result<Claims> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;

        Ok(claims.claims)
    }
}
