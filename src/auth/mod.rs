//! Authentication: password hashing, bearer tokens backed by sessions,
//! request extractors and permission checks.

pub mod extractor;
pub mod handlers;
pub mod password;
pub mod permissions;
mod rate_limit;
mod service;

pub use extractor::{CurrentUser, MaybeUser};
pub use password::PasswordHasher;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use service::{AccountChanges, AuthService, Claims, RegisterInput, DUPLICATE_USERNAME};
