//! Object-level permission checks.
//!
//! Reads are decided by privacy flags in the handlers; these helpers
//! guard mutations.

use tracing::warn;

use crate::db::User;
use crate::error::AppError;
use crate::Result;

/// The card's creator only; staff get no override on cards.
pub fn is_owner(user: &User, owner_id: i64) -> bool {
    user.id == owner_id
}

/// The account holder or any staff member.
pub fn is_self_or_staff(user: &User, target_user_id: i64) -> bool {
    user.is_staff || user.id == target_user_id
}

pub fn require_owner(user: &User, owner_id: i64) -> Result<()> {
    if is_owner(user, owner_id) {
        Ok(())
    } else {
        warn!("User {} denied write access to object owned by {}", user.id, owner_id);
        Err(AppError::PermissionDenied)
    }
}

pub fn require_self_or_staff(user: &User, target_user_id: i64) -> Result<()> {
    if is_self_or_staff(user, target_user_id) {
        Ok(())
    } else {
        warn!("User {} denied access to account {}", user.id, target_user_id);
        Err(AppError::PermissionDenied)
    }
}
