//! External user directory contract

use async_trait::async_trait;

use crate::{DirectoryUser, IdentityError, UserId};

/// Resolves opaque external user ids against the organisation directory.
///
/// There is no local user store; every lookup is a network call and may
/// fail independently of this service.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Look up one user. `IdentityError::UserNotFound` when the directory
    /// does not know the id.
    async fn resolve_user(&self, user_id: &str) -> Result<DirectoryUser, IdentityError>;

    /// Every user in the directory, in directory order.
    async fn list_users(&self) -> Result<Vec<DirectoryUser>, IdentityError>;

    /// Raw profile photo bytes, or `None` when the user has no photo.
    async fn user_photo(&self, user_id: &str) -> Result<Option<Vec<u8>>, IdentityError>;
}

/// Ids of users whose display name contains `term`, case-insensitively.
///
/// Duplicates are removed, first occurrence kept.
pub fn matching_user_ids(users: &[DirectoryUser], term: &str) -> Vec<UserId> {
    let mut ids: Vec<UserId> = Vec::new();
    for user in users.iter().filter(|u| u.display_name_contains(term)) {
        if !ids.contains(&user.id) {
            ids.push(user.id.clone());
        }
    }
    ids
}
