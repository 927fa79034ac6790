use thiserror::Error;

use crate::db_types::{NewUser, User};

#[derive(Debug, Clone, Error)]
pub enum UserApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The login {0} is already taken")]
    LoginTaken(String),
}

impl From<sqlx::Error> for UserApiError {
    fn from(e: sqlx::Error) -> Self {
        UserApiError::DatabaseError(e.to_string())
    }
}

/// Storage for user records. Credentials are opaque to the ledger: the password hash is produced and checked by the
/// authentication layer.
#[allow(async_fn_in_trait)]
pub trait UserManagement {
    /// Creates a new user. Logins are unique.
    async fn insert_user(&self, user: NewUser) -> Result<User, UserApiError>;

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, UserApiError>;

    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, UserApiError>;
}
