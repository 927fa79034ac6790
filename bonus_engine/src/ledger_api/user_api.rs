use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewUser, User},
    traits::{UserApiError, UserManagement},
};

/// Storage side of user registration. Hashing and verifying passwords happens elsewhere.
pub struct UserApi<B> {
    db: B,
}

impl<B: Debug> Debug for UserApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserApi ({:?})", self.db)
    }
}

impl<B> UserApi<B>
where B: UserManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Registers a new user. Fails with [`UserApiError::LoginTaken`] if the login is in use.
    pub async fn register(&self, user: NewUser) -> Result<User, UserApiError> {
        let user = self.db.insert_user(user).await?;
        info!("🔄️ New user #{} registered as {}", user.id, user.login);
        Ok(user)
    }

    pub async fn user_by_login(&self, login: &str) -> Result<Option<User>, UserApiError> {
        self.db.fetch_user_by_login(login).await
    }

    pub async fn user_by_id(&self, user_id: i64) -> Result<Option<User>, UserApiError> {
        self.db.fetch_user(user_id).await
    }
}
