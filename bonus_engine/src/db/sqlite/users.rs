use sqlx::SqliteConnection;

use crate::db_types::{NewUser, User};

pub async fn insert_user(user: &NewUser, conn: &mut SqliteConnection) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
            INSERT INTO users (login, password_hash)
            VALUES ($1, $2)
            RETURNING id, login, password_hash, created_at, updated_at;
        "#,
    )
    .bind(&user.login)
    .bind(&user.password_hash)
    .fetch_one(conn)
    .await
}

pub async fn fetch_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT id, login, password_hash, created_at, updated_at FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_user_by_login(login: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT id, login, password_hash, created_at, updated_at FROM users WHERE login = $1")
        .bind(login)
        .fetch_optional(conn)
        .await
}
