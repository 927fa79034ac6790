use log::*;
use sqlx::SqliteConnection;

use crate::db_types::{BalanceSnapshot, NewWithdrawal, Withdrawal};

/// Takes the write lock on behalf of the user by touching their row.
///
/// In SQLite this acquires the database write lock, so every other writer queues behind this transaction until it
/// commits or rolls back. Returns `false` if the user does not exist.
pub async fn lock_user(user_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET updated_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Reads the accrued and withdrawn totals for the user in a single statement.
pub async fn balance_snapshot(user_id: i64, conn: &mut SqliteConnection) -> Result<BalanceSnapshot, sqlx::Error> {
    sqlx::query_as::<_, BalanceSnapshot>(
        r#"
            SELECT
                (SELECT CAST(COALESCE(SUM(accrual), 0) AS REAL) FROM orders
                    WHERE user_id = $1 AND status = 'Accrued') AS accrued_total,
                (SELECT CAST(COALESCE(SUM(amount), 0) AS REAL) FROM withdrawals
                    WHERE user_id = $1) AS withdrawn_total;
        "#,
    )
    .bind(user_id)
    .fetch_one(conn)
    .await
}

/// Appends a withdrawal. The caller is responsible for checking the balance under the same transaction.
pub async fn insert_withdrawal(
    withdrawal: &NewWithdrawal,
    conn: &mut SqliteConnection,
) -> Result<Withdrawal, sqlx::Error> {
    let withdrawal = sqlx::query_as::<_, Withdrawal>(
        r#"
            INSERT INTO withdrawals (user_id, order_number, amount)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, order_number, amount, processed_at;
        "#,
    )
    .bind(withdrawal.user_id)
    .bind(withdrawal.order_number.as_str())
    .bind(withdrawal.amount)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Withdrawal #{} of {} recorded for user #{}", withdrawal.id, withdrawal.amount, withdrawal.user_id);
    Ok(withdrawal)
}

/// All of the user's withdrawals, newest first.
pub async fn fetch_withdrawals_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Withdrawal>, sqlx::Error> {
    sqlx::query_as::<_, Withdrawal>(
        r#"
            SELECT id, user_id, order_number, amount, processed_at
            FROM withdrawals
            WHERE user_id = $1
            ORDER BY processed_at DESC, id DESC;
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}
