use bpl_common::{OrderNumber, Points};
use log::*;
use sqlx::SqliteConnection;

use crate::db_types::{Order, OrderStatusType};

const ORDER_COLUMNS: &str = "id, order_number, user_id, status, accrual, created_at, updated_at";

/// Inserts a new `Intake` order for the user unless the order number is already on record.
///
/// Returns `true` if a row was written. This is not atomic with respect to any follow-up reads. Embed the call in a
/// transaction and pass `&mut *tx` if you need that.
pub async fn insert_if_absent(
    user_id: i64,
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            INSERT INTO orders (order_number, user_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (order_number) DO NOTHING;
        "#,
    )
    .bind(number.as_str())
    .bind(user_id)
    .bind(OrderStatusType::Intake.to_string())
    .execute(conn)
    .await?;
    let inserted = result.rows_affected() == 1;
    trace!("🗃️ Insert of order {number} for user #{user_id}: inserted={inserted}");
    Ok(inserted)
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1");
    sqlx::query_as::<_, Order>(&sql).bind(number.as_str()).fetch_optional(conn).await
}

/// All of the user's orders, newest first.
pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC");
    sqlx::query_as::<_, Order>(&sql).bind(user_id).fetch_all(conn).await
}

/// Up to `limit` orders that still need to be reconciled, oldest first.
pub async fn fetch_unresolved_orders(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE status IN ('Intake', 'Pending') ORDER BY created_at ASC, id ASC \
         LIMIT $1"
    );
    let orders = sqlx::query_as::<_, Order>(&sql).bind(limit).fetch_all(conn).await?;
    trace!("🗃️ {} unresolved orders fetched (limit {limit})", orders.len());
    Ok(orders)
}

/// Sets the status and accrual of an unresolved order. Orders in a terminal state are never touched.
///
/// Returns `true` if the order was updated.
pub async fn update_resolution(
    number: &OrderNumber,
    status: OrderStatusType,
    accrual: Option<Points>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE orders
            SET status = $1, accrual = $2, updated_at = CURRENT_TIMESTAMP
            WHERE order_number = $3 AND status IN ('Intake', 'Pending');
        "#,
    )
    .bind(status.to_string())
    .bind(accrual)
    .bind(number.as_str())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
