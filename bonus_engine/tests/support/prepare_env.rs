use bonus_engine::{
    db_types::{NewUser, OrderStatusType, User},
    traits::{LedgerDatabase, OrderManagement, UserManagement},
    SqliteDatabase,
};
use bpl_common::{OrderNumber, Points};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/bpl_test_store_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn run_migrations(url: &str) {
    let mut db = SqliteDatabase::new_with_url(url, 1).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    db.close().await;
    info!("🚀️ Migrations complete");
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        trace!("🚀️ Nothing to drop at {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("🚀️ Created Sqlite database {url}");
}

/// A fresh, migrated database at a random location.
pub async fn new_ledger(max_connections: u32) -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, max_connections).await.expect("Error creating database")
}

pub async fn tear_down(mut db: SqliteDatabase) {
    db.close().await;
    if let Err(e) = Sqlite::drop_database(db.url()).await {
        warn!("🚀️ Could not remove test database {}: {e}", db.url());
    }
}

pub async fn create_user(db: &SqliteDatabase, login: &str) -> User {
    db.insert_user(NewUser::new(login, "$argon2id$not-a-real-hash")).await.expect("Error creating user")
}

pub fn order_number(s: &str) -> OrderNumber {
    s.parse().unwrap_or_else(|e| panic!("{s} is not a valid order number: {e}"))
}

/// Records an order for the user and resolves it straight to `Accrued`, as if the authority had reported it.
pub async fn accrue(db: &SqliteDatabase, user_id: i64, number: &str, amount: f64) {
    let number = order_number(number);
    db.insert_order(user_id, &number).await.expect("Error inserting order");
    let order = db
        .update_order_resolution(&number, OrderStatusType::Accrued, Some(Points::from(amount)))
        .await
        .expect("Error resolving order");
    assert!(order.is_some(), "Order {number} could not be accrued");
}
