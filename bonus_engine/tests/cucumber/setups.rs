use bonus_engine::db_types::NewUser;
use cucumber::given;

use crate::cucumber::{LedgerSystem, LedgerWorld};

#[given("a fresh ledger")]
async fn fresh_ledger(world: &mut LedgerWorld) {
    let system = LedgerSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "user '{word}' is registered")]
async fn register_user(world: &mut LedgerWorld, login: String) {
    let system = world.system_mut();
    let user = system.users().register(NewUser::new(login.as_str(), "hash")).await.expect("Error registering user");
    system.users.insert(login, user.id);
}
