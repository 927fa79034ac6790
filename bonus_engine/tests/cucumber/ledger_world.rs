use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use bonus_engine::{
    accrual::{AccrualAuthority, AccrualClientError, AccrualPoller, AccrualReply, PollerConfig, RateLimitGate},
    traits::WithdrawalResult,
    BalanceApi,
    OrderFlowApi,
    SqliteDatabase,
    SubmitOrderResult,
    UserApi,
};
use bpl_common::OrderNumber;
use cucumber::World;
use log::*;
use tokio_util::sync::CancellationToken;

use crate::support::prepare_env::{prepare_test_env, random_db_path};

#[derive(Default, Debug, World)]
pub struct LedgerWorld {
    pub system: Option<LedgerSystem>,
}

impl LedgerWorld {
    pub fn system(&self) -> &LedgerSystem {
        self.system.as_ref().expect("Ledger not initialised")
    }

    pub fn system_mut(&mut self) -> &mut LedgerSystem {
        self.system.as_mut().expect("Ledger not initialised")
    }
}

/// An accrual authority whose answers are scripted by the scenario.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAuthority {
    replies: Arc<Mutex<HashMap<String, AccrualReply>>>,
    throttle: Arc<Mutex<Option<Duration>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedAuthority {
    pub fn set_reply(&self, number: &OrderNumber, reply: AccrualReply) {
        self.replies.lock().unwrap().insert(number.to_string(), reply);
    }

    /// Every query is throttled with `delay` until this is called again with `None`.
    pub fn set_throttle(&self, delay: Option<Duration>) {
        *self.throttle.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AccrualAuthority for ScriptedAuthority {
    async fn query_order(&self, number: &OrderNumber) -> Result<AccrualReply, AccrualClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = *self.throttle.lock().unwrap() {
            return Ok(AccrualReply::RateLimited(delay));
        }
        let reply = self.replies.lock().unwrap().get(number.as_str()).cloned();
        Ok(reply.unwrap_or(AccrualReply::NoInformation))
    }
}

pub struct LedgerSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub authority: ScriptedAuthority,
    pub poller: AccrualPoller<SqliteDatabase, ScriptedAuthority>,
    pub gate: RateLimitGate,
    pub users: HashMap<String, i64>,
    pub last_submission: Option<SubmitOrderResult>,
    pub last_withdrawal: Option<WithdrawalResult>,
}

impl std::fmt::Debug for LedgerSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerSystem ({})", self.db_path)
    }
}

impl LedgerSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("🚀️ Created database: {url}");
        let authority = ScriptedAuthority::default();
        let poller = AccrualPoller::new(db.clone(), authority.clone(), PollerConfig::default(), CancellationToken::new());
        Self {
            db_path: url,
            db,
            authority,
            poller,
            gate: RateLimitGate::default(),
            users: HashMap::new(),
            last_submission: None,
            last_withdrawal: None,
        }
    }

    pub fn orders(&self) -> OrderFlowApi<SqliteDatabase> {
        OrderFlowApi::new(self.db.clone())
    }

    pub fn balances(&self) -> BalanceApi<SqliteDatabase> {
        BalanceApi::new(self.db.clone())
    }

    pub fn users(&self) -> UserApi<SqliteDatabase> {
        UserApi::new(self.db.clone())
    }

    pub fn user_id(&self, login: &str) -> i64 {
        *self.users.get(login).unwrap_or_else(|| panic!("User {login} has not been registered"))
    }
}
