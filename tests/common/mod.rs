//! Integration test common infrastructure.
//!
//! Provides an in-process engine with a manual clock, a spawned HTTP
//! server and a client that speaks as a chosen principal.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestServer;

use chrono::{DateTime, Utc};
use sanction_proto::TargetRef;
use sanctiond::caps::Principal;
use sanctiond::clock::ManualClock;
use sanctiond::config::{AppealPolicy, ReportPolicy};
use sanctiond::db::Database;
use sanctiond::moderation::Engine;
use sanctiond::security::ReputationManager;
use std::sync::Arc;
use uuid::Uuid;

/// Engine over a fresh in-memory database.
#[allow(dead_code)]
pub struct Harness {
    pub db: Database,
    pub clock: Arc<ManualClock>,
    pub engine: Arc<Engine<Database>>,
}

#[allow(dead_code)]
impl Harness {
    pub async fn new() -> Self {
        let db = Database::new(":memory:").await.expect("in-memory database");
        let clock = Arc::new(ManualClock::new(epoch()));
        let reputation = ReputationManager::new(db.pool().clone());
        let engine = Engine::new(
            db.clone(),
            Arc::new(reputation),
            ReportPolicy::default(),
            AppealPolicy::default(),
        )
        .with_clock(clock.clone());
        Self {
            db,
            clock,
            engine: Arc::new(engine),
        }
    }

    /// Register a post by `author` in `community`.
    pub async fn post(&self, author: Uuid, community: Uuid) -> TargetRef {
        let target = TargetRef::Post(Uuid::new_v4());
        self.db
            .content()
            .upsert(target, author, community)
            .await
            .expect("register content");
        target
    }
}

#[allow(dead_code)]
pub fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_750_000_000, 0).expect("valid timestamp")
}

#[allow(dead_code)]
pub fn member(id: Uuid) -> Principal {
    Principal::Member { id }
}

#[allow(dead_code)]
pub fn moderator(community_id: Uuid) -> Principal {
    Principal::Moderator {
        id: Uuid::new_v4(),
        community_id,
    }
}

#[allow(dead_code)]
pub fn admin() -> Principal {
    Principal::Admin { id: Uuid::new_v4() }
}
