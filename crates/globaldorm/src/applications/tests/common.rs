use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::applications::domain::{Application, NewApplication};
use crate::applications::lifecycle::{ApplicationLifecycle, Clock};
use crate::applications::persistence::{ApplicationGateway, PersistenceError};
use crate::applications::router::{application_router, ApplicationDesk};
use crate::rooms::fixtures;
use crate::rooms::{Room, StaticRoomCatalog};

pub(super) fn request(room_id: u64, user_id: &str) -> NewApplication {
    NewApplication {
        room_id,
        user_id: user_id.to_string(),
        user_email: format!("{user_id}@example.com"),
    }
}

pub(super) fn room(room_id: u64) -> Room {
    fixtures::room(room_id, "Nottingham", 450.0, true)
}

pub(super) fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap()
}

/// Hands out strictly increasing timestamps one minute apart.
pub(super) struct SteppingClock {
    next: Mutex<DateTime<Utc>>,
}

impl Default for SteppingClock {
    fn default() -> Self {
        Self {
            next: Mutex::new(start_time()),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().expect("clock mutex poisoned");
        let current = *next;
        *next = current + Duration::minutes(1);
        current
    }
}

#[derive(Default)]
pub(super) struct MemoryGateway {
    pub(super) records: Mutex<Vec<Application>>,
    pub(super) saves: AtomicUsize,
    pub(super) fail_saves: AtomicBool,
    pub(super) panic_saves: AtomicBool,
}

impl MemoryGateway {
    pub(super) fn seeded(records: Vec<Application>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub(super) fn stored(&self) -> Vec<Application> {
        self.records.lock().expect("gateway mutex poisoned").clone()
    }

    pub(super) fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub(super) fn fail_next_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub(super) fn panic_next_saves(&self, panic: bool) {
        self.panic_saves.store(panic, Ordering::SeqCst);
    }
}

impl ApplicationGateway for MemoryGateway {
    fn load(&self) -> Result<Vec<Application>, PersistenceError> {
        Ok(self.stored())
    }

    fn save(&self, records: &[Application]) -> Result<(), PersistenceError> {
        if self.panic_saves.load(Ordering::SeqCst) {
            panic!("storage driver crashed mid-write");
        }
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("disk full".to_string()));
        }
        *self.records.lock().expect("gateway mutex poisoned") = records.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(super) struct UnreadableGateway;

impl ApplicationGateway for UnreadableGateway {
    fn load(&self) -> Result<Vec<Application>, PersistenceError> {
        Err(PersistenceError::Unavailable("volume not mounted".to_string()))
    }

    fn save(&self, _records: &[Application]) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unavailable("volume not mounted".to_string()))
    }
}

pub(super) fn build_lifecycle() -> (Arc<ApplicationLifecycle<MemoryGateway>>, Arc<MemoryGateway>) {
    build_lifecycle_with(MemoryGateway::default())
}

pub(super) fn build_lifecycle_with(
    gateway: MemoryGateway,
) -> (Arc<ApplicationLifecycle<MemoryGateway>>, Arc<MemoryGateway>) {
    let gateway = Arc::new(gateway);
    let lifecycle = ApplicationLifecycle::with_clock(
        gateway.clone(),
        Arc::new(SteppingClock::default()),
    )
    .expect("memory gateway loads");
    (Arc::new(lifecycle), gateway)
}

pub(super) fn desk(
    lifecycle: Arc<ApplicationLifecycle<MemoryGateway>>,
) -> ApplicationDesk<MemoryGateway, StaticRoomCatalog> {
    ApplicationDesk {
        lifecycle,
        catalog: Arc::new(fixtures::catalog()),
    }
}

pub(super) fn router(lifecycle: Arc<ApplicationLifecycle<MemoryGateway>>) -> axum::Router {
    application_router(desk(lifecycle))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
