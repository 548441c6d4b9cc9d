use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::domain::{Application, ApplicationId, ApplicationStatus, NewApplication};
use super::persistence::{ApplicationGateway, PersistenceError};
use super::request::ValidationError;
use super::store::ApplicationStore;
use crate::rooms::Room;

/// Time source for application and cancellation timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Owns the application store and commits every mutation through the gateway.
///
/// Each operation holds the store mutex from its first read until the gateway
/// has written the result, so concurrent calls behave as if run one at a time.
/// A failed save rolls the in-memory change back before the lock is released.
pub struct ApplicationLifecycle<G> {
    store: Mutex<ApplicationStore>,
    gateway: Arc<G>,
    clock: Arc<dyn Clock>,
}

impl<G> ApplicationLifecycle<G>
where
    G: ApplicationGateway + 'static,
{
    /// Loads the current collection from `gateway`.
    pub fn open(gateway: Arc<G>) -> Result<Self, PersistenceError> {
        Self::with_clock(gateway, Arc::new(SystemClock))
    }

    pub fn with_clock(gateway: Arc<G>, clock: Arc<dyn Clock>) -> Result<Self, PersistenceError> {
        let records = gateway.load()?;
        Ok(Self {
            store: Mutex::new(ApplicationStore::from_records(records)),
            gateway,
            clock,
        })
    }

    /// Records a pending application for `request.room_id`, embedding `room` as its snapshot.
    pub fn create(
        &self,
        request: NewApplication,
        room: Room,
    ) -> Result<ApplicationId, LifecycleError> {
        let mut store = self.lock();

        if let Some(existing) = store.active_for(request.room_id, &request.user_id) {
            warn!(
                room_id = request.room_id,
                user_id = %request.user_id,
                existing_id = %existing.id,
                "duplicate application rejected"
            );
            return Err(LifecycleError::DuplicateActiveApplication {
                room_id: request.room_id,
                user_id: request.user_id,
            });
        }

        let id = store.allocate_id();
        let record = Application::pending(id, request, room, self.clock.now());
        let (room_id, user_id) = (record.room_id, record.user_id.clone());
        store.append(record);
        let staged = Staged::new(store, Undo::Append(id));

        if let Err(err) = self.gateway.save(staged.store.records()) {
            drop(staged);
            error!(application_id = %id, room_id, %user_id, error = %err, "failed to persist new application");
            return Err(err.into());
        }
        staged.commit();

        info!(application_id = %id, room_id, %user_id, "application submitted");
        Ok(id)
    }

    /// Cancels a pending application owned by `user_id`.
    pub fn cancel(
        &self,
        application_id: ApplicationId,
        user_id: &str,
    ) -> Result<ApplicationId, LifecycleError> {
        let mut store = self.lock();

        let current = store
            .find_owned(application_id, user_id)
            .ok_or(LifecycleError::NotFound(application_id))?;

        match current.status {
            ApplicationStatus::Cancelled => {
                return Err(LifecycleError::AlreadyCancelled(application_id))
            }
            ApplicationStatus::Accepted => {
                return Err(LifecycleError::CannotCancelAccepted(application_id))
            }
            ApplicationStatus::Rejected => {
                return Err(LifecycleError::CannotCancelRejected(application_id))
            }
            ApplicationStatus::Pending => {}
        }

        let mut updated = current.clone();
        updated.mark_cancelled(self.clock.now());
        let Some(previous) = store.replace(updated) else {
            return Err(LifecycleError::NotFound(application_id));
        };
        let staged = Staged::new(store, Undo::Replace(Box::new(previous)));

        if let Err(err) = self.gateway.save(staged.store.records()) {
            drop(staged);
            error!(application_id = %application_id, %user_id, error = %err, "failed to persist cancellation");
            return Err(err.into());
        }
        staged.commit();

        info!(application_id = %application_id, %user_id, "application cancelled");
        Ok(application_id)
    }

    /// Applications submitted by `user_id`, newest first.
    pub fn list_by_user(&self, user_id: &str) -> Vec<Application> {
        let store = self.lock();
        let mut applications: Vec<Application> = store.for_user(user_id).cloned().collect();
        applications.sort_by(|left, right| {
            right
                .application_date
                .cmp(&left.application_date)
                .then_with(|| right.id.cmp(&left.id))
        });
        applications
    }

    /// Total number of applications ever created, cancelled ones included.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn get(&self, application_id: ApplicationId) -> Option<Application> {
        self.lock().get(application_id).cloned()
    }

    // Uncommitted changes are reverted by `Staged` even when a save panics, so
    // a poisoned lock still guards a consistent store.
    fn lock(&self) -> MutexGuard<'_, ApplicationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Undo {
    Append(ApplicationId),
    Replace(Box<Application>),
}

/// Store guard carrying a change that has not been saved yet. Dropping it
/// without [`commit`](Staged::commit) reverts the change, unwinding included.
struct Staged<'a> {
    store: MutexGuard<'a, ApplicationStore>,
    undo: Option<Undo>,
}

impl<'a> Staged<'a> {
    fn new(store: MutexGuard<'a, ApplicationStore>, undo: Undo) -> Self {
        Self {
            store,
            undo: Some(undo),
        }
    }

    fn commit(mut self) {
        self.undo = None;
    }
}

impl Drop for Staged<'_> {
    fn drop(&mut self) {
        match self.undo.take() {
            Some(Undo::Append(id)) => {
                self.store.discard_last(id);
            }
            Some(Undo::Replace(previous)) => {
                self.store.replace(*previous);
            }
            None => {}
        }
    }
}

/// Typed outcome of a rejected lifecycle operation.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("user '{user_id}' already has an active application for room {room_id}")]
    DuplicateActiveApplication { room_id: u64, user_id: String },
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("application {0} is already cancelled")]
    AlreadyCancelled(ApplicationId),
    #[error("application {0} has been accepted and cannot be cancelled")]
    CannotCancelAccepted(ApplicationId),
    #[error("application {0} has been rejected and cannot be cancelled")]
    CannotCancelRejected(ApplicationId),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl LifecycleError {
    /// Stable machine-readable code for API payloads.
    pub const fn code(&self) -> &'static str {
        match self {
            LifecycleError::Validation(_) => "validation_error",
            LifecycleError::DuplicateActiveApplication { .. } => "duplicate_active_application",
            LifecycleError::NotFound(_) => "not_found",
            LifecycleError::AlreadyCancelled(_) => "already_cancelled",
            LifecycleError::CannotCancelAccepted(_) => "cannot_cancel_accepted",
            LifecycleError::CannotCancelRejected(_) => "cannot_cancel_rejected",
            LifecycleError::Persistence(_) => "persistence_error",
        }
    }
}
