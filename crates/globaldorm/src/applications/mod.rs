//! Room application lifecycle: creation, cancellation, and history.
//!
//! [`ApplicationLifecycle`] is the only writer. It validates each request
//! against the [`ApplicationStore`] snapshot under a single mutex and reports
//! success only after the [`ApplicationGateway`] has committed the new
//! collection.

pub mod domain;
pub mod lifecycle;
pub mod persistence;
pub mod request;
pub mod router;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{Application, ApplicationId, ApplicationStatus, NewApplication};
pub use lifecycle::{ApplicationLifecycle, Clock, LifecycleError, SystemClock};
pub use persistence::{ApplicationGateway, JsonFileGateway, PersistenceError};
pub use request::{CancelApplication, ValidationError};
pub use router::{application_router, run_blocking, ApplicationDesk};
pub use store::ApplicationStore;
