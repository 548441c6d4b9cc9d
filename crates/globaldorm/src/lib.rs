//! Room discovery and rental application lifecycle for the Global Dorm service.
//!
//! The interesting state lives in [`applications`]: a mutex-guarded store of
//! application records committed to a JSON artifact on every mutation. The
//! [`rooms`] catalog is a read-only collaborator used to validate room ids and
//! capture snapshots at application time.

pub mod applications;
pub mod config;
pub mod error;
pub mod rooms;
pub mod telemetry;
