use globaldorm::applications::{ApplicationLifecycle, JsonFileGateway};
use globaldorm::config::StorageConfig;
use globaldorm::error::AppError;
use globaldorm::rooms::StaticRoomCatalog;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type Lifecycle = ApplicationLifecycle<JsonFileGateway>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) lifecycle: Arc<Lifecycle>,
    pub(crate) catalog: Arc<StaticRoomCatalog>,
}

/// Storage locations that may be overridden from the command line.
#[derive(clap::Args, Debug, Default, Clone)]
pub(crate) struct StorageArgs {
    /// Override the application artifact path (APP_APPLICATIONS_FILE)
    #[arg(long)]
    pub(crate) applications_file: Option<PathBuf>,
    /// Override the room catalog path (APP_ROOMS_FILE)
    #[arg(long)]
    pub(crate) rooms_file: Option<PathBuf>,
}

impl StorageArgs {
    pub(crate) fn apply(&mut self, storage: &mut StorageConfig) {
        if let Some(path) = self.applications_file.take() {
            storage.applications_file = path;
        }
        if let Some(path) = self.rooms_file.take() {
            storage.rooms_file = path;
        }
    }
}

pub(crate) fn open_lifecycle(storage: &StorageConfig) -> Result<Arc<Lifecycle>, AppError> {
    let gateway = Arc::new(JsonFileGateway::new(&storage.applications_file));
    let lifecycle = ApplicationLifecycle::open(gateway)?;
    Ok(Arc::new(lifecycle))
}

pub(crate) fn open_catalog(storage: &StorageConfig) -> Result<Arc<StaticRoomCatalog>, AppError> {
    let catalog = StaticRoomCatalog::from_path(&storage.rooms_file)?;
    Ok(Arc::new(catalog))
}
