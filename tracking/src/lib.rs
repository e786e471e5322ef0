//! `winetrack-tracking` records training runs in an MLflow compatible tracking service.
//!
//! A [`TrackingStore`] implements the logging contract of the service. Three stores are
//! provided:
//!
//! * [`RestStore`] talks to a tracking server over the MLflow REST API
//! * [`FileStore`] writes the `mlruns` directory layout, readable by the MLflow UI
//! * [`MemoryStore`] keeps everything in memory
//!
//! Runs are scoped by an [`ActiveRun`] guard:
//! ```
//! use winetrack_tracking::{MemoryStore, RunStatus, Session};
//!
//! let store = MemoryStore::new();
//! let run = Session::start(&store, "Default", None)?;
//! run.log_param("alpha", 0.5)?;
//! run.log_metric("rmse", 0.79)?;
//! let info = run.end()?;
//!
//! assert_eq!(info.status, RunStatus::Finished);
//! # Ok::<(), winetrack_tracking::LoggingError>(())
//! ```

mod error;
mod file;
mod memory;
mod rest;
mod session;
mod store;
mod uri;

pub use error::{LoggingError, Result};
pub use file::FileStore;
pub use memory::{MemoryStore, RunRecord};
pub use rest::{artifact_target, ArtifactTarget, Credentials, RestStore};
pub use session::{ActiveRun, Session, MLMODEL_FILE, MODEL_DATA_FILE};
pub use store::{now_ms, Metric, ModelVersion, RunInfo, RunStatus, TrackingStore};
pub use uri::{open_store, TrackingUri, TRACKING_URI_ENV};
