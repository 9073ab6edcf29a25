//! # Terra-Valuation Audit
//!
//! The vegetation-loss and ecological-liability workflow built on the
//! `terraval-algorithms` raster engine.
//!
//! A run is strictly forward:
//!
//! 1. [`config`]: region, years, rates, price tiers and loss policies,
//!    validated before anything is read
//! 2. [`catalog`] and [`layers`]: scene archive and static DEM/landcover inputs
//! 3. [`pipeline`]: composites, relief zones, masks and region reductions
//! 4. [`valuation`] and [`report`]: priced scenarios and the printed report
//! 5. [`export`]: polygon layers handed to a background writer
//!
//! ## Example
//!
//! ```ignore
//! use terraval_audit::prelude::*;
//!
//! let config = AuditConfig::from_file("audit.toml")?;
//! let roi = config.region.roi()?;
//! let layers = StaticLayers::load(&config.data, &roi, config.relief.radius_m)?;
//! let scenes = ManifestCatalog::open(&config.data.scenes)?;
//! let exports = ExportQueue::start(&config.exports.output_dir)?;
//!
//! let run = run_valuation(&config, &layers, &scenes, &exports)?;
//! println!("{}", AuditReport::new(&config, run).to_text());
//! exports.finish()?;
//! ```

pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod layers;
pub mod pipeline;
pub mod report;
pub mod valuation;

pub use error::{AuditError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::catalog::{InMemoryScenes, ManifestCatalog, Scene, SceneQuery, SceneSource};
    pub use crate::config::{AuditConfig, CarbonTier, LossPolicy, Scenario, WaterTier};
    pub use crate::dashboard::DashboardMetrics;
    pub use crate::error::{AuditError, Result};
    pub use crate::export::{ExportJob, ExportQueue, ExportRecord};
    pub use crate::layers::StaticLayers;
    pub use crate::pipeline::{detect_loss, run_forensic, run_valuation, ForensicRun, ValuationRun};
    pub use crate::report::AuditReport;
    pub use crate::valuation::{evaluate_scenarios, liability, PhysicalScalars, ScenarioValue};
}
