//! Shared vocabulary for the tickroute scheduling layer: identifiers,
//! execution targets, schedule specs, errors and configuration.

pub mod config;
pub mod error;
pub mod ids;
pub mod schedule;
pub mod target;
pub mod telemetry;

pub use config::{load_dotenv, SchedulerConfig};
pub use error::{ConfigError, DispatchError, ScheduleError};
pub use ids::{EntityId, PlayerId, WorldId};
pub use schedule::ScheduleSpec;
pub use target::ExecutionTarget;
