pub mod dispatcher;
pub mod game_monitor;
pub mod registry;
pub mod scheduler;
pub mod tracking;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use game_monitor::{GameMonitor, MonitorOutcome, MonitorState};
pub use registry::{monitor_identity, MonitorHandle, MonitorRegistry};
pub use scheduler::{should_monitor, CollectionReport, CollectionScheduler};
pub use tracking::{PollOutcome, PollTracker};
