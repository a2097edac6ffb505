pub mod change_detector;
pub mod notification_builder;

pub use change_detector::*;
pub use notification_builder::*;
