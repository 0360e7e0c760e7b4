pub mod clock;
pub mod error;
pub mod ir;
pub mod metrics;

pub use clock::{Clock, LogicalClock, RealTimeClock};
pub use error::{CoreError, ErrorCategory, Result};
pub use metrics::{MetricsSink, NullSink, RecordingSink};
