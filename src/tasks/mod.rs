//! Bulk-operation primitives: a bounded worker pool and a status poller.

pub mod clock;
pub mod executor;
pub mod poller;
pub mod progress;
pub mod report;

pub use clock::{Clock, ManualClock, TokioClock};
pub use executor::{TaskExecutor, default_parallelism, run_batch};
pub use poller::{PollError, StatusPoller, poll_until};
pub use progress::{LogProgress, ProgressSink};
pub use report::{BatchReport, ItemOutcome};
