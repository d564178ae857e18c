//! Services module
//!
//! Business logic between the API layer and the stores: admission control,
//! task operations, batch reconciliation, and session bookkeeping.

pub mod rate_limit;
pub mod sessions;
pub mod sync;
pub mod tasks;

pub use rate_limit::RateLimiter;
pub use sessions::RefreshSessions;
pub use sync::SyncService;
pub use tasks::TaskService;
