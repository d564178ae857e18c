//! Application configuration constants
//!
//! Central location for key namespaces, rate-limit defaults, cache TTLs,
//! and field-length bounds used throughout the crate.

// ===== Key Namespaces =====

/// Prefix for rate-counter keys
pub const RATE_NAMESPACE: &str = "taskmanager:rate";

/// Prefix for cached per-date task listings
pub const TASKS_NAMESPACE: &str = "taskmanager:tasks";

/// Prefix for refresh-session entries
pub const REFRESH_NAMESPACE: &str = "taskmanager:user:refresh";

// ===== Rate Limiting =====

/// Default per-identity API request limit per window
pub const DEFAULT_API_LIMIT: u32 = 60;

/// Default API rate-limit window in seconds
pub const DEFAULT_API_WINDOW_SECONDS: u64 = 60;

/// Default number of tasks a user may create per calendar date
pub const DEFAULT_TASKS_PER_DATE_LIMIT: u32 = 50;

/// Window for the task-creation quota: one calendar date
pub const TASK_QUOTA_WINDOW_SECONDS: u64 = 24 * 60 * 60;

/// Extra seconds added to counter expiry to absorb clock skew.
/// A counter outliving its window only resets the quota early.
pub const TTL_BUFFER_SECONDS: u64 = 5;

// ===== Caching =====

/// TTL for cached date-scoped task listings (10 minutes).
/// Short by design: a stale entry that escapes invalidation self-heals.
pub const LISTING_CACHE_TTL_SECONDS: u64 = 600;

/// TTL for refresh-session entries (7 days)
pub const REFRESH_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Page size hint for cursor-based key scans
pub const SCAN_PAGE_SIZE: usize = 50;

// ===== Field Bounds =====

/// Maximum task title length in characters
pub const MAX_TITLE_LEN: usize = 60;

/// Maximum task description length in characters
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// Maximum task notes length in characters
pub const MAX_NOTES_LEN: usize = 200;
