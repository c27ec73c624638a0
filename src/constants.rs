//! Centralized protocol and configuration constants.
//!
//! This module consolidates the defaults and fixed names used throughout an
//! offsetlog node, so they can be found and changed in one place.
//!
//! # Categories
//!
//! - **Store Constants**: the coordination store service and its key prefixes
//! - **Timing Constants**: RPC and request deadlines, allocator backoff
//! - **Read Path Constants**: poll fan-out

// =============================================================================
// Store Constants
// =============================================================================

/// Node id of the linearizable key/value service inside the cluster.
pub const DEFAULT_STORE_SERVICE: &str = "lin-kv";

/// Key prefix of a partition's latest-offset marker: `latest_<partition>`.
pub const LATEST_KEY_PREFIX: &str = "latest_";

/// Key prefix of a record: `log_<partition>_<offset>`.
pub const RECORD_KEY_PREFIX: &str = "log_";

/// Key prefix of a partition's commit marker: `commit_<partition>`.
pub const COMMIT_KEY_PREFIX: &str = "commit_";

/// Separator between the partition and the offset in record keys.
pub const RECORD_OFFSET_SEPARATOR: char = '_';

// =============================================================================
// Timing Constants
// =============================================================================

/// Default timeout for a single store operation (milliseconds).
///
/// A store RPC that gets no reply within this window is treated as failed.
/// Inside the allocator this triggers another read/compare-and-swap round.
pub const DEFAULT_STORE_RPC_TIMEOUT_MS: u64 = 1_000;

/// Default overall deadline for one client request (milliseconds).
///
/// Bounds the allocator's retry loop. Must be larger than the store RPC
/// timeout or no request could survive a single lost store reply.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Default initial backoff between compare-and-swap attempts (milliseconds).
pub const DEFAULT_CAS_BACKOFF_MIN_MS: u64 = 1;

/// Default maximum backoff between compare-and-swap attempts (milliseconds).
pub const DEFAULT_CAS_BACKOFF_MAX_MS: u64 = 50;

// =============================================================================
// Read Path Constants
// =============================================================================

/// Default number of record reads a single poll keeps in flight.
pub const DEFAULT_MAX_CONCURRENT_READS: usize = 16;
