//! Fixed limits and stack-wide defaults.
//!
//! Constants are fixed and immutable, enforced at compile time. Each limit
//! has explicit bounds to prevent unbounded resource allocation. Tunable
//! behavior (TTLs, deadlines) belongs in the per-component config structs,
//! not here; these are the values those configs default to.

use std::time::Duration;

/// Maximum size of a single key in bytes (1 KB).
///
/// Applied to every transaction operation before it reaches the store.
pub const MAX_KEY_SIZE: u32 = 1024;

/// Maximum size of a single value in bytes (1 MB).
pub const MAX_VALUE_SIZE: u32 = 1024 * 1024;

/// Maximum number of compares plus operations in a single transaction.
///
/// Fixed limit on transaction width prevents pathological cases with
/// unbounded operation counts.
pub const MAX_TXN_OPS: u32 = 128;

/// Default TTL requested for granted leases.
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(60);

/// Default deadline for point reads (verification and membership listing).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);
