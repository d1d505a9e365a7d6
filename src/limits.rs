//! Hard limits enforced at the engine boundary.

use crate::model::Ms;

const DAY_MS: Ms = 86_400_000;

/// 2000-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;
/// 2200-01-01T00:00:00Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 7_258_118_400_000;

/// Longest single reservation.
pub const MAX_SPAN_DURATION_MS: Ms = 31 * DAY_MS;

pub const MAX_REASON_LEN: usize = 100;
pub const MAX_NAME_LEN: usize = 256;
pub const MAX_DESCRIPTION_LEN: usize = 2048;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_CAPACITY: u32 = 100_000;

pub const MAX_SPACES_PER_TENANT: usize = 10_000;
pub const MAX_ACCOUNTS_PER_TENANT: usize = 100_000;
pub const MAX_RESERVATIONS_PER_SPACE: usize = 100_000;

pub const DEFAULT_PAGE_LIMIT: usize = 100;
pub const MAX_PAGE_LIMIT: usize = 1_000;

pub const MAX_TENANTS: usize = 64;
pub const MAX_TENANT_NAME_LEN: usize = 128;
