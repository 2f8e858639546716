/// Minimum participants a session may be created for.
pub const MIN_CAPACITY: u8 = 2;

/// Maximum participants a session may be created for.
pub const MAX_CAPACITY: u8 = 8;

/// Global floor for a session's minimum wager. A session cannot be created
/// with `min_wager` below this, so a zero-contribution join is never legal.
pub const WAGER_FLOOR: u64 = 1;

/// Maximum cards in a sealed hand (and the bound on reveal payloads).
pub const HAND_MAX: usize = 5;

/// Codec bound on a participant's action log.
pub const MAX_ACTION_LOG: usize = 256;

/// Codec bound on the capability grants attached to one sealed value.
pub const MAX_GRANTS: usize = 16;

/// Participant count at which an `Open` session flips to `Active`.
pub const ACTIVATION_THRESHOLD: usize = 2;

/// Error codes carried by `Event::WagerFailed`.
pub const ERROR_INVALID_KIND: u8 = 1;
pub const ERROR_INVALID_CAPACITY: u8 = 2;
pub const ERROR_WAGER_BELOW_FLOOR: u8 = 3;
pub const ERROR_REVEAL_TOO_LARGE: u8 = 4;
pub const ERROR_SESSION_NOT_FOUND: u8 = 5;
pub const ERROR_SESSION_NOT_OPEN: u8 = 6;
pub const ERROR_SESSION_NOT_ACTIVE: u8 = 7;
pub const ERROR_SESSION_FULL: u8 = 8;
pub const ERROR_ALREADY_ENDED: u8 = 9;
pub const ERROR_TRANSFER_IN_PROGRESS: u8 = 10;
pub const ERROR_DUPLICATE_JOIN: u8 = 11;
pub const ERROR_NOT_IN_SESSION: u8 = 12;
pub const ERROR_NOT_ADMINISTRATOR: u8 = 13;
pub const ERROR_READ_DENIED: u8 = 14;
pub const ERROR_CONTRIBUTION_TOO_LOW: u8 = 15;
pub const ERROR_NOTHING_TO_WITHDRAW: u8 = 16;
pub const ERROR_TRANSFER_FAILED: u8 = 17;
pub const ERROR_CONFLICTING_INTENT: u8 = 18;
pub const ERROR_ACTION_LOG_FULL: u8 = 19;
