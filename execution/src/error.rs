use thiserror::Error as ThisError;
use veiltable_types::wager::{self, Phase};

/// Coarse error categories for programmatic handling. Every [`WagerError`]
/// maps onto exactly one kind; none leaks sealed-value contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    State,
    Authorization,
    Financial,
    /// State-backend failure; propagated instead of surfaced as an event.
    Internal,
}

/// Typed failures surfaced by every session-manager operation.
///
/// All checks producing these run before any state mutation, so a failed
/// operation leaves pot, phase, and logs unchanged. The one exception is a
/// refund transfer failing mid-teardown: the refunds that already moved stay
/// recorded (funds actually left), and the error reports the transfer that
/// did not.
#[derive(Debug, ThisError)]
pub enum WagerError {
    #[error("unknown game kind {kind}")]
    InvalidKind { kind: u8 },
    #[error("capacity {capacity} outside [{min}, {max}]")]
    InvalidCapacity { capacity: u8, min: u8, max: u8 },
    #[error("minimum wager {min_wager} below floor {floor}")]
    WagerBelowFloor { min_wager: u64, floor: u64 },
    #[error("reveal of {len} cards exceeds hand maximum {max}")]
    RevealTooLarge { len: usize, max: usize },
    #[error("more than one action intent set")]
    ConflictingIntent,

    #[error("session {session_id} not found")]
    SessionNotFound { session_id: u64 },

    #[error("session {session_id} is not open (phase {phase:?})")]
    SessionNotOpen { session_id: u64, phase: Phase },
    #[error("session {session_id} is not active (phase {phase:?})")]
    SessionNotActive { session_id: u64, phase: Phase },
    #[error("session {session_id} is full (capacity {capacity})")]
    SessionFull { session_id: u64, capacity: u8 },
    #[error("session {session_id} already ended")]
    AlreadyEnded { session_id: u64 },
    #[error("action log full for session {session_id}")]
    ActionLogFull { session_id: u64 },
    #[error("a transfer is in progress")]
    TransferInProgress,

    #[error("identity already joined session {session_id}")]
    DuplicateJoin { session_id: u64 },
    #[error("identity has no participant record in session {session_id}")]
    NotInSession { session_id: u64 },
    #[error("caller is not the administrator")]
    NotAdministrator,
    #[error("no read capability for sealed value {reference}")]
    ReadDenied { reference: u64 },

    #[error("contribution {contribution} below session minimum {min_wager}")]
    ContributionTooLow { contribution: u64, min_wager: u64 },
    #[error("no balance available to withdraw")]
    NothingToWithdraw,
    #[error("transfer of {amount} failed")]
    TransferFailed { amount: u64 },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl WagerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKind { .. }
            | Self::InvalidCapacity { .. }
            | Self::WagerBelowFloor { .. }
            | Self::RevealTooLarge { .. }
            | Self::ConflictingIntent => ErrorKind::Validation,
            Self::SessionNotFound { .. } => ErrorKind::NotFound,
            Self::SessionNotOpen { .. }
            | Self::SessionNotActive { .. }
            | Self::SessionFull { .. }
            | Self::AlreadyEnded { .. }
            | Self::ActionLogFull { .. }
            | Self::TransferInProgress => ErrorKind::State,
            Self::DuplicateJoin { .. }
            | Self::NotInSession { .. }
            | Self::NotAdministrator
            | Self::ReadDenied { .. } => ErrorKind::Authorization,
            Self::ContributionTooLow { .. }
            | Self::NothingToWithdraw
            | Self::TransferFailed { .. } => ErrorKind::Financial,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable code carried by `Event::WagerFailed`.
    pub fn code(&self) -> u8 {
        match self {
            Self::InvalidKind { .. } => wager::ERROR_INVALID_KIND,
            Self::InvalidCapacity { .. } => wager::ERROR_INVALID_CAPACITY,
            Self::WagerBelowFloor { .. } => wager::ERROR_WAGER_BELOW_FLOOR,
            Self::RevealTooLarge { .. } => wager::ERROR_REVEAL_TOO_LARGE,
            Self::ConflictingIntent => wager::ERROR_CONFLICTING_INTENT,
            Self::SessionNotFound { .. } => wager::ERROR_SESSION_NOT_FOUND,
            Self::SessionNotOpen { .. } => wager::ERROR_SESSION_NOT_OPEN,
            Self::SessionNotActive { .. } => wager::ERROR_SESSION_NOT_ACTIVE,
            Self::SessionFull { .. } => wager::ERROR_SESSION_FULL,
            Self::AlreadyEnded { .. } => wager::ERROR_ALREADY_ENDED,
            Self::ActionLogFull { .. } => wager::ERROR_ACTION_LOG_FULL,
            Self::TransferInProgress => wager::ERROR_TRANSFER_IN_PROGRESS,
            Self::DuplicateJoin { .. } => wager::ERROR_DUPLICATE_JOIN,
            Self::NotInSession { .. } => wager::ERROR_NOT_IN_SESSION,
            Self::NotAdministrator => wager::ERROR_NOT_ADMINISTRATOR,
            Self::ReadDenied { .. } => wager::ERROR_READ_DENIED,
            Self::ContributionTooLow { .. } => wager::ERROR_CONTRIBUTION_TOO_LOW,
            Self::NothingToWithdraw => wager::ERROR_NOTHING_TO_WITHDRAW,
            Self::TransferFailed { .. } => wager::ERROR_TRANSFER_FAILED,
            Self::Internal(_) => 0,
        }
    }
}
