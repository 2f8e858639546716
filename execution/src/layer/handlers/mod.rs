use commonware_cryptography::ed25519::PublicKey;
use veiltable_types::execution::Event;

use crate::error::WagerError;

pub(super) fn wager_failed(
    identity: &PublicKey,
    session_id: Option<u64>,
    error: &WagerError,
) -> Event {
    Event::WagerFailed {
        identity: identity.clone(),
        session_id,
        code: error.code(),
        message: error.to_string(),
    }
}

mod admission;
mod registry;
mod reveal;
mod teardown;
mod turn;
