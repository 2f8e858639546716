use commonware_cryptography::ed25519::PublicKey;
use tracing::debug;
use veiltable_types::execution::{Event, Key, Value};
use veiltable_types::wager::{
    GameKind, Session, MAX_CAPACITY, MIN_CAPACITY, WAGER_FLOOR,
};

use crate::engine::SealedEngine;
use crate::error::WagerError;
use crate::escrow::Escrow;
use crate::layer::Layer;
use crate::state::State;

impl<'a, S: State, E: SealedEngine, V: Escrow> Layer<'a, S, E, V> {
    // === Session Registry ===

    /// Create a new session. `kind` arrives raw and is validated against the
    /// closed variant set here, before any state is touched.
    pub async fn create_session(
        &mut self,
        creator: &PublicKey,
        kind: u8,
        capacity: u8,
        min_wager: u64,
    ) -> Result<Vec<Event>, WagerError> {
        self.ensure_unlocked().await?;

        let game = GameKind::try_from(kind).map_err(|_| WagerError::InvalidKind { kind })?;
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
            return Err(WagerError::InvalidCapacity {
                capacity,
                min: MIN_CAPACITY,
                max: MAX_CAPACITY,
            });
        }
        if min_wager < WAGER_FLOOR {
            return Err(WagerError::WagerBelowFloor {
                min_wager,
                floor: WAGER_FLOOR,
            });
        }

        let mut registry = self.get_or_init_registry().await?;
        registry.issued += 1;
        let session_id = registry.issued;
        let session = Session::new(session_id, game, capacity, min_wager, self.view());

        debug!(session = session_id, kind = ?game, capacity, min_wager, "session created");
        self.put(Key::Registry, Value::Registry(registry));
        self.put(Key::Session(session_id), Value::Session(session));

        Ok(vec![Event::SessionCreated {
            session_id,
            creator: creator.clone(),
            kind: game,
            capacity,
            min_wager,
        }])
    }

    /// Look a session up by id. Ids are never reused, so anything not issued
    /// (including the reserved id 0) fails the same way.
    pub async fn get_session(&self, session_id: u64) -> Result<Session, WagerError> {
        self.session_or_err(session_id).await
    }

    pub async fn total_sessions(&self) -> Result<u64, WagerError> {
        Ok(self.get_or_init_registry().await?.issued)
    }
}
