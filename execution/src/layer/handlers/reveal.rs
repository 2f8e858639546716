use commonware_cryptography::ed25519::PublicKey;
use veiltable_types::execution::{Event, Key, Value};
use veiltable_types::wager::{Phase, HAND_MAX};

use crate::engine::SealedEngine;
use crate::error::WagerError;
use crate::escrow::Escrow;
use crate::layer::Layer;
use crate::state::State;

impl<'a, S: State, E: SealedEngine, V: Escrow> Layer<'a, S, E, V> {
    // === Reveal Handler ===

    /// Record an opened prefix of the caller's hand. Partial reveals are
    /// legal (any length up to the hand maximum); the provided cards
    /// overwrite the already-revealed prefix and extend it as needed. No
    /// winner is computed here.
    pub async fn reveal(
        &mut self,
        identity: &PublicKey,
        session_id: u64,
        opened: &[bool],
    ) -> Result<Vec<Event>, WagerError> {
        self.ensure_unlocked().await?;

        let session = self.session_or_err(session_id).await?;
        let mut participant = self.participant_or_err(session_id, identity).await?;
        if session.phase == Phase::Closed {
            return Err(WagerError::AlreadyEnded { session_id });
        }
        if opened.len() > HAND_MAX {
            return Err(WagerError::RevealTooLarge {
                len: opened.len(),
                max: HAND_MAX,
            });
        }

        for (i, card) in opened.iter().enumerate() {
            if i < participant.opened.len() {
                participant.opened[i] = *card;
            } else {
                participant.opened.push(*card);
            }
        }
        self.put(
            Key::Participant(session_id, identity.clone()),
            Value::Participant(participant),
        );

        Ok(vec![Event::HandRevealed {
            session_id,
            identity: identity.clone(),
            opened: opened.len() as u8,
        }])
    }
}
