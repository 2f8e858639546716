use commonware_cryptography::{
    ed25519::PublicKey,
    sha256::Sha256,
    Hasher,
};
use tracing::debug;
use veiltable_types::execution::{Event, Key, Value};
use veiltable_types::wager::{Participant, Phase, SealedRef, Session, ACTIVATION_THRESHOLD};

use crate::engine::SealedEngine;
use crate::error::WagerError;
use crate::escrow::Escrow;
use crate::layer::Layer;
use crate::state::State;

impl<'a, S: State, E: SealedEngine, V: Escrow> Layer<'a, S, E, V> {
    // === Admission Controller ===

    /// Admit `identity` into an open session, escrowing `contribution`.
    ///
    /// The join that reaches [`ACTIVATION_THRESHOLD`] participants flips the
    /// session to `Active` and deals every present participant a sealed hand;
    /// later joins are barred by the phase check, so activation fires exactly
    /// once per session.
    pub async fn join(
        &mut self,
        identity: &PublicKey,
        session_id: u64,
        contribution: u64,
        intends_to_join: bool,
    ) -> Result<Vec<Event>, WagerError> {
        self.ensure_unlocked().await?;
        if !intends_to_join {
            // Declined joins retain nothing: the escrow primitive is never
            // invoked, so the caller keeps their funds.
            return Ok(Vec::new());
        }

        let mut session = self.session_or_err(session_id).await?;
        // Single admission dominates everything after the lookup: the same
        // pair fails this way on every retry, whatever the phase is by then.
        if session.is_participant(identity) {
            return Err(WagerError::DuplicateJoin { session_id });
        }
        if session.phase != Phase::Open {
            return Err(WagerError::SessionNotOpen {
                session_id,
                phase: session.phase,
            });
        }
        if session.participants.len() >= session.capacity as usize {
            return Err(WagerError::SessionFull {
                session_id,
                capacity: session.capacity,
            });
        }
        if contribution < session.min_wager {
            return Err(WagerError::ContributionTooLow {
                contribution,
                min_wager: session.min_wager,
            });
        }

        // All checks passed; take custody of the wager and seal it.
        self.vault.receive(identity, contribution);
        let sealed_wager = self.create_sealed(contribution, identity).await?;
        let sealed_folded = self.create_sealed(0, identity).await?;

        let ordinal = session.participants.len() as u8;
        let mut participant = Participant::new(
            session_id,
            identity.clone(),
            ordinal,
            contribution,
            sealed_wager,
            sealed_folded,
        );
        session.participants.push(identity.clone());
        session.pot = session.pot.saturating_add(contribution);

        let mut ledger = self.get_or_init_ledger().await?;
        ledger.allocated = ledger.allocated.saturating_add(contribution);
        self.put(Key::Ledger, Value::Ledger(ledger));

        let mut events = vec![Event::ParticipantJoined {
            session_id,
            identity: identity.clone(),
            ordinal,
            contribution,
            pot: session.pot,
        }];

        if session.participants.len() == ACTIVATION_THRESHOLD {
            session.phase = Phase::Active;
            debug!(session = session_id, "session activated");

            // Deal the participants already on record.
            let earlier: Vec<PublicKey> = session
                .participants
                .iter()
                .filter(|p| *p != identity)
                .cloned()
                .collect();
            for other in earlier {
                let mut record = self.participant_or_err(session_id, &other).await?;
                record.sealed_hand = self.deal_hand(&session, record.joined_at, &other).await?;
                self.put(
                    Key::Participant(session_id, other.clone()),
                    Value::Participant(record),
                );
            }
            participant.sealed_hand = self.deal_hand(&session, ordinal, identity).await?;

            events.push(Event::SessionActivated {
                session_id,
                participants: session.participants.len() as u8,
            });
        }

        self.put(
            Key::Participant(session_id, identity.clone()),
            Value::Participant(participant),
        );
        self.put(Key::Session(session_id), Value::Session(session));

        Ok(events)
    }

    /// Deal one participant's sealed hand from the batch seed. Card bits are
    /// derived by hashing the seed with the session id and join ordinal, so
    /// identical batches deal identical hands.
    async fn deal_hand(
        &mut self,
        session: &Session,
        ordinal: u8,
        owner: &PublicKey,
    ) -> Result<Vec<SealedRef>, WagerError> {
        let mut hasher = Sha256::new();
        hasher.update(&self.seed.0);
        hasher.update(&session.id.to_be_bytes());
        hasher.update(&[ordinal]);
        let digest = hasher.finalize().0;

        let size = session.kind.hand_size();
        let mut hand = Vec::with_capacity(size);
        for byte in digest.iter().take(size) {
            let card = u64::from(byte & 1);
            hand.push(self.create_sealed(card, owner).await?);
        }
        Ok(hand)
    }
}
