use commonware_cryptography::ed25519::PublicKey;
use veiltable_types::execution::{Event, Key, Value};
use veiltable_types::wager::{ActionRecord, Phase, TurnAction, MAX_ACTION_LOG};

use crate::engine::{SealedEngine, SealedOp};
use crate::error::WagerError;
use crate::escrow::Escrow;
use crate::layer::Layer;
use crate::state::State;

impl<'a, S: State, E: SealedEngine, V: Escrow> Layer<'a, S, E, V> {
    // === Turn Action Processor ===

    /// Record one turn action for `identity`.
    ///
    /// At most one of `call`/`raise`/`fold` may be set; with none set the
    /// action records as a check. Turn order is deliberately not enforced:
    /// any admitted participant may act any number of times, and
    /// ordering/fairness is a policy concern left to the caller.
    pub async fn act(
        &mut self,
        identity: &PublicKey,
        session_id: u64,
        call: bool,
        raise: bool,
        fold: bool,
        added: u64,
    ) -> Result<Vec<Event>, WagerError> {
        self.ensure_unlocked().await?;

        let mut session = self.session_or_err(session_id).await?;
        let mut participant = self.participant_or_err(session_id, identity).await?;
        if session.phase != Phase::Active {
            return Err(WagerError::SessionNotActive {
                session_id,
                phase: session.phase,
            });
        }
        if u8::from(call) + u8::from(raise) + u8::from(fold) > 1 {
            return Err(WagerError::ConflictingIntent);
        }
        if participant.actions.len() >= MAX_ACTION_LOG {
            return Err(WagerError::ActionLogFull { session_id });
        }

        let action = if fold {
            TurnAction::Fold
        } else if raise {
            TurnAction::Raise
        } else if call {
            TurnAction::Call
        } else {
            TurnAction::Check
        };

        if added > 0 {
            // Escrow the top-up and fold it into a fresh sealed total; sealed
            // values are immutable, so the update is a new handle with its
            // own capability set.
            self.vault.receive(identity, added);
            let delta = self.create_sealed(added, identity).await?;
            participant.sealed_wager = self
                .combine_sealed(SealedOp::Add, participant.sealed_wager, delta, identity)
                .await?;
            participant.contributed = participant.contributed.saturating_add(added);
            session.pot = session.pot.saturating_add(added);

            let mut ledger = self.get_or_init_ledger().await?;
            ledger.allocated = ledger.allocated.saturating_add(added);
            self.put(Key::Ledger, Value::Ledger(ledger));
        }

        if fold {
            participant.sealed_folded = self.create_sealed(1, identity).await?;
        }

        participant.actions.push(ActionRecord { action, added });
        let pot = session.pot;
        self.put(
            Key::Participant(session_id, identity.clone()),
            Value::Participant(participant),
        );
        self.put(Key::Session(session_id), Value::Session(session));

        Ok(vec![Event::ActionTaken {
            session_id,
            identity: identity.clone(),
            action,
            added,
            pot,
        }])
    }
}
