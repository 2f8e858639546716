use anyhow::anyhow;
use commonware_cryptography::ed25519::PublicKey;
use tracing::{debug, warn};
use veiltable_types::execution::{Event, Key, Value};
use veiltable_types::wager::Phase;

use crate::engine::SealedEngine;
use crate::error::WagerError;
use crate::escrow::Escrow;
use crate::layer::Layer;
use crate::state::State;

impl<'a, S: State, E: SealedEngine, V: Escrow> Layer<'a, S, E, V> {
    // === Settlement & Emergency Teardown ===

    /// Tear a session down, refunding every tracked contribution. Legal from
    /// `Open` or `Active`; the session only reaches `Closed` once every
    /// participant has been refunded.
    ///
    /// Bookkeeping is decremented strictly per successful transfer. If a
    /// refund fails, the refunds that already moved stay recorded
    /// (`refunded = true`), the phase is left unchanged, and the failure is
    /// reported; retrying skips the participants already made whole.
    pub async fn emergency_end(
        &mut self,
        caller: &PublicKey,
        session_id: u64,
    ) -> Result<Vec<Event>, WagerError> {
        if caller != &self.administrator {
            return Err(WagerError::NotAdministrator);
        }
        let mut session = self.session_or_err(session_id).await?;
        if session.phase == Phase::Closed {
            return Err(WagerError::AlreadyEnded { session_id });
        }
        let mut ledger = self.get_or_init_ledger().await?;
        if ledger.locked {
            return Err(WagerError::TransferInProgress);
        }

        // Enter the transfer guard before any funds move.
        ledger.locked = true;
        self.put(Key::Ledger, Value::Ledger(ledger.clone()));

        let mut refunds = Vec::new();
        let mut failed = None;
        for identity in session.participants.clone() {
            let mut participant = match self
                .get(&Key::Participant(session_id, identity.clone()))
                .await?
            {
                Some(Value::Participant(participant)) => participant,
                _ => {
                    return Err(WagerError::Internal(anyhow!(
                        "participant record missing in session {session_id}"
                    )))
                }
            };
            if participant.refunded || participant.contributed == 0 {
                continue;
            }

            match self.vault.transfer(&identity, participant.contributed) {
                Ok(()) => {
                    participant.refunded = true;
                    session.pot = session.pot.saturating_sub(participant.contributed);
                    ledger.allocated = ledger.allocated.saturating_sub(participant.contributed);
                    refunds.push((identity.clone(), participant.contributed));
                    self.put(
                        Key::Participant(session_id, identity),
                        Value::Participant(participant),
                    );
                }
                Err(err) => {
                    warn!(session = session_id, %err, "refund transfer failed");
                    failed = Some(participant.contributed);
                    break;
                }
            }
        }

        // Release the guard at operation end, success or not.
        ledger.locked = false;
        self.put(Key::Ledger, Value::Ledger(ledger));

        if let Some(amount) = failed {
            self.put(Key::Session(session_id), Value::Session(session));
            return Err(WagerError::TransferFailed { amount });
        }

        session.phase = Phase::Closed;
        self.put(Key::Session(session_id), Value::Session(session));
        debug!(session = session_id, refunds = refunds.len(), "session torn down");

        Ok(vec![Event::SessionClosed {
            session_id,
            refunds,
        }])
    }

    /// Transfer whatever the vault holds beyond live session pots to the
    /// administrator.
    pub async fn withdraw(&mut self, caller: &PublicKey) -> Result<Vec<Event>, WagerError> {
        if caller != &self.administrator {
            return Err(WagerError::NotAdministrator);
        }
        let mut ledger = self.get_or_init_ledger().await?;
        if ledger.locked {
            return Err(WagerError::TransferInProgress);
        }
        let available = self.vault.balance().saturating_sub(ledger.allocated);
        if available == 0 {
            return Err(WagerError::NothingToWithdraw);
        }

        ledger.locked = true;
        self.put(Key::Ledger, Value::Ledger(ledger.clone()));
        let outcome = self.vault.transfer(&self.administrator, available);
        ledger.locked = false;
        self.put(Key::Ledger, Value::Ledger(ledger));

        match outcome {
            Ok(()) => Ok(vec![Event::Withdrawn {
                to: self.administrator.clone(),
                amount: available,
            }]),
            Err(err) => {
                warn!(%err, "withdraw transfer failed");
                Err(WagerError::TransferFailed { amount: available })
            }
        }
    }
}
