use anyhow::{Context as _, Result};
use commonware_cryptography::{ed25519::PublicKey, sha256::Digest};
use std::collections::BTreeMap;
use tracing::debug;
use veiltable_types::execution::{Event, Instruction, Key, Output, Transaction, Value};
use veiltable_types::wager::{LedgerState, Participant, RegistryState, Session};

use crate::engine::SealedEngine;
use crate::error::WagerError;
use crate::escrow::Escrow;
use crate::state::{load_account, validate_and_increment_nonce, PrepareError, State, Status};

mod handlers;
mod sealed_store;

/// Deterministic execution overlay for one totally ordered batch of
/// operations.
///
/// Writes are buffered in `pending` and only reach the backing state when the
/// caller applies [`Layer::commit`]; each operation validates fully before its
/// first write, so a rejected operation leaves nothing behind.
pub struct Layer<'a, S: State, E: SealedEngine, V: Escrow> {
    state: &'a S,
    pending: BTreeMap<Key, Status>,

    engine: &'a mut E,
    vault: &'a mut V,

    administrator: PublicKey,
    seed: Digest,
    view: u64,
}

impl<'a, S: State, E: SealedEngine, V: Escrow> Layer<'a, S, E, V> {
    pub fn new(
        state: &'a S,
        engine: &'a mut E,
        vault: &'a mut V,
        administrator: PublicKey,
        seed: Digest,
        view: u64,
    ) -> Self {
        Self {
            state,
            pending: BTreeMap::new(),
            engine,
            vault,
            administrator,
            seed,
            view,
        }
    }

    pub fn view(&self) -> u64 {
        self.view
    }

    pub fn administrator(&self) -> &PublicKey {
        &self.administrator
    }

    /// Buffer an update without touching the backing state.
    pub(crate) fn put(&mut self, key: Key, value: Value) {
        self.pending.insert(key, Status::Update(value));
    }

    pub(crate) async fn get_or_init_registry(&self) -> Result<RegistryState> {
        Ok(match self.get(&Key::Registry).await? {
            Some(Value::Registry(registry)) => registry,
            _ => RegistryState::default(),
        })
    }

    pub(crate) async fn get_or_init_ledger(&self) -> Result<LedgerState> {
        Ok(match self.get(&Key::Ledger).await? {
            Some(Value::Ledger(ledger)) => ledger,
            _ => LedgerState::default(),
        })
    }

    pub(crate) async fn session_or_err(&self, session_id: u64) -> Result<Session, WagerError> {
        match self.get(&Key::Session(session_id)).await? {
            Some(Value::Session(session)) => Ok(session),
            _ => Err(WagerError::SessionNotFound { session_id }),
        }
    }

    pub(crate) async fn participant_or_err(
        &self,
        session_id: u64,
        identity: &PublicKey,
    ) -> Result<Participant, WagerError> {
        match self
            .get(&Key::Participant(session_id, identity.clone()))
            .await?
        {
            Some(Value::Participant(participant)) => Ok(participant),
            _ => Err(WagerError::NotInSession { session_id }),
        }
    }

    /// Reject any state-mutating entry while a funds transfer is in flight.
    pub(crate) async fn ensure_unlocked(&self) -> Result<(), WagerError> {
        if self.get_or_init_ledger().await?.locked {
            return Err(WagerError::TransferInProgress);
        }
        Ok(())
    }

    async fn prepare(&mut self, transaction: &Transaction) -> Result<(), PrepareError> {
        let mut account = load_account(self, &transaction.public)
            .await
            .map_err(PrepareError::State)?;
        validate_and_increment_nonce(&mut account, transaction.nonce)?;
        self.put(
            Key::Account(transaction.public.clone()),
            Value::Account(account),
        );

        Ok(())
    }

    async fn apply(&mut self, transaction: &Transaction) -> Result<Vec<Event>> {
        let public = &transaction.public;
        let session_id = match &transaction.instruction {
            Instruction::Join { session_id, .. }
            | Instruction::Act { session_id, .. }
            | Instruction::Reveal { session_id, .. }
            | Instruction::EmergencyEnd { session_id } => Some(*session_id),
            Instruction::CreateSession { .. } | Instruction::Withdraw => None,
        };

        let result = match &transaction.instruction {
            Instruction::CreateSession {
                kind,
                capacity,
                min_wager,
            } => {
                self.create_session(public, *kind, *capacity, *min_wager)
                    .await
            }
            Instruction::Join {
                session_id,
                contribution,
                intends_to_join,
            } => {
                self.join(public, *session_id, *contribution, *intends_to_join)
                    .await
            }
            Instruction::Act {
                session_id,
                call,
                raise,
                fold,
                added,
            } => {
                self.act(public, *session_id, *call, *raise, *fold, *added)
                    .await
            }
            Instruction::Reveal { session_id, opened } => {
                self.reveal(public, *session_id, opened).await
            }
            Instruction::EmergencyEnd { session_id } => {
                self.emergency_end(public, *session_id).await
            }
            Instruction::Withdraw => self.withdraw(public).await,
        };

        match result {
            Ok(events) => Ok(events),
            Err(WagerError::Internal(err)) => Err(err),
            Err(err) => {
                debug!(?public, code = err.code(), %err, "operation rejected");
                Ok(vec![handlers::wager_failed(public, session_id, &err)])
            }
        }
    }

    pub async fn execute(
        &mut self,
        transactions: Vec<Transaction>,
    ) -> Result<(Vec<Output>, BTreeMap<PublicKey, u64>)> {
        let mut processed_nonces = BTreeMap::new();
        let mut outputs = Vec::new();

        for tx in transactions {
            match self.prepare(&tx).await {
                Ok(()) => {}
                Err(PrepareError::NonceMismatch { expected, got }) => {
                    debug!(
                        public = ?tx.public,
                        expected,
                        got,
                        "nonce mismatch; dropping transaction"
                    );
                    continue;
                }
                Err(PrepareError::State(err)) => {
                    return Err(err).context("state error during prepare");
                }
            }
            processed_nonces.insert(tx.public.clone(), tx.nonce.saturating_add(1));
            outputs.extend(self.apply(&tx).await?.into_iter().map(Output::Event));
            outputs.push(Output::Transaction(tx));
        }

        Ok((outputs, processed_nonces))
    }

    pub fn commit(self) -> Vec<(Key, Status)> {
        self.pending.into_iter().collect()
    }
}

impl<'a, S: State, E: SealedEngine, V: Escrow> State for Layer<'a, S, E, V> {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(match self.pending.get(key) {
            Some(Status::Update(value)) => Some(value.clone()),
            Some(Status::Delete) => None,
            None => self.state.get(key).await?,
        })
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.pending.insert(key, Status::Update(value));
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.pending.insert(key.clone(), Status::Delete);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockEngine;
    use crate::escrow::MockVault;
    use crate::mocks::{create_account_keypair, create_seed};
    use crate::state::Memory;
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;
    use veiltable_types::wager::{GameKind, Phase, ERROR_SESSION_NOT_FOUND};

    #[test]
    fn test_nonce_validation() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let state = Memory::default();
            let mut engine = MockEngine::default();
            let mut vault = MockVault::default();
            let (_, admin) = create_account_keypair(999);
            let seed = create_seed(1);
            let mut layer = Layer::new(&state, &mut engine, &mut vault, admin, seed, 1);

            let (signer, _) = create_account_keypair(1);

            // Wrong nonce should fail
            let tx = Transaction::sign(
                &signer,
                1,
                Instruction::CreateSession {
                    kind: 0,
                    capacity: 4,
                    min_wager: 10,
                },
            );
            assert!(layer.prepare(&tx).await.is_err());

            // Correct nonce should succeed
            let tx = Transaction::sign(
                &signer,
                0,
                Instruction::CreateSession {
                    kind: 0,
                    capacity: 4,
                    min_wager: 10,
                },
            );
            assert!(layer.prepare(&tx).await.is_ok());

            let _ = layer.commit();
        });
    }

    #[test]
    fn test_create_session_persists_record() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let state = Memory::default();
            let mut engine = MockEngine::default();
            let mut vault = MockVault::default();
            let (_, admin) = create_account_keypair(999);
            let seed = create_seed(1);
            let mut layer = Layer::new(&state, &mut engine, &mut vault, admin, seed, 1);

            let (signer, public) = create_account_keypair(1);
            let tx = Transaction::sign(
                &signer,
                0,
                Instruction::CreateSession {
                    kind: 0,
                    capacity: 4,
                    min_wager: 10,
                },
            );
            assert!(layer.prepare(&tx).await.is_ok());
            let events = layer.apply(&tx).await.unwrap();

            assert_eq!(events.len(), 1);
            if let Event::SessionCreated {
                session_id,
                creator,
                kind,
                capacity,
                min_wager,
            } = &events[0]
            {
                assert_eq!(*session_id, 1);
                assert_eq!(creator, &public);
                assert_eq!(*kind, GameKind::Draw);
                assert_eq!(*capacity, 4);
                assert_eq!(*min_wager, 10);
            } else {
                panic!("Expected SessionCreated event");
            }

            let session = layer.get_session(1).await.unwrap();
            assert_eq!(session.phase, Phase::Open);
            assert_eq!(session.pot, 0);
            assert!(session.participants.is_empty());
            assert_eq!(layer.total_sessions().await.unwrap(), 1);

            let _ = layer.commit();
        });
    }

    #[test]
    fn test_domain_failures_surface_as_events() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let state = Memory::default();
            let mut engine = MockEngine::default();
            let mut vault = MockVault::default();
            let (_, admin) = create_account_keypair(999);
            let seed = create_seed(1);
            let mut layer = Layer::new(&state, &mut engine, &mut vault, admin, seed, 1);

            let (signer, public) = create_account_keypair(1);
            // Join a session that was never created.
            let tx = Transaction::sign(
                &signer,
                0,
                Instruction::Join {
                    session_id: 42,
                    contribution: 10,
                    intends_to_join: true,
                },
            );
            let (outputs, _) = layer.execute(vec![tx]).await.unwrap();

            assert!(matches!(
                outputs.first(),
                Some(Output::Event(Event::WagerFailed {
                    identity,
                    session_id: Some(42),
                    code: ERROR_SESSION_NOT_FOUND,
                    ..
                })) if identity == &public
            ));

            let _ = layer.commit();
        });
    }

    #[test]
    fn test_layer_execute_is_deterministic_for_identical_inputs() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let state1 = Memory::default();
            let state2 = Memory::default();
            let mut engine1 = MockEngine::default();
            let mut engine2 = MockEngine::default();
            let mut vault1 = MockVault::default();
            let mut vault2 = MockVault::default();

            let (_, admin) = create_account_keypair(999);
            let seed = create_seed(1);

            let (creator, _) = create_account_keypair(1);
            let (joiner_a, _) = create_account_keypair(2);
            let (joiner_b, _) = create_account_keypair(3);

            let txs = vec![
                Transaction::sign(
                    &creator,
                    0,
                    Instruction::CreateSession {
                        kind: 0,
                        capacity: 4,
                        min_wager: 10,
                    },
                ),
                Transaction::sign(
                    &joiner_a,
                    0,
                    Instruction::Join {
                        session_id: 1,
                        contribution: 10,
                        intends_to_join: true,
                    },
                ),
                Transaction::sign(
                    &joiner_b,
                    0,
                    Instruction::Join {
                        session_id: 1,
                        contribution: 15,
                        intends_to_join: true,
                    },
                ),
                Transaction::sign(
                    &joiner_a,
                    1,
                    Instruction::Act {
                        session_id: 1,
                        call: false,
                        raise: true,
                        fold: false,
                        added: 5,
                    },
                ),
            ];

            let mut layer1 = Layer::new(
                &state1,
                &mut engine1,
                &mut vault1,
                admin.clone(),
                seed.clone(),
                1,
            );
            let mut layer2 = Layer::new(&state2, &mut engine2, &mut vault2, admin, seed, 1);

            let (outputs1, nonces1) = layer1.execute(txs.clone()).await.unwrap();
            let (outputs2, nonces2) = layer2.execute(txs).await.unwrap();

            assert_eq!(outputs1, outputs2);
            assert_eq!(nonces1, nonces2);
            assert!(layer1.commit() == layer2.commit());
        });
    }
}
