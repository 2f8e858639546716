use anyhow::anyhow;
use commonware_cryptography::ed25519::PublicKey;
use veiltable_types::execution::{Key, Value};
use veiltable_types::wager::{CapabilityKind, CapabilitySet, SealedRef, Subject};

use crate::engine::{SealedEngine, SealedOp};
use crate::error::WagerError;
use crate::escrow::Escrow;
use crate::layer::Layer;
use crate::state::State;

impl<'a, S: State, E: SealedEngine, V: Escrow> Layer<'a, S, E, V> {
    // === Sealed-State & Capability Store ===

    /// Seal a plaintext and establish its mandatory capabilities in the same
    /// step: the manager's `ComputeOwner` grant and the contributing party's
    /// `ReadGrant`. There is no path that creates a handle without them.
    pub(crate) async fn create_sealed(
        &mut self,
        plain: u64,
        reader: &PublicKey,
    ) -> Result<SealedRef, WagerError> {
        let reference = self.engine.seal(plain);
        self.record_grants(reference, reader);
        Ok(reference)
    }

    /// Combine two sealed values into a fresh one and re-grant capabilities;
    /// the inputs are immutable and stay valid.
    pub(crate) async fn combine_sealed(
        &mut self,
        op: SealedOp,
        a: SealedRef,
        b: SealedRef,
        reader: &PublicKey,
    ) -> Result<SealedRef, WagerError> {
        let reference = self
            .engine
            .combine(op, a, b)
            .map_err(|err| WagerError::Internal(anyhow!(err)))?;
        self.record_grants(reference, reader);
        Ok(reference)
    }

    fn record_grants(&mut self, reference: SealedRef, reader: &PublicKey) {
        self.engine.grant_compute(reference, &Subject::Manager);
        self.engine
            .grant_read(reference, &Subject::Party(reader.clone()));
        let caps = CapabilitySet::sealed_by_manager(reader.clone());
        self.put(Key::Sealed(reference), Value::Sealed(caps));
    }

    async fn caps_or_denied(&self, reference: SealedRef) -> Result<CapabilitySet, WagerError> {
        match self.get(&Key::Sealed(reference)).await? {
            Some(Value::Sealed(caps)) => Ok(caps),
            // Unknown handles fail the same way as denied ones; who holds
            // what is itself sensitive.
            _ => Err(WagerError::ReadDenied {
                reference: reference.raw(),
            }),
        }
    }

    /// Return a readable handle iff `requester` holds a capability over it or
    /// is the session administrator.
    pub async fn read_authorized(
        &self,
        reference: SealedRef,
        requester: &PublicKey,
    ) -> Result<SealedRef, WagerError> {
        if requester == &self.administrator {
            return Ok(reference);
        }
        let caps = self.caps_or_denied(reference).await?;
        if caps.allows_read(&Subject::Party(requester.clone())) {
            return Ok(reference);
        }
        Err(WagerError::ReadDenied {
            reference: reference.raw(),
        })
    }

    /// Administrator-issued durable read grant.
    pub async fn grant_read(
        &mut self,
        caller: &PublicKey,
        reference: SealedRef,
        subject: &PublicKey,
    ) -> Result<(), WagerError> {
        if caller != &self.administrator {
            return Err(WagerError::NotAdministrator);
        }
        let mut caps = self.caps_or_denied(reference).await?;
        let grantee = Subject::Party(subject.clone());
        caps.insert(grantee.clone(), CapabilityKind::ReadGrant);
        self.engine.grant_read(reference, &grantee);
        self.put(Key::Sealed(reference), Value::Sealed(caps));
        Ok(())
    }

    /// Administrator-issued transient read grant, revocable with
    /// [`Layer::revoke_transient`].
    pub async fn grant_transient_read(
        &mut self,
        caller: &PublicKey,
        reference: SealedRef,
        subject: &PublicKey,
    ) -> Result<(), WagerError> {
        if caller != &self.administrator {
            return Err(WagerError::NotAdministrator);
        }
        let mut caps = self.caps_or_denied(reference).await?;
        let grantee = Subject::Party(subject.clone());
        caps.insert(grantee.clone(), CapabilityKind::TransientReadGrant);
        self.engine.grant_transient_read(reference, &grantee);
        self.put(Key::Sealed(reference), Value::Sealed(caps));
        Ok(())
    }

    /// Revoke a transient grant. Returns whether one was held.
    pub async fn revoke_transient(
        &mut self,
        caller: &PublicKey,
        reference: SealedRef,
        subject: &PublicKey,
    ) -> Result<bool, WagerError> {
        if caller != &self.administrator {
            return Err(WagerError::NotAdministrator);
        }
        let mut caps = self.caps_or_denied(reference).await?;
        let held = caps.revoke_transient(&Subject::Party(subject.clone()));
        self.put(Key::Sealed(reference), Value::Sealed(caps));
        Ok(held)
    }

    /// Read a participant's sealed wager total. Only the owner and the
    /// administrator pass; the policy runs on every accessor, not only on
    /// write paths.
    pub async fn sealed_wager_of(
        &self,
        session_id: u64,
        owner: &PublicKey,
        requester: &PublicKey,
    ) -> Result<SealedRef, WagerError> {
        let participant = self.participant_or_err(session_id, owner).await?;
        self.read_authorized(participant.sealed_wager, requester).await
    }

    /// Read a participant's sealed fold status, same policy as the wager.
    pub async fn sealed_folded_of(
        &self,
        session_id: u64,
        owner: &PublicKey,
        requester: &PublicKey,
    ) -> Result<SealedRef, WagerError> {
        let participant = self.participant_or_err(session_id, owner).await?;
        self.read_authorized(participant.sealed_folded, requester).await
    }

    /// Read a participant's sealed hand, same policy as the wager.
    pub async fn sealed_hand_of(
        &self,
        session_id: u64,
        owner: &PublicKey,
        requester: &PublicKey,
    ) -> Result<Vec<SealedRef>, WagerError> {
        let participant = self.participant_or_err(session_id, owner).await?;
        let mut hand = Vec::with_capacity(participant.sealed_hand.len());
        for card in participant.sealed_hand {
            hand.push(self.read_authorized(card, requester).await?);
        }
        Ok(hand)
    }
}
