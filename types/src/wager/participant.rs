use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::ed25519::PublicKey;

use super::{SealedRef, HAND_MAX, MAX_ACTION_LOG};

/// Turn actions recorded in a participant's append-only log.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnAction {
    Check = 0,
    Call = 1,
    Raise = 2,
    Fold = 3,
}

impl TryFrom<u8> for TurnAction {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TurnAction::Check),
            1 => Ok(TurnAction::Call),
            2 => Ok(TurnAction::Raise),
            3 => Ok(TurnAction::Fold),
            _ => Err(()),
        }
    }
}

impl Write for TurnAction {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for TurnAction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        TurnAction::try_from(value).map_err(|_| Error::InvalidEnum(value))
    }
}

impl FixedSize for TurnAction {
    const SIZE: usize = 1;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionRecord {
    pub action: TurnAction,
    /// Contribution delta escrowed with the action (0 for check/call/fold
    /// without a top-up).
    pub added: u64,
}

impl Write for ActionRecord {
    fn write(&self, writer: &mut impl BufMut) {
        self.action.write(writer);
        self.added.write(writer);
    }
}

impl Read for ActionRecord {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            action: TurnAction::read(reader)?,
            added: u64::read(reader)?,
        })
    }
}

impl EncodeSize for ActionRecord {
    fn encode_size(&self) -> usize {
        self.action.encode_size() + self.added.encode_size()
    }
}

/// Per-session participant record, keyed by `(session id, identity)`.
///
/// Created only by admission, mutated only by the turn/reveal handlers acting
/// for the same identity, and never deleted; teardown marks it refunded
/// instead of removing it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub session_id: u64,
    pub identity: PublicKey,
    /// Join ordinal (0-based insertion order).
    pub joined_at: u8,
    /// Plaintext running total of everything this identity escrowed
    /// (join wager + raises); the refund source of truth.
    pub contributed: u64,
    /// Set once the refund transfer for this record has succeeded.
    pub refunded: bool,
    pub sealed_wager: SealedRef,
    pub sealed_folded: SealedRef,
    pub sealed_hand: Vec<SealedRef>,
    /// Revealed prefix of the hand, recorded by the reveal handler.
    pub opened: Vec<bool>,
    pub actions: Vec<ActionRecord>,
}

impl Participant {
    pub fn new(
        session_id: u64,
        identity: PublicKey,
        joined_at: u8,
        contributed: u64,
        sealed_wager: SealedRef,
        sealed_folded: SealedRef,
    ) -> Self {
        Self {
            session_id,
            identity,
            joined_at,
            contributed,
            refunded: false,
            sealed_wager,
            sealed_folded,
            sealed_hand: Vec::new(),
            opened: Vec::new(),
            actions: Vec::new(),
        }
    }
}

impl Write for Participant {
    fn write(&self, writer: &mut impl BufMut) {
        self.session_id.write(writer);
        self.identity.write(writer);
        self.joined_at.write(writer);
        self.contributed.write(writer);
        self.refunded.write(writer);
        self.sealed_wager.write(writer);
        self.sealed_folded.write(writer);
        self.sealed_hand.write(writer);
        self.opened.write(writer);
        self.actions.write(writer);
    }
}

impl Read for Participant {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            session_id: u64::read(reader)?,
            identity: PublicKey::read(reader)?,
            joined_at: u8::read(reader)?,
            contributed: u64::read(reader)?,
            refunded: bool::read(reader)?,
            sealed_wager: SealedRef::read(reader)?,
            sealed_folded: SealedRef::read(reader)?,
            sealed_hand: Vec::<SealedRef>::read_range(reader, 0..=HAND_MAX)?,
            opened: Vec::<bool>::read_range(reader, 0..=HAND_MAX)?,
            actions: Vec::<ActionRecord>::read_range(reader, 0..=MAX_ACTION_LOG)?,
        })
    }
}

impl EncodeSize for Participant {
    fn encode_size(&self) -> usize {
        self.session_id.encode_size()
            + self.identity.encode_size()
            + self.joined_at.encode_size()
            + self.contributed.encode_size()
            + self.refunded.encode_size()
            + self.sealed_wager.encode_size()
            + self.sealed_folded.encode_size()
            + self.sealed_hand.encode_size()
            + self.opened.encode_size()
            + self.actions.encode_size()
    }
}
