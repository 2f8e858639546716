use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::ed25519::PublicKey;
use thiserror::Error as ThisError;

use super::{HAND_MAX, MAX_CAPACITY, MIN_CAPACITY};

/// Game variants a session can be created for.
///
/// The set is closed; instructions carry a raw `u8` that is validated against
/// it at session creation.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameKind {
    Draw = 0,
    Stud = 1,
    Showdown = 2,
}

impl GameKind {
    /// Sealed cards dealt to each participant when the session activates.
    pub fn hand_size(&self) -> usize {
        match self {
            Self::Draw | Self::Stud => HAND_MAX,
            Self::Showdown => 3,
        }
    }
}

impl TryFrom<u8> for GameKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(GameKind::Draw),
            1 => Ok(GameKind::Stud),
            2 => Ok(GameKind::Showdown),
            _ => Err(()),
        }
    }
}

impl Write for GameKind {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for GameKind {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        GameKind::try_from(value).map_err(|_| Error::InvalidEnum(value))
    }
}

impl FixedSize for GameKind {
    const SIZE: usize = 1;
}

/// Session lifecycle. `Open -> Active` happens on the join that reaches two
/// participants; `Closed` is terminal.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Open = 0,
    Active = 1,
    Closed = 2,
}

impl TryFrom<u8> for Phase {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Phase::Open),
            1 => Ok(Phase::Active),
            2 => Ok(Phase::Closed),
            _ => Err(()),
        }
    }
}

impl Write for Phase {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for Phase {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        Phase::try_from(value).map_err(|_| Error::InvalidEnum(value))
    }
}

impl EncodeSize for Phase {
    fn encode_size(&self) -> usize {
        u8::SIZE
    }
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum SessionInvariantError {
    #[error("capacity out of range (got={got}, min={min}, max={max})")]
    CapacityOutOfRange { got: u8, min: u8, max: u8 },
    #[error("participants exceed capacity (count={count}, capacity={capacity})")]
    OverCapacity { count: usize, capacity: u8 },
    #[error("duplicate participant in join index")]
    DuplicateParticipant,
}

/// One wagering session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub id: u64,
    pub kind: GameKind,
    pub capacity: u8,
    pub min_wager: u64,
    pub pot: u64,
    pub phase: Phase,
    /// Join index, insertion order = join order.
    pub participants: Vec<PublicKey>,
    pub created_at: u64,
}

impl Session {
    pub fn new(id: u64, kind: GameKind, capacity: u8, min_wager: u64, created_at: u64) -> Self {
        Self {
            id,
            kind,
            capacity,
            min_wager,
            pot: 0,
            phase: Phase::Open,
            participants: Vec::new(),
            created_at,
        }
    }

    pub fn is_participant(&self, identity: &PublicKey) -> bool {
        self.participants.iter().any(|p| p == identity)
    }

    pub fn validate_invariants(&self) -> Result<(), SessionInvariantError> {
        if self.capacity < MIN_CAPACITY || self.capacity > MAX_CAPACITY {
            return Err(SessionInvariantError::CapacityOutOfRange {
                got: self.capacity,
                min: MIN_CAPACITY,
                max: MAX_CAPACITY,
            });
        }
        if self.participants.len() > self.capacity as usize {
            return Err(SessionInvariantError::OverCapacity {
                count: self.participants.len(),
                capacity: self.capacity,
            });
        }
        for (i, p) in self.participants.iter().enumerate() {
            if self.participants[..i].contains(p) {
                return Err(SessionInvariantError::DuplicateParticipant);
            }
        }
        Ok(())
    }
}

impl Write for Session {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.kind.write(writer);
        self.capacity.write(writer);
        self.min_wager.write(writer);
        self.pot.write(writer);
        self.phase.write(writer);
        self.participants.write(writer);
        self.created_at.write(writer);
    }
}

impl Read for Session {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: u64::read(reader)?,
            kind: GameKind::read(reader)?,
            capacity: u8::read(reader)?,
            min_wager: u64::read(reader)?,
            pot: u64::read(reader)?,
            phase: Phase::read(reader)?,
            participants: Vec::<PublicKey>::read_range(reader, 0..=MAX_CAPACITY as usize)?,
            created_at: u64::read(reader)?,
        })
    }
}

impl EncodeSize for Session {
    fn encode_size(&self) -> usize {
        self.id.encode_size()
            + self.kind.encode_size()
            + self.capacity.encode_size()
            + self.min_wager.encode_size()
            + self.pot.encode_size()
            + self.phase.encode_size()
            + self.participants.encode_size()
            + self.created_at.encode_size()
    }
}

/// Session id counter. Ids are never reused, so stale references fail
/// lookup instead of resolving to a recycled session; id 0 is never issued.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct RegistryState {
    pub issued: u64,
}

impl Write for RegistryState {
    fn write(&self, writer: &mut impl BufMut) {
        self.issued.write(writer);
    }
}

impl Read for RegistryState {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            issued: u64::read(reader)?,
        })
    }
}

impl EncodeSize for RegistryState {
    fn encode_size(&self) -> usize {
        self.issued.encode_size()
    }
}

/// Escrow bookkeeping shared by every session.
///
/// `allocated` tracks the sum of all live session pots; whatever the vault
/// holds beyond it is withdrawable by the administrator. `locked` is the
/// mutual-exclusion guard entered before any external transfer and released
/// at operation end.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct LedgerState {
    pub allocated: u64,
    pub locked: bool,
}

impl Write for LedgerState {
    fn write(&self, writer: &mut impl BufMut) {
        self.allocated.write(writer);
        self.locked.write(writer);
    }
}

impl Read for LedgerState {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            allocated: u64::read(reader)?,
            locked: bool::read(reader)?,
        })
    }
}

impl EncodeSize for LedgerState {
    fn encode_size(&self) -> usize {
        self.allocated.encode_size() + self.locked.encode_size()
    }
}
