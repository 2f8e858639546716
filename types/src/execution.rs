use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::ed25519::{self, PublicKey};
use commonware_cryptography::{Signer, Verifier};
use commonware_utils::union;

use crate::wager::{
    CapabilitySet, GameKind, LedgerState, Participant, RegistryState, SealedRef, Session,
    TurnAction, MAX_CAPACITY,
};

pub const NAMESPACE: &[u8] = b"_VEILTABLE";
pub const TRANSACTION_SUFFIX: &[u8] = b"_TX";

/// Bound on the human-readable message attached to failure events.
const MAX_MESSAGE_LENGTH: usize = 256;

/// Wire bound on reveal payloads. Deliberately laxer than the hand maximum
/// so an oversized reveal reaches the handler and fails validation there
/// instead of dying in the codec.
const MAX_REVEAL_WIRE: usize = 64;

#[inline]
pub fn transaction_namespace(namespace: &[u8]) -> Vec<u8> {
    union(namespace, TRANSACTION_SUFFIX)
}

fn write_string(s: &str, writer: &mut impl BufMut) {
    let bytes = s.as_bytes();
    (bytes.len() as u32).write(writer);
    writer.put_slice(bytes);
}

fn read_string(reader: &mut impl Buf, max_len: usize) -> Result<String, Error> {
    let len = u32::read(reader)? as usize;
    if len > max_len {
        return Err(Error::Invalid("String", "too long"));
    }
    if reader.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    let mut bytes = vec![0u8; len];
    reader.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|_| Error::Invalid("String", "invalid UTF-8"))
}

fn string_encode_size(s: &str) -> usize {
    4 + s.len()
}

/// Per-identity replay protection.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Account {
    pub nonce: u64,
}

impl Write for Account {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
    }
}

impl Read for Account {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            nonce: u64::read(reader)?,
        })
    }
}

impl EncodeSize for Account {
    fn encode_size(&self) -> usize {
        self.nonce.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub nonce: u64,
    pub instruction: Instruction,

    pub public: ed25519::PublicKey,
    pub signature: ed25519::Signature,
}

impl Transaction {
    fn payload(nonce: &u64, instruction: &Instruction) -> Vec<u8> {
        let mut payload = Vec::new();
        nonce.write(&mut payload);
        instruction.write(&mut payload);

        payload
    }

    pub fn sign(private: &ed25519::PrivateKey, nonce: u64, instruction: Instruction) -> Self {
        let signature = private.sign(
            &transaction_namespace(NAMESPACE),
            &Self::payload(&nonce, &instruction),
        );

        Self {
            nonce,
            instruction,
            public: private.public_key(),
            signature,
        }
    }

    pub fn verify(&self) -> bool {
        self.public.verify(
            &transaction_namespace(NAMESPACE),
            &Self::payload(&self.nonce, &self.instruction),
            &self.signature,
        )
    }
}

impl Write for Transaction {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
        self.instruction.write(writer);
        self.public.write(writer);
        self.signature.write(writer);
    }
}

impl Read for Transaction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            nonce: u64::read(reader)?,
            instruction: Instruction::read(reader)?,
            public: ed25519::PublicKey::read(reader)?,
            signature: ed25519::Signature::read(reader)?,
        })
    }
}

impl EncodeSize for Transaction {
    fn encode_size(&self) -> usize {
        self.nonce.encode_size()
            + self.instruction.encode_size()
            + self.public.encode_size()
            + self.signature.encode_size()
    }
}

/// State-mutating operations accepted by the session manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Create a new wagering session.
    /// Binary: [1] [kind:u8] [capacity:u8] [minWager:u64 BE]
    ///
    /// `kind` is carried raw so an out-of-range variant is rejected by the
    /// registry (a validation failure), not by the codec.
    CreateSession {
        kind: u8,
        capacity: u8,
        min_wager: u64,
    },

    /// Join a session, escrowing `contribution`.
    /// Binary: [2] [sessionId:u64 BE] [contribution:u64 BE] [intends:u8]
    Join {
        session_id: u64,
        contribution: u64,
        intends_to_join: bool,
    },

    /// Take a turn action in an active session.
    /// Binary: [3] [sessionId:u64 BE] [call:u8] [raise:u8] [fold:u8] [added:u64 BE]
    Act {
        session_id: u64,
        call: bool,
        raise: bool,
        fold: bool,
        added: u64,
    },

    /// Reveal a prefix of the caller's sealed hand.
    /// Binary: [4] [sessionId:u64 BE] [openedLen..] [opened...]
    Reveal { session_id: u64, opened: Vec<bool> },

    /// Tear a session down and refund all tracked contributions
    /// (administrator only).
    /// Binary: [5] [sessionId:u64 BE]
    EmergencyEnd { session_id: u64 },

    /// Transfer the balance held outside session pots to the administrator
    /// (administrator only).
    /// Binary: [6]
    Withdraw,
}

impl Write for Instruction {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::CreateSession {
                kind,
                capacity,
                min_wager,
            } => {
                1u8.write(writer);
                kind.write(writer);
                capacity.write(writer);
                min_wager.write(writer);
            }
            Self::Join {
                session_id,
                contribution,
                intends_to_join,
            } => {
                2u8.write(writer);
                session_id.write(writer);
                contribution.write(writer);
                intends_to_join.write(writer);
            }
            Self::Act {
                session_id,
                call,
                raise,
                fold,
                added,
            } => {
                3u8.write(writer);
                session_id.write(writer);
                call.write(writer);
                raise.write(writer);
                fold.write(writer);
                added.write(writer);
            }
            Self::Reveal { session_id, opened } => {
                4u8.write(writer);
                session_id.write(writer);
                opened.write(writer);
            }
            Self::EmergencyEnd { session_id } => {
                5u8.write(writer);
                session_id.write(writer);
            }
            Self::Withdraw => 6u8.write(writer),
        }
    }
}

impl Read for Instruction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let tag = u8::read(reader)?;
        match tag {
            1 => Ok(Self::CreateSession {
                kind: u8::read(reader)?,
                capacity: u8::read(reader)?,
                min_wager: u64::read(reader)?,
            }),
            2 => Ok(Self::Join {
                session_id: u64::read(reader)?,
                contribution: u64::read(reader)?,
                intends_to_join: bool::read(reader)?,
            }),
            3 => Ok(Self::Act {
                session_id: u64::read(reader)?,
                call: bool::read(reader)?,
                raise: bool::read(reader)?,
                fold: bool::read(reader)?,
                added: u64::read(reader)?,
            }),
            4 => Ok(Self::Reveal {
                session_id: u64::read(reader)?,
                opened: Vec::<bool>::read_range(reader, 0..=MAX_REVEAL_WIRE)?,
            }),
            5 => Ok(Self::EmergencyEnd {
                session_id: u64::read(reader)?,
            }),
            6 => Ok(Self::Withdraw),
            _ => Err(Error::InvalidEnum(tag)),
        }
    }
}

impl EncodeSize for Instruction {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::CreateSession {
                kind,
                capacity,
                min_wager,
            } => kind.encode_size() + capacity.encode_size() + min_wager.encode_size(),
            Self::Join {
                session_id,
                contribution,
                intends_to_join,
            } => {
                session_id.encode_size()
                    + contribution.encode_size()
                    + intends_to_join.encode_size()
            }
            Self::Act {
                session_id,
                call,
                raise,
                fold,
                added,
            } => {
                session_id.encode_size()
                    + call.encode_size()
                    + raise.encode_size()
                    + fold.encode_size()
                    + added.encode_size()
            }
            Self::Reveal { session_id, opened } => {
                session_id.encode_size() + opened.encode_size()
            }
            Self::EmergencyEnd { session_id } => session_id.encode_size(),
            Self::Withdraw => 0,
        }
    }
}

/// Records emitted by successful (and failed) operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    // Session lifecycle events (tags 10-16)
    SessionCreated {
        session_id: u64,
        creator: PublicKey,
        kind: GameKind,
        capacity: u8,
        min_wager: u64,
    },
    ParticipantJoined {
        session_id: u64,
        identity: PublicKey,
        ordinal: u8,
        contribution: u64,
        pot: u64,
    },
    SessionActivated {
        session_id: u64,
        participants: u8,
    },
    ActionTaken {
        session_id: u64,
        identity: PublicKey,
        action: TurnAction,
        added: u64,
        pot: u64,
    },
    HandRevealed {
        session_id: u64,
        identity: PublicKey,
        opened: u8,
    },
    /// Finalized with no winner; every tracked contribution was refunded.
    SessionClosed {
        session_id: u64,
        refunds: Vec<(PublicKey, u64)>,
    },
    Withdrawn {
        to: PublicKey,
        amount: u64,
    },

    // Failure event (tag 19)
    WagerFailed {
        identity: PublicKey,
        session_id: Option<u64>,
        code: u8,
        message: String,
    },
}

impl Write for Event {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::SessionCreated {
                session_id,
                creator,
                kind,
                capacity,
                min_wager,
            } => {
                10u8.write(writer);
                session_id.write(writer);
                creator.write(writer);
                kind.write(writer);
                capacity.write(writer);
                min_wager.write(writer);
            }
            Self::ParticipantJoined {
                session_id,
                identity,
                ordinal,
                contribution,
                pot,
            } => {
                11u8.write(writer);
                session_id.write(writer);
                identity.write(writer);
                ordinal.write(writer);
                contribution.write(writer);
                pot.write(writer);
            }
            Self::SessionActivated {
                session_id,
                participants,
            } => {
                12u8.write(writer);
                session_id.write(writer);
                participants.write(writer);
            }
            Self::ActionTaken {
                session_id,
                identity,
                action,
                added,
                pot,
            } => {
                13u8.write(writer);
                session_id.write(writer);
                identity.write(writer);
                action.write(writer);
                added.write(writer);
                pot.write(writer);
            }
            Self::HandRevealed {
                session_id,
                identity,
                opened,
            } => {
                14u8.write(writer);
                session_id.write(writer);
                identity.write(writer);
                opened.write(writer);
            }
            Self::SessionClosed {
                session_id,
                refunds,
            } => {
                15u8.write(writer);
                session_id.write(writer);
                refunds.write(writer);
            }
            Self::Withdrawn { to, amount } => {
                16u8.write(writer);
                to.write(writer);
                amount.write(writer);
            }
            Self::WagerFailed {
                identity,
                session_id,
                code,
                message,
            } => {
                19u8.write(writer);
                identity.write(writer);
                session_id.write(writer);
                code.write(writer);
                write_string(message, writer);
            }
        }
    }
}

impl Read for Event {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let tag = u8::read(reader)?;
        match tag {
            10 => Ok(Self::SessionCreated {
                session_id: u64::read(reader)?,
                creator: PublicKey::read(reader)?,
                kind: GameKind::read(reader)?,
                capacity: u8::read(reader)?,
                min_wager: u64::read(reader)?,
            }),
            11 => Ok(Self::ParticipantJoined {
                session_id: u64::read(reader)?,
                identity: PublicKey::read(reader)?,
                ordinal: u8::read(reader)?,
                contribution: u64::read(reader)?,
                pot: u64::read(reader)?,
            }),
            12 => Ok(Self::SessionActivated {
                session_id: u64::read(reader)?,
                participants: u8::read(reader)?,
            }),
            13 => Ok(Self::ActionTaken {
                session_id: u64::read(reader)?,
                identity: PublicKey::read(reader)?,
                action: TurnAction::read(reader)?,
                added: u64::read(reader)?,
                pot: u64::read(reader)?,
            }),
            14 => Ok(Self::HandRevealed {
                session_id: u64::read(reader)?,
                identity: PublicKey::read(reader)?,
                opened: u8::read(reader)?,
            }),
            15 => Ok(Self::SessionClosed {
                session_id: u64::read(reader)?,
                refunds: Vec::<(PublicKey, u64)>::read_range(
                    reader,
                    0..=MAX_CAPACITY as usize,
                )?,
            }),
            16 => Ok(Self::Withdrawn {
                to: PublicKey::read(reader)?,
                amount: u64::read(reader)?,
            }),
            19 => Ok(Self::WagerFailed {
                identity: PublicKey::read(reader)?,
                session_id: Option::<u64>::read(reader)?,
                code: u8::read(reader)?,
                message: read_string(reader, MAX_MESSAGE_LENGTH)?,
            }),
            _ => Err(Error::InvalidEnum(tag)),
        }
    }
}

impl EncodeSize for Event {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::SessionCreated {
                session_id,
                creator,
                kind,
                capacity,
                min_wager,
            } => {
                session_id.encode_size()
                    + creator.encode_size()
                    + kind.encode_size()
                    + capacity.encode_size()
                    + min_wager.encode_size()
            }
            Self::ParticipantJoined {
                session_id,
                identity,
                ordinal,
                contribution,
                pot,
            } => {
                session_id.encode_size()
                    + identity.encode_size()
                    + ordinal.encode_size()
                    + contribution.encode_size()
                    + pot.encode_size()
            }
            Self::SessionActivated {
                session_id,
                participants,
            } => session_id.encode_size() + participants.encode_size(),
            Self::ActionTaken {
                session_id,
                identity,
                action,
                added,
                pot,
            } => {
                session_id.encode_size()
                    + identity.encode_size()
                    + action.encode_size()
                    + added.encode_size()
                    + pot.encode_size()
            }
            Self::HandRevealed {
                session_id,
                identity,
                opened,
            } => session_id.encode_size() + identity.encode_size() + opened.encode_size(),
            Self::SessionClosed {
                session_id,
                refunds,
            } => session_id.encode_size() + refunds.encode_size(),
            Self::Withdrawn { to, amount } => to.encode_size() + amount.encode_size(),
            Self::WagerFailed {
                identity,
                session_id,
                code,
                message,
            } => {
                identity.encode_size()
                    + session_id.encode_size()
                    + code.encode_size()
                    + string_encode_size(message)
            }
        }
    }
}

/// Addresses of persisted state.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Account(PublicKey),
    Registry,
    Ledger,
    Session(u64),
    Participant(u64, PublicKey),
    Sealed(SealedRef),
}

impl Write for Key {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(public) => {
                0u8.write(writer);
                public.write(writer);
            }
            Self::Registry => 1u8.write(writer),
            Self::Ledger => 2u8.write(writer),
            Self::Session(id) => {
                3u8.write(writer);
                id.write(writer);
            }
            Self::Participant(id, public) => {
                4u8.write(writer);
                id.write(writer);
                public.write(writer);
            }
            Self::Sealed(r) => {
                5u8.write(writer);
                r.write(writer);
            }
        }
    }
}

impl Read for Key {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let tag = u8::read(reader)?;
        match tag {
            0 => Ok(Self::Account(PublicKey::read(reader)?)),
            1 => Ok(Self::Registry),
            2 => Ok(Self::Ledger),
            3 => Ok(Self::Session(u64::read(reader)?)),
            4 => Ok(Self::Participant(u64::read(reader)?, PublicKey::read(reader)?)),
            5 => Ok(Self::Sealed(SealedRef::read(reader)?)),
            _ => Err(Error::InvalidEnum(tag)),
        }
    }
}

impl EncodeSize for Key {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Account(public) => public.encode_size(),
            Self::Registry | Self::Ledger => 0,
            Self::Session(id) => id.encode_size(),
            Self::Participant(id, public) => id.encode_size() + public.encode_size(),
            Self::Sealed(r) => r.encode_size(),
        }
    }
}

/// Persisted state values, tagged in lockstep with [`Key`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Value {
    Account(Account),
    Registry(RegistryState),
    Ledger(LedgerState),
    Session(Session),
    Participant(Participant),
    Sealed(CapabilitySet),
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(account) => {
                0u8.write(writer);
                account.write(writer);
            }
            Self::Registry(registry) => {
                1u8.write(writer);
                registry.write(writer);
            }
            Self::Ledger(ledger) => {
                2u8.write(writer);
                ledger.write(writer);
            }
            Self::Session(session) => {
                3u8.write(writer);
                session.write(writer);
            }
            Self::Participant(participant) => {
                4u8.write(writer);
                participant.write(writer);
            }
            Self::Sealed(caps) => {
                5u8.write(writer);
                caps.write(writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let tag = u8::read(reader)?;
        match tag {
            0 => Ok(Self::Account(Account::read(reader)?)),
            1 => Ok(Self::Registry(RegistryState::read(reader)?)),
            2 => Ok(Self::Ledger(LedgerState::read(reader)?)),
            3 => Ok(Self::Session(Session::read(reader)?)),
            4 => Ok(Self::Participant(Participant::read(reader)?)),
            5 => Ok(Self::Sealed(CapabilitySet::read(reader)?)),
            _ => Err(Error::InvalidEnum(tag)),
        }
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Account(account) => account.encode_size(),
            Self::Registry(registry) => registry.encode_size(),
            Self::Ledger(ledger) => ledger.encode_size(),
            Self::Session(session) => session.encode_size(),
            Self::Participant(participant) => participant.encode_size(),
            Self::Sealed(caps) => caps.encode_size(),
        }
    }
}

/// Ordered record of everything a batch produced.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Output {
    Event(Event),
    Transaction(Transaction),
}

impl Write for Output {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Event(event) => {
                0u8.write(writer);
                event.write(writer);
            }
            Self::Transaction(transaction) => {
                1u8.write(writer);
                transaction.write(writer);
            }
        }
    }
}

impl Read for Output {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let tag = u8::read(reader)?;
        match tag {
            0 => Ok(Self::Event(Event::read(reader)?)),
            1 => Ok(Self::Transaction(Transaction::read(reader)?)),
            _ => Err(Error::InvalidEnum(tag)),
        }
    }
}

impl EncodeSize for Output {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Event(event) => event.encode_size(),
            Self::Transaction(transaction) => transaction.encode_size(),
        }
    }
}
