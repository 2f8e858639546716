use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::ed25519::PublicKey;

use super::MAX_GRANTS;

/// Opaque handle to a sealed value held by the external engine.
///
/// The manager never sees the plaintext behind a handle; it only creates,
/// combines, and grants/reads through the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SealedRef(u64);

impl SealedRef {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Write for SealedRef {
    fn write(&self, writer: &mut impl BufMut) {
        self.0.write(writer);
    }
}

impl Read for SealedRef {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self(u64::read(reader)?))
    }
}

impl FixedSize for SealedRef {
    const SIZE: usize = u64::SIZE;
}

/// A party that may hold capabilities over a sealed value.
///
/// `Manager` is the session manager itself; every sealed value the system
/// creates carries exactly one `ComputeOwner` grant for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Subject {
    Manager,
    Party(PublicKey),
}

impl Write for Subject {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Manager => 0u8.write(writer),
            Self::Party(public) => {
                1u8.write(writer);
                public.write(writer);
            }
        }
    }
}

impl Read for Subject {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Self::Manager),
            1 => Ok(Self::Party(PublicKey::read(reader)?)),
            _ => Err(Error::InvalidEnum(kind)),
        }
    }
}

impl EncodeSize for Subject {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Manager => 0,
            Self::Party(public) => public.encode_size(),
        }
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapabilityKind {
    ComputeOwner = 0,
    ReadGrant = 1,
    TransientReadGrant = 2,
}

impl TryFrom<u8> for CapabilityKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CapabilityKind::ComputeOwner),
            1 => Ok(CapabilityKind::ReadGrant),
            2 => Ok(CapabilityKind::TransientReadGrant),
            _ => Err(()),
        }
    }
}

impl Write for CapabilityKind {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for CapabilityKind {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        CapabilityKind::try_from(value).map_err(|_| Error::InvalidEnum(value))
    }
}

impl FixedSize for CapabilityKind {
    const SIZE: usize = 1;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilityGrant {
    pub subject: Subject,
    pub kind: CapabilityKind,
}

impl Write for CapabilityGrant {
    fn write(&self, writer: &mut impl BufMut) {
        self.subject.write(writer);
        self.kind.write(writer);
    }
}

impl Read for CapabilityGrant {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            subject: Subject::read(reader)?,
            kind: CapabilityKind::read(reader)?,
        })
    }
}

impl EncodeSize for CapabilityGrant {
    fn encode_size(&self) -> usize {
        self.subject.encode_size() + self.kind.encode_size()
    }
}

/// The capability table entry for one sealed value.
///
/// There is no way to build a set without its mandatory grants: construction
/// goes through [`CapabilitySet::sealed_by_manager`], which applies the
/// manager's `ComputeOwner` grant and the contributing participant's
/// `ReadGrant` in the same step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilitySet {
    grants: Vec<CapabilityGrant>,
}

impl CapabilitySet {
    pub fn sealed_by_manager(reader: PublicKey) -> Self {
        Self {
            grants: vec![
                CapabilityGrant {
                    subject: Subject::Manager,
                    kind: CapabilityKind::ComputeOwner,
                },
                CapabilityGrant {
                    subject: Subject::Party(reader),
                    kind: CapabilityKind::ReadGrant,
                },
            ],
        }
    }

    pub fn grants(&self) -> &[CapabilityGrant] {
        &self.grants
    }

    /// Record a grant. Duplicate `(subject, kind)` pairs are ignored.
    pub fn insert(&mut self, subject: Subject, kind: CapabilityKind) {
        if self
            .grants
            .iter()
            .any(|g| g.subject == subject && g.kind == kind)
        {
            return;
        }
        self.grants.push(CapabilityGrant { subject, kind });
    }

    /// Remove a transient read grant. Returns whether one was held.
    pub fn revoke_transient(&mut self, subject: &Subject) -> bool {
        let before = self.grants.len();
        self.grants.retain(|g| {
            !(g.kind == CapabilityKind::TransientReadGrant && g.subject == *subject)
        });
        self.grants.len() != before
    }

    pub fn allows_read(&self, subject: &Subject) -> bool {
        self.grants.iter().any(|g| g.subject == *subject)
    }
}

impl Write for CapabilitySet {
    fn write(&self, writer: &mut impl BufMut) {
        self.grants.write(writer);
    }
}

impl Read for CapabilitySet {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let grants = Vec::<CapabilityGrant>::read_range(reader, 0..=MAX_GRANTS)?;
        // The mandatory compute-owner and read grants are applied at creation
        // and never revoked, so any persisted set has at least two entries.
        if grants.len() < 2 {
            return Err(Error::Invalid("CapabilitySet", "missing mandatory grants"));
        }
        Ok(Self { grants })
    }
}

impl EncodeSize for CapabilitySet {
    fn encode_size(&self) -> usize {
        self.grants.encode_size()
    }
}
