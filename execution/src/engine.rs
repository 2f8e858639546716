use thiserror::Error as ThisError;
use veiltable_types::wager::{SealedRef, Subject};

#[cfg(any(test, feature = "mocks"))]
use std::collections::HashMap;

/// Combinators the external engine supports over sealed values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SealedOp {
    Add,
    Sub,
    Compare,
    Select,
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown sealed reference {0}")]
    UnknownRef(u64),
}

/// The sealed-value computation engine (out of scope for this crate; see the
/// mock below for the test-time stand-in).
///
/// The manager never inspects plaintext behind a [`SealedRef`]; it creates,
/// combines, and grants through this interface only. Sealed values are
/// immutable: combining two refs yields a fresh ref.
pub trait SealedEngine {
    fn seal(&mut self, plain: u64) -> SealedRef;
    fn combine(&mut self, op: SealedOp, a: SealedRef, b: SealedRef)
        -> Result<SealedRef, EngineError>;
    fn grant_compute(&mut self, reference: SealedRef, subject: &Subject);
    fn grant_read(&mut self, reference: SealedRef, subject: &Subject);
    fn grant_transient_read(&mut self, reference: SealedRef, subject: &Subject);
}

/// In-memory engine that stores plaintexts so tests can assert on what was
/// sealed. Grants are recorded but not enforced here; enforcement lives in
/// the manager's capability table.
#[cfg(any(test, feature = "mocks"))]
#[derive(Default)]
pub struct MockEngine {
    next: u64,
    plaintexts: HashMap<u64, u64>,
    grants: Vec<(u64, Subject, &'static str)>,
}

#[cfg(any(test, feature = "mocks"))]
impl MockEngine {
    pub fn plaintext(&self, reference: SealedRef) -> Option<u64> {
        self.plaintexts.get(&reference.raw()).copied()
    }

    pub fn grant_count(&self, reference: SealedRef) -> usize {
        self.grants.iter().filter(|(r, _, _)| *r == reference.raw()).count()
    }

    pub fn sealed_count(&self) -> usize {
        self.plaintexts.len()
    }
}

#[cfg(any(test, feature = "mocks"))]
impl SealedEngine for MockEngine {
    fn seal(&mut self, plain: u64) -> SealedRef {
        self.next += 1;
        self.plaintexts.insert(self.next, plain);
        SealedRef::new(self.next)
    }

    fn combine(
        &mut self,
        op: SealedOp,
        a: SealedRef,
        b: SealedRef,
    ) -> Result<SealedRef, EngineError> {
        let lhs = *self
            .plaintexts
            .get(&a.raw())
            .ok_or(EngineError::UnknownRef(a.raw()))?;
        let rhs = *self
            .plaintexts
            .get(&b.raw())
            .ok_or(EngineError::UnknownRef(b.raw()))?;
        let result = match op {
            SealedOp::Add => lhs.saturating_add(rhs),
            SealedOp::Sub => lhs.saturating_sub(rhs),
            SealedOp::Compare => u64::from(lhs > rhs),
            SealedOp::Select => {
                if lhs > 0 {
                    rhs
                } else {
                    0
                }
            }
        };
        Ok(self.seal(result))
    }

    fn grant_compute(&mut self, reference: SealedRef, subject: &Subject) {
        self.grants.push((reference.raw(), subject.clone(), "compute"));
    }

    fn grant_read(&mut self, reference: SealedRef, subject: &Subject) {
        self.grants.push((reference.raw(), subject.clone(), "read"));
    }

    fn grant_transient_read(&mut self, reference: SealedRef, subject: &Subject) {
        self.grants.push((reference.raw(), subject.clone(), "transient"));
    }
}
