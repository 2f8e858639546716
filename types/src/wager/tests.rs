use super::*;
use commonware_codec::{Encode, ReadExt, Write};
use commonware_cryptography::{ed25519::PrivateKey, PrivateKeyExt, Signer};
use rand::{rngs::StdRng, SeedableRng};

fn test_identity(seed: u64) -> commonware_cryptography::ed25519::PublicKey {
    let mut rng = StdRng::seed_from_u64(seed);
    PrivateKey::from_rng(&mut rng).public_key()
}

#[test]
fn test_game_kind_rejects_unknown_tag() {
    assert!(GameKind::try_from(3).is_err());
    let encoded = vec![9u8];
    assert!(GameKind::read(&mut &encoded[..]).is_err());
}

#[test]
fn test_phase_is_ordered_open_active_closed() {
    assert_eq!(Phase::try_from(0), Ok(Phase::Open));
    assert_eq!(Phase::try_from(1), Ok(Phase::Active));
    assert_eq!(Phase::try_from(2), Ok(Phase::Closed));
    assert!(Phase::try_from(3).is_err());
}

#[test]
fn test_session_roundtrip() {
    let mut session = Session::new(7, GameKind::Draw, 4, 10, 100);
    session.pot = 20;
    session.phase = Phase::Active;
    session.participants.push(test_identity(1));
    session.participants.push(test_identity(2));
    session.validate_invariants().expect("valid invariants");

    let encoded = session.encode();
    let decoded = Session::read(&mut &encoded[..]).unwrap();
    assert_eq!(session, decoded);
}

#[test]
fn test_session_validate_rejects_capacity_out_of_range() {
    let session = Session::new(1, GameKind::Draw, 9, 10, 0);
    assert!(matches!(
        session.validate_invariants(),
        Err(SessionInvariantError::CapacityOutOfRange { .. })
    ));
}

#[test]
fn test_session_validate_rejects_duplicate_participant() {
    let mut session = Session::new(1, GameKind::Draw, 4, 10, 0);
    let identity = test_identity(1);
    session.participants.push(identity.clone());
    session.participants.push(identity);
    assert!(matches!(
        session.validate_invariants(),
        Err(SessionInvariantError::DuplicateParticipant)
    ));
}

#[test]
fn test_participant_roundtrip() {
    let mut participant = Participant::new(
        3,
        test_identity(5),
        1,
        25,
        SealedRef::new(11),
        SealedRef::new(12),
    );
    participant.sealed_hand = vec![SealedRef::new(13), SealedRef::new(14)];
    participant.opened = vec![true, false];
    participant.actions.push(ActionRecord {
        action: TurnAction::Raise,
        added: 15,
    });

    let encoded = participant.encode();
    let decoded = Participant::read(&mut &encoded[..]).unwrap();
    assert_eq!(participant, decoded);
}

#[test]
fn test_capability_set_carries_mandatory_grants() {
    let reader = test_identity(1);
    let caps = CapabilitySet::sealed_by_manager(reader.clone());

    assert_eq!(caps.grants().len(), 2);
    assert!(caps.allows_read(&Subject::Manager));
    assert!(caps.allows_read(&Subject::Party(reader)));
    assert!(!caps.allows_read(&Subject::Party(test_identity(2))));
}

#[test]
fn test_capability_set_transient_grant_and_revoke() {
    let mut caps = CapabilitySet::sealed_by_manager(test_identity(1));
    let auditor = Subject::Party(test_identity(2));

    caps.insert(auditor.clone(), CapabilityKind::TransientReadGrant);
    assert!(caps.allows_read(&auditor));

    assert!(caps.revoke_transient(&auditor));
    assert!(!caps.allows_read(&auditor));
    // Revoking again reports nothing held.
    assert!(!caps.revoke_transient(&auditor));
    // Mandatory grants survive.
    assert!(caps.allows_read(&Subject::Manager));
}

#[test]
fn test_capability_set_insert_is_idempotent() {
    let mut caps = CapabilitySet::sealed_by_manager(test_identity(1));
    let auditor = Subject::Party(test_identity(2));

    caps.insert(auditor.clone(), CapabilityKind::ReadGrant);
    caps.insert(auditor, CapabilityKind::ReadGrant);
    assert_eq!(caps.grants().len(), 3);
}

#[test]
fn test_capability_set_decode_rejects_missing_mandatory_grants() {
    // A single-grant set can never be produced by the constructor; the codec
    // refuses to resurrect one.
    let caps = CapabilitySet::sealed_by_manager(test_identity(1));
    let encoded = caps.encode();
    assert!(CapabilitySet::read(&mut &encoded[..]).is_ok());

    let single = vec![caps.grants()[0].clone()];
    let mut bad = Vec::new();
    single.write(&mut bad);
    assert!(CapabilitySet::read(&mut &bad[..]).is_err());
}
