mod common;

use std::time::Duration;

use common::Harness;
use sonnda_auth::gate::roles;
use sonnda_auth::prelude::*;

const RECORD_42: PatientId = PatientId::new(42);

struct Cast {
    patient: ActorContext,
    doctor: ActorContext,
    admin: ActorContext,
}

/// Registers one identity per role; the patient owns record 42.
async fn cast(h: &Harness) -> Cast {
    let patient = h.register("ana@example.com", Role::Patient).await;
    h.register("dr.house@example.com", Role::Doctor).await;
    h.register("admin@example.com", Role::Admin).await;
    h.storage.register_patient(RECORD_42, patient.id);

    Cast {
        patient: h.actor("ana@example.com").await,
        doctor: h.actor("dr.house@example.com").await,
        admin: h.actor("admin@example.com").await,
    }
}

fn is_forbidden(result: AuthResult<()>) -> bool {
    matches!(result, Err(AuthError::Forbidden { .. }))
}

#[tokio::test]
async fn authenticate_rejects_bad_tokens_uniformly() {
    let h = Harness::new();
    h.register("ana@example.com", Role::Patient).await;
    let token = h
        .credentials
        .login(&h.tokens, "ana@example.com", "password1")
        .await
        .unwrap()
        .access_token;

    let mut tampered = token.clone();
    let last = tampered.pop().unwrap();
    tampered.push(if last == 'A' { 'Q' } else { 'A' });

    for bad in ["", "garbage", tampered.as_str()] {
        let err = h.gate.authenticate(bad).unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated { .. }));
        assert_eq!(err.to_string(), "Unauthenticated: invalid or expired session token");
    }

    h.clock.advance(Duration::from_secs(24 * 3600));
    assert!(matches!(
        h.gate.authenticate(&token).unwrap_err(),
        AuthError::Unauthenticated { .. }
    ));
}

#[tokio::test]
async fn authenticate_header_requires_bearer_scheme() {
    let h = Harness::new();
    let ana = h.register("ana@example.com", Role::Patient).await;
    let token = h.tokens.issue(&ana).unwrap();

    let actor = h
        .gate
        .authenticate_header(Some(&format!("Bearer {token}")))
        .unwrap();
    assert_eq!(actor.identity_id, ana.id);
    assert_eq!(actor.role, Role::Patient);

    for header in [None, Some("Bearer "), Some(token.as_str())] {
        assert!(matches!(
            h.gate.authenticate_header(header).unwrap_err(),
            AuthError::Unauthenticated { .. }
        ));
    }
}

#[tokio::test]
async fn required_roles_are_enforced() {
    let h = Harness::new();
    let cast = cast(&h).await;

    assert!(h.gate.authorize(&cast.patient, roles::ANY, None).await.is_ok());
    assert!(is_forbidden(
        h.gate.authorize(&cast.patient, roles::DOCTOR_OR_ADMIN, None).await
    ));
    assert!(h.gate.authorize(&cast.doctor, roles::DOCTOR_OR_ADMIN, None).await.is_ok());
    assert!(is_forbidden(h.gate.authorize(&cast.doctor, roles::ADMIN, None).await));
    assert!(h.gate.authorize(&cast.admin, roles::ADMIN, None).await.is_ok());
}

#[tokio::test]
async fn patients_reach_only_their_own_record() {
    let h = Harness::new();
    let cast = cast(&h).await;
    let other = h.register("bia@example.com", Role::Patient).await;
    h.storage.register_patient(PatientId::new(43), other.id);

    assert!(h.gate.authorize(&cast.patient, roles::PATIENT, Some(RECORD_42)).await.is_ok());
    assert!(is_forbidden(
        h.gate.authorize(&cast.patient, roles::PATIENT, Some(PatientId::new(43))).await
    ));
    // Unknown records have no owner.
    assert!(is_forbidden(
        h.gate.authorize(&cast.patient, roles::ANY, Some(PatientId::new(999))).await
    ));
}

#[tokio::test]
async fn admins_bypass_ownership_and_grants() {
    let h = Harness::new();
    let cast = cast(&h).await;
    assert!(h.gate.authorize(&cast.admin, roles::ANY, Some(RECORD_42)).await.is_ok());
    assert!(
        h.gate
            .authorize(&cast.admin, roles::DOCTOR_OR_ADMIN, Some(RECORD_42))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn doctors_follow_the_grant_lifecycle() {
    let h = Harness::new();
    let cast = cast(&h).await;
    let doctor = cast.doctor.identity_id;
    let check = || h.gate.authorize(&cast.doctor, roles::DOCTOR, Some(RECORD_42));

    assert!(is_forbidden(check().await), "no grant");

    let grant = h.ledger.request_access(doctor, RECORD_42, h.now()).await.unwrap();
    assert!(is_forbidden(check().await), "pending");

    h.ledger.approve(grant.id, cast.admin.identity_id, h.now()).await.unwrap();
    assert!(check().await.is_ok(), "approved");

    h.ledger
        .revoke(grant.id, cast.patient.identity_id, Some("second opinion done"), h.now())
        .await
        .unwrap();
    assert!(is_forbidden(check().await), "revoked");
}

#[tokio::test]
async fn doctor_access_ends_when_approval_window_elapses() {
    let h = Harness::new();
    let cast = cast(&h).await;
    let grant = h
        .ledger
        .request_access(cast.doctor.identity_id, RECORD_42, h.now())
        .await
        .unwrap();
    h.ledger.approve(grant.id, cast.admin.identity_id, h.now()).await.unwrap();

    assert!(h.gate.authorize(&cast.doctor, roles::DOCTOR, Some(RECORD_42)).await.is_ok());

    // The test configuration uses a one-hour approval window.
    h.clock.advance(Duration::from_secs(3600));
    assert!(is_forbidden(
        h.gate.authorize(&cast.doctor, roles::DOCTOR, Some(RECORD_42)).await
    ));
}

#[tokio::test]
async fn doctors_reach_their_own_record_without_a_grant() {
    let h = Harness::new();
    let cast = cast(&h).await;
    h.storage
        .register_patient(PatientId::new(77), cast.doctor.identity_id);

    assert!(
        h.gate
            .authorize(&cast.doctor, roles::ANY, Some(PatientId::new(77)))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn authorize_never_mutates_the_ledger() {
    let h = Harness::new();
    let cast = cast(&h).await;
    let grant = h
        .ledger
        .request_access(cast.doctor.identity_id, RECORD_42, h.now())
        .await
        .unwrap();
    h.ledger.approve(grant.id, cast.admin.identity_id, h.now()).await.unwrap();
    h.clock.advance(Duration::from_secs(2 * 3600));

    for _ in 0..3 {
        let _ = h.gate.authorize(&cast.doctor, roles::DOCTOR, Some(RECORD_42)).await;
    }

    let stored = h.ledger.grant(grant.id).await.unwrap();
    assert_eq!(stored.grant.status, GrantStatus::Approved);
    assert_eq!(stored.effective_status, GrantStatus::Expired);
    assert_eq!(h.ledger.history(grant.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn grant_changes_need_authority() {
    let h = Harness::new();
    let cast = cast(&h).await;
    let stranger = {
        h.register("dr.wilson@example.com", Role::Doctor).await;
        h.actor("dr.wilson@example.com").await
    };
    let grant = h
        .ledger
        .request_access(cast.doctor.identity_id, RECORD_42, h.now())
        .await
        .unwrap();

    // Approvals: admin or record owner only.
    for actor in [&cast.admin, &cast.patient] {
        assert!(
            h.gate
                .authorize_grant_change(actor, &grant, GrantAction::Approve)
                .await
                .is_ok()
        );
    }
    for actor in [&cast.doctor, &stranger] {
        assert!(is_forbidden(
            h.gate
                .authorize_grant_change(actor, &grant, GrantAction::Approve)
                .await
        ));
    }

    // Revocations: the grantee may also withdraw.
    for actor in [&cast.admin, &cast.patient, &cast.doctor] {
        assert!(
            h.gate
                .authorize_grant_change(actor, &grant, GrantAction::Revoke)
                .await
                .is_ok()
        );
    }
    assert!(is_forbidden(
        h.gate
            .authorize_grant_change(&stranger, &grant, GrantAction::Revoke)
            .await
    ));
}

#[tokio::test]
async fn end_to_end_access_workflow() {
    let h = Harness::new();

    // 1. Register a patient with record 42, a doctor and an admin.
    let u = h.register("u@example.com", Role::Patient).await;
    h.storage.register_patient(RECORD_42, u.id);
    let d = h.register("d@example.com", Role::Doctor).await;
    let a = h.register("a@example.com", Role::Admin).await;

    // 2. The doctor logs in and is refused.
    let doctor = h.actor("d@example.com").await;
    assert_eq!(doctor.identity_id, d.id);
    assert!(is_forbidden(
        h.gate.authorize(&doctor, roles::DOCTOR, Some(RECORD_42)).await
    ));

    // 3. Access is requested and approved by the admin.
    let grant = h.ledger.request_access(d.id, RECORD_42, h.now()).await.unwrap();
    let admin = h.actor("a@example.com").await;
    h.gate
        .authorize_grant_change(&admin, &grant, GrantAction::Approve)
        .await
        .unwrap();
    h.ledger.approve(grant.id, a.id, h.now()).await.unwrap();

    // 4. The doctor is now allowed.
    assert!(h.gate.authorize(&doctor, roles::DOCTOR, Some(RECORD_42)).await.is_ok());

    // 5. The admin revokes the grant.
    h.clock.advance(Duration::from_secs(60));
    h.ledger
        .revoke(grant.id, a.id, Some("audit"), h.now())
        .await
        .unwrap();

    // 6. The doctor is refused again.
    assert!(is_forbidden(
        h.gate.authorize(&doctor, roles::DOCTOR, Some(RECORD_42)).await
    ));

    // 7. The history tells the whole story.
    let history = h.ledger.history(grant.id).await.unwrap();
    let transitions: Vec<_> = history
        .iter()
        .map(|e| (e.old_status, e.new_status, e.changed_by, e.reason.as_deref()))
        .collect();
    assert_eq!(
        transitions,
        vec![
            (GrantStatus::Pending, GrantStatus::Approved, a.id, None),
            (GrantStatus::Approved, GrantStatus::Revoked, a.id, Some("audit")),
        ]
    );
}

#[tokio::test]
async fn out_of_range_approval_window_never_lapses() {
    let mut config = common::test_config();
    config.ledger.approval_ttl = Some(Duration::from_secs(20_000 * 365 * 86_400));
    let h = Harness::with_config(config);
    let cast = cast(&h).await;

    let grant = h
        .ledger
        .request_access(cast.doctor.identity_id, RECORD_42, h.now())
        .await
        .unwrap();
    h.ledger.approve(grant.id, cast.admin.identity_id, h.now()).await.unwrap();

    h.clock.advance(Duration::from_secs(50 * 365 * 86_400));
    assert!(h.gate.authorize(&cast.doctor, roles::DOCTOR, Some(RECORD_42)).await.is_ok());

    let revoked = h
        .ledger
        .revoke(grant.id, cast.admin.identity_id, None, h.now())
        .await
        .unwrap();
    assert_eq!(revoked.status, GrantStatus::Revoked);
}
