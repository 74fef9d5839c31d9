use super::common::*;
use crate::billing::{RepeatSettlementPolicy, SettlementError, SettlementService};
use crate::domain::{
    AuditAction, OrganizationId, PaymentId, PaymentStatus, StateConflict,
};
use crate::store::{PropertyStore, TenantFilter};
use std::sync::Arc;

#[test]
fn pending_payment_settles_with_the_supplied_instant() {
    let (service, store, audit) = build_service(RepeatSettlementPolicy::Strict);
    let payment_id = seed_payment(&store, "pay-1", PaymentStatus::Pending);
    let organization = OrganizationId::from("org-a");
    let when = instant(2026, 9, 3);

    let settled = service
        .mark_paid(&payment_id, &organization, Some(when), Some("user-3"))
        .expect("settlement succeeds");

    assert_eq!(settled.status, PaymentStatus::Paid);
    assert_eq!(settled.paid_at, Some(when));

    let stored = store
        .payment(
            &payment_id,
            &TenantFilter::for_organization(organization.clone()),
        )
        .expect("read")
        .expect("present");
    assert_eq!(stored.status, PaymentStatus::Paid);
    assert_eq!(stored.paid_at, Some(when));

    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::PaymentMarkPaid);
    assert_eq!(events[0].entity_id, payment_id.0);
    assert_eq!(events[0].user_id.as_deref(), Some("user-3"));
}

#[test]
fn settlement_defaults_paid_at_to_now() {
    let (service, store, _) = build_service(RepeatSettlementPolicy::Strict);
    let payment_id = seed_payment(&store, "pay-1", PaymentStatus::Pending);

    let settled = service
        .mark_paid(&payment_id, &OrganizationId::from("org-a"), None, None)
        .expect("settlement succeeds");

    assert!(settled.paid_at.is_some(), "paid_at stamped on settlement");
}

#[test]
fn overdue_payments_are_still_settleable() {
    let (service, store, _) = build_service(RepeatSettlementPolicy::Strict);
    let payment_id = seed_payment(&store, "pay-1", PaymentStatus::Overdue);

    let settled = service
        .mark_paid(&payment_id, &OrganizationId::from("org-a"), None, None)
        .expect("overdue settles");
    assert_eq!(settled.status, PaymentStatus::Paid);
}

#[test]
fn canceled_and_partial_rows_always_conflict() {
    for status in [PaymentStatus::Canceled, PaymentStatus::Partial] {
        for policy in [
            RepeatSettlementPolicy::Strict,
            RepeatSettlementPolicy::Idempotent,
        ] {
            let (service, store, _) = build_service(policy);
            let payment_id = seed_payment(&store, "pay-1", status);

            match service.mark_paid(&payment_id, &OrganizationId::from("org-a"), None, None) {
                Err(SettlementError::Conflict(StateConflict::PaymentNotSettleable {
                    status: seen,
                    ..
                })) => assert_eq!(seen, status),
                other => panic!("expected conflict for {status:?} under {policy:?}, got {other:?}"),
            }
        }
    }
}

#[test]
fn strict_policy_rejects_repeat_settlement() {
    let (service, store, _) = build_service(RepeatSettlementPolicy::Strict);
    let payment_id = seed_payment(&store, "pay-1", PaymentStatus::Paid);

    match service.mark_paid(&payment_id, &OrganizationId::from("org-a"), None, None) {
        Err(SettlementError::Conflict(conflict)) => {
            assert_eq!(conflict.kind().code(), "PAYMENT_STATUS_INVALID_FOR_MARK_PAID");
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test]
fn idempotent_policy_returns_the_stored_row_untouched() {
    let (service, store, audit) = build_service(RepeatSettlementPolicy::Idempotent);
    let payment_id = seed_payment(&store, "pay-1", PaymentStatus::Paid);
    let original = store
        .payment(
            &payment_id,
            &TenantFilter::for_organization(OrganizationId::from("org-a")),
        )
        .expect("read")
        .expect("present");

    let replay = service
        .mark_paid(
            &payment_id,
            &OrganizationId::from("org-a"),
            Some(instant(2026, 12, 24)),
            None,
        )
        .expect("idempotent replay succeeds");

    // The original settlement instant survives the replay.
    assert_eq!(replay.paid_at, original.paid_at);
    assert!(
        audit.events().is_empty(),
        "a no-op replay is not an audit fact"
    );
}

#[test]
fn foreign_payments_are_hidden_behind_not_found() {
    let (service, store, _) = build_service(RepeatSettlementPolicy::Strict);
    let payment_id = seed_payment(&store, "pay-1", PaymentStatus::Pending);

    match service.mark_paid(&payment_id, &OrganizationId::from("org-b"), None, None) {
        Err(SettlementError::NotFound { id, .. }) => assert_eq!(id, payment_id.0),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn missing_payment_is_not_found() {
    let (service, _, _) = build_service(RepeatSettlementPolicy::Strict);

    match service.mark_paid(
        &PaymentId::from("pay-unknown"),
        &OrganizationId::from("org-a"),
        None,
        None,
    ) {
        Err(SettlementError::NotFound { .. }) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn audit_failure_never_unsettles_the_payment() {
    let store = Arc::new(crate::store::memory::MemoryStore::new());
    let payment_id = seed_payment(&store, "pay-1", PaymentStatus::Pending);
    let service = SettlementService::new(
        store.clone(),
        Arc::new(RefusingAuditSink),
        RepeatSettlementPolicy::Strict,
    );

    let settled = service
        .mark_paid(&payment_id, &OrganizationId::from("org-a"), None, None)
        .expect("settlement survives audit outage");
    assert_eq!(settled.status, PaymentStatus::Paid);

    let stored = store
        .payment(
            &payment_id,
            &TenantFilter::for_organization(OrganizationId::from("org-a")),
        )
        .expect("read")
        .expect("present");
    assert_eq!(stored.status, PaymentStatus::Paid);
}
