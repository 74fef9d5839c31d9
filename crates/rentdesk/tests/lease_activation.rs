mod support;

use std::sync::{Arc, Barrier};
use std::thread;

use rentdesk::domain::{
    AuditAction, LeaseStatus, OrganizationId, PaymentKind, PaymentStatus, StateConflict,
    UnitStatus,
};
use rentdesk::leasing::LeasingError;
use rentdesk::store::{PropertyStore, TenantFilter};
use support::*;

#[test]
fn activation_walkthrough_matches_the_contract() {
    let core = build_core();
    let organization = OrganizationId::from("org-a");
    let start = date(2026, 9, 1);
    let lease = pending_lease(&core, "org-a", 5000, Some(5000), start, None);

    let activation = core
        .leases
        .activate(&lease.id, &organization, Some("manager-1"))
        .expect("first activation wins");

    assert_eq!(activation.lease.status, LeaseStatus::Active);
    assert_eq!(activation.unit.status, UnitStatus::Occupied);
    assert_eq!(activation.payments.len(), 2);

    let deposit = activation
        .payments
        .iter()
        .find(|p| p.kind == PaymentKind::Deposit)
        .expect("deposit raised");
    assert_eq!((deposit.amount, deposit.due_date), (5000, start));
    let rent = activation
        .payments
        .iter()
        .find(|p| p.kind == PaymentKind::Rent)
        .expect("rent raised");
    assert_eq!((rent.amount, rent.due_date), (5000, start));

    // A second attempt, even by the same caller, is always a conflict.
    match core.leases.activate(&lease.id, &organization, None) {
        Err(LeasingError::Conflict(conflict)) => {
            assert_eq!(conflict.kind().code(), "LEASE_ALREADY_ACTIVE");
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    let filter = TenantFilter::for_organization(organization);
    let facts = core.store.audit_entries(&filter).expect("audit entries");
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].action, AuditAction::LeaseActivated);
    assert_eq!(facts[0].user_id.as_deref(), Some("manager-1"));
}

#[test]
fn concurrent_activation_has_exactly_one_winner() {
    const ATTEMPTS: usize = 8;

    let core = build_core();
    let organization = OrganizationId::from("org-a");
    let lease = pending_lease(&core, "org-a", 5000, Some(5000), date(2026, 9, 1), None);

    let barrier = Arc::new(Barrier::new(ATTEMPTS));
    let handles: Vec<_> = (0..ATTEMPTS)
        .map(|_| {
            let service = core.leases.clone();
            let barrier = barrier.clone();
            let lease_id = lease.id.clone();
            let organization = organization.clone();
            thread::spawn(move || {
                barrier.wait();
                service.activate(&lease_id, &organization, None)
            })
        })
        .collect();

    let mut wins = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.join().expect("activation thread") {
            Ok(activation) => {
                wins += 1;
                assert_eq!(activation.lease.status, LeaseStatus::Active);
            }
            Err(LeasingError::Conflict(StateConflict::LeaseAlreadyActive(_))) => conflicts += 1,
            Err(other) => panic!("losers must conflict, got {other:?}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(conflicts, ATTEMPTS - 1);

    // Dependent writes happened exactly once regardless of the fan-out.
    let filter = TenantFilter::for_organization(organization);
    let payments = core
        .store
        .payments_for_lease(&lease.id, &filter)
        .expect("payments");
    assert_eq!(payments.len(), 2, "no duplicate obligations");
    assert!(payments.iter().all(|p| p.status == PaymentStatus::Pending));

    let unit = core
        .store
        .unit(&lease.unit_id, &filter)
        .expect("read")
        .expect("present");
    assert_eq!(unit.status, UnitStatus::Occupied);

    let stored = core
        .store
        .lease(&lease.id, &filter)
        .expect("read")
        .expect("present");
    assert_eq!(stored.status, LeaseStatus::Active);
}

#[test]
fn zero_deposit_raises_a_single_rent_obligation() {
    let core = build_core();
    let organization = OrganizationId::from("org-a");
    let lease = pending_lease(&core, "org-a", 900, Some(0), date(2026, 9, 1), None);

    let activation = core
        .leases
        .activate(&lease.id, &organization, None)
        .expect("activation succeeds");

    assert_eq!(activation.payments.len(), 1);
    assert_eq!(activation.payments[0].kind, PaymentKind::Rent);
}
