use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{Lease, Payment, PaymentId, PaymentKind, PaymentStatus};

static PAYMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_payment_id() -> PaymentId {
    let id = PAYMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    PaymentId(format!("pay-{id:06}"))
}

/// Obligations raised the moment a lease becomes active: the deposit when
/// the lease carries one, and the first billing-cycle rent. Both fall due
/// on the start date. Later cycles are raised by a separate process.
pub(crate) fn first_cycle_payments(lease: &Lease) -> Vec<Payment> {
    let mut payments = Vec::with_capacity(2);

    if let Some(deposit) = lease.deposit_amount.filter(|amount| *amount > 0) {
        payments.push(Payment {
            id: next_payment_id(),
            organization_id: lease.organization_id.clone(),
            lease_id: lease.id.clone(),
            kind: PaymentKind::Deposit,
            status: PaymentStatus::Pending,
            amount: deposit,
            due_date: lease.start_date,
            paid_at: None,
        });
    }

    payments.push(Payment {
        id: next_payment_id(),
        organization_id: lease.organization_id.clone(),
        lease_id: lease.id.clone(),
        kind: PaymentKind::Rent,
        status: PaymentStatus::Pending,
        amount: lease.rent_amount,
        due_date: lease.start_date,
        paid_at: None,
    });

    payments
}
