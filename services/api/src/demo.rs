use chrono::{Duration, Local, NaiveDate};
use clap::Args;

use crate::infra::{build_core, parse_date, seed_demo_portfolio};
use rentdesk::billing::{RepeatSettlementPolicy, SettlementError};
use rentdesk::domain::{BillCycle, PaymentKind};
use rentdesk::error::AppError;
use rentdesk::leasing::{LeaseDraft, LeasingError};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Lease start date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start_date: Option<NaiveDate>,
    /// Evaluation date for the reconciliation sweeps. Defaults to one year
    /// past the lease start.
    #[arg(long, value_parser = parse_date)]
    pub(crate) sweep_date: Option<NaiveDate>,
    /// Answer repeated settlement calls with the stored row instead of a
    /// conflict.
    #[arg(long)]
    pub(crate) idempotent_settlement: bool,
}

/// End-to-end walkthrough against a seeded in-memory portfolio: draft a
/// lease, activate it (twice, to show the one-shot rule), settle the rent
/// (twice, to show the repeat policy), then run both sweeps.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let start_date = args
        .start_date
        .unwrap_or_else(|| Local::now().date_naive());
    let end_date = start_date + Duration::days(364);
    let sweep_date = args.sweep_date.unwrap_or(end_date + Duration::days(2));
    let policy = if args.idempotent_settlement {
        RepeatSettlementPolicy::Idempotent
    } else {
        RepeatSettlementPolicy::Strict
    };

    let core = build_core(policy);
    let portfolio = seed_demo_portfolio(core.store.as_ref())
        .map_err(|err| AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string())))?;

    println!("Lease lifecycle demo");
    println!(
        "Portfolio: {} / {} / unit {}",
        portfolio.organization, portfolio.property_id, portfolio.unit_id
    );

    let lease = core
        .leases
        .create(LeaseDraft {
            organization: portfolio.organization.clone(),
            property_id: portfolio.property_id.clone(),
            unit_id: portfolio.unit_id.clone(),
            tenant_id: portfolio.tenant_id.clone(),
            start_date,
            end_date: Some(end_date),
            rent_amount: 5000,
            deposit_amount: Some(5000),
            bill_cycle: BillCycle::Monthly,
        })
        .map_err(demo_failure)?;
    println!(
        "\nDrafted lease {} ({} -> {}), status {}",
        lease.id,
        start_date,
        end_date,
        lease.status.label()
    );

    let activation = core
        .leases
        .activate(&lease.id, &portfolio.organization, Some("demo-operator"))
        .map_err(demo_failure)?;
    println!(
        "Activated: lease {}, unit {} now {}",
        activation.lease.status.label(),
        activation.unit.id,
        activation.unit.status.label()
    );
    for payment in &activation.payments {
        println!(
            "- obligation {}: {} {} due {}",
            payment.id,
            payment.kind.label(),
            payment.amount,
            payment.due_date
        );
    }

    match core
        .leases
        .activate(&lease.id, &portfolio.organization, Some("demo-operator"))
    {
        Err(LeasingError::Conflict(conflict)) => println!(
            "Second activation rejected as expected: {} ({})",
            conflict,
            conflict.kind().code()
        ),
        other => println!("Unexpected second-activation outcome: {other:?}"),
    }

    let rent = activation
        .payments
        .iter()
        .find(|p| p.kind == PaymentKind::Rent)
        .expect("demo lease raises rent");
    let settled = core
        .settlements
        .mark_paid(&rent.id, &portfolio.organization, None, Some("demo-operator"))
        .map_err(demo_failure)?;
    println!(
        "\nSettled {}: status {}, paid at {}",
        settled.id,
        settled.status.label(),
        settled
            .paid_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_default()
    );

    match core
        .settlements
        .mark_paid(&rent.id, &portfolio.organization, None, Some("demo-operator"))
    {
        Ok(replay) => println!(
            "Repeat settlement returned the stored row (idempotent policy), paid at {}",
            replay
                .paid_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_default()
        ),
        Err(SettlementError::Conflict(conflict)) => println!(
            "Repeat settlement rejected (strict policy): {} ({})",
            conflict,
            conflict.kind().code()
        ),
        Err(other) => println!("Unexpected repeat-settlement outcome: {other}"),
    }

    println!("\nReconciliation sweeps evaluated at {sweep_date}");
    let expired = core
        .sweeper
        .expire_leases(sweep_date)
        .map_err(demo_failure)?;
    println!("- leases expired: {expired}");
    let flagged = core
        .sweeper
        .flag_overdue_payments(sweep_date)
        .map_err(demo_failure)?;
    println!("- payments flagged overdue: {flagged}");

    Ok(())
}

fn demo_failure(err: impl std::error::Error) -> AppError {
    AppError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        err.to_string(),
    ))
}
