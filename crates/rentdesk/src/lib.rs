//! Lifecycle core for a multi-tenant property-management back office.
//!
//! The crate owns the pieces with real concurrency content: the tenant
//! context and its data-access scoping interceptor, the lease activation
//! and payment settlement state machines (both built on conditional
//! transitions that report affected-row counts), the reconciliation
//! sweeps, and the best-effort audit trail. Everything else — the CRUD
//! surface, form validation, token issuance — lives outside.

pub mod audit;
pub mod billing;
pub mod config;
pub mod domain;
pub mod error;
pub mod leasing;
pub mod reconciliation;
pub mod store;
pub mod telemetry;
pub mod tenancy;
