use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of the organization that owns a slice of the portfolio.
    OrganizationId
);
string_id!(PropertyId);
string_id!(UnitId);
string_id!(
    /// Identifier of a renter record (not the isolation boundary).
    TenantId
);
string_id!(LeaseId);
string_id!(PaymentId);

/// Tenant root. The only entity without an owning organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub organization_id: OrganizationId,
    pub name: String,
}

/// A rentable unit inside a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub organization_id: OrganizationId,
    pub property_id: PropertyId,
    pub label: String,
    pub status: UnitStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Vacant,
    Reserved,
    Occupied,
    Maintenance,
}

impl UnitStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Vacant => "vacant",
            Self::Reserved => "reserved",
            Self::Occupied => "occupied",
            Self::Maintenance => "maintenance",
        }
    }

    /// A unit can take a new active lease only while vacant or reserved.
    pub const fn accepts_occupancy(self) -> bool {
        matches!(self, Self::Vacant | Self::Reserved)
    }
}

/// The renting party. Email and phone are unique per organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub organization_id: OrganizationId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub id: LeaseId,
    pub organization_id: OrganizationId,
    pub property_id: PropertyId,
    pub unit_id: UnitId,
    pub tenant_id: TenantId,
    pub status: LeaseStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub rent_amount: u32,
    pub deposit_amount: Option<u32>,
    pub bill_cycle: BillCycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    Pending,
    Active,
    Terminated,
    Expired,
}

impl LeaseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Terminated => "terminated",
            Self::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillCycle {
    Monthly,
    Quarterly,
    Annually,
}

impl BillCycle {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annually => "annually",
        }
    }
}

/// A billing obligation raised against a lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub organization_id: OrganizationId,
    pub lease_id: LeaseId,
    pub kind: PaymentKind,
    pub status: PaymentStatus,
    pub amount: u32,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Deposit,
    Rent,
    LateFee,
}

impl PaymentKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Rent => "rent",
            Self::LateFee => "late_fee",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
    Canceled,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Canceled => "canceled",
        }
    }

    /// Only pending and overdue obligations can still be settled.
    pub const fn settleable(self) -> bool {
        matches!(self, Self::Pending | Self::Overdue)
    }
}

/// Immutable fact describing who did what to which entity. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: String,
    pub organization_id: OrganizationId,
    pub user_id: Option<String>,
    pub entity: EntityKind,
    pub entity_id: String,
    pub action: AuditAction,
    pub metadata: Option<serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Organization,
    Property,
    Unit,
    Tenant,
    Lease,
    Payment,
}

impl EntityKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Property => "property",
            Self::Unit => "unit",
            Self::Tenant => "tenant",
            Self::Lease => "lease",
            Self::Payment => "payment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    LeaseActivated,
    PaymentMarkPaid,
}

impl AuditAction {
    pub const fn code(self) -> &'static str {
        match self {
            Self::LeaseActivated => "LEASE_ACTIVATED",
            Self::PaymentMarkPaid => "PAYMENT_MARK_PAID",
        }
    }
}

/// Machine-readable identifier for a rejected lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    LeaseAlreadyActive,
    LeaseStatusInvalid,
    UnitNotVacant,
    PaymentStatusInvalidForMarkPaid,
}

impl ConflictKind {
    pub const fn code(self) -> &'static str {
        match self {
            Self::LeaseAlreadyActive => "LEASE_ALREADY_ACTIVE",
            Self::LeaseStatusInvalid => "LEASE_STATUS_INVALID",
            Self::UnitNotVacant => "UNIT_NOT_VACANT",
            Self::PaymentStatusInvalidForMarkPaid => "PAYMENT_STATUS_INVALID_FOR_MARK_PAID",
        }
    }
}

/// A state-machine precondition that did not hold, including lost races.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateConflict {
    #[error("lease {0} is already active")]
    LeaseAlreadyActive(LeaseId),
    #[error("lease {id} cannot be activated from status {current}", current = .status.label())]
    LeaseStatusInvalid { id: LeaseId, status: LeaseStatus },
    #[error("unit {id} is not open for occupancy (status {current})", current = .status.label())]
    UnitNotVacant { id: UnitId, status: UnitStatus },
    #[error("payment {id} cannot be marked paid from status {current}", current = .status.label())]
    PaymentNotSettleable { id: PaymentId, status: PaymentStatus },
}

impl StateConflict {
    pub const fn kind(&self) -> ConflictKind {
        match self {
            Self::LeaseAlreadyActive(_) => ConflictKind::LeaseAlreadyActive,
            Self::LeaseStatusInvalid { .. } => ConflictKind::LeaseStatusInvalid,
            Self::UnitNotVacant { .. } => ConflictKind::UnitNotVacant,
            Self::PaymentNotSettleable { .. } => ConflictKind::PaymentStatusInvalidForMarkPaid,
        }
    }
}

/// Cross-entity referential mismatch caught before any write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelationViolation {
    #[error("unit {unit} does not belong to property {property}")]
    UnitOutsideProperty { unit: UnitId, property: PropertyId },
    #[error("property {property} does not belong to organization {organization}")]
    PropertyOutsideOrganization {
        property: PropertyId,
        organization: OrganizationId,
    },
    #[error("tenant {tenant} does not belong to organization {organization}")]
    TenantOutsideOrganization {
        tenant: TenantId,
        organization: OrganizationId,
    },
}
