//! # Domain Types
//!
//! Core domain types of the tool-lending back office.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Client      │   │      Loan       │   │      Tool       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  client_id (FK) │   │  id (UUID)      │       │
//! │  │  rut (business) │   │  tool_id (FK)   │──►│  status         │       │
//! │  │  status         │   │  start/due/ret  │   │  stock          │       │
//! │  └─────────────────┘   │  total_charge   │   │  replacement    │       │
//! │                        └─────────────────┘   └────────┬────────┘       │
//! │                                                       │                 │
//! │  ┌─────────────────┐                        ┌─────────▼───────┐        │
//! │  │     Tariff      │                        │   KardexEntry   │        │
//! │  │  (singleton)    │                        │  tool_id (FK)   │        │
//! │  │  rental / late  │                        │  movement_type  │        │
//! │  │  repair         │                        │  quantity, user │        │
//! │  └─────────────────┘                        └─────────────────┘        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Loans reference clients and tools by id only; there are no back-collections.
//! Tools and clients carry a `version` counter that storage bumps on every
//! write and checks on every update.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tool Status
// =============================================================================

/// Lifecycle status of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Units on the shelf can be lent.
    Available,
    /// Every unit is out on loan.
    Loaned,
    /// A unit is in the workshop.
    Repairing,
    /// Retired for good. Stock is always zero.
    Decommissioned,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Available => "available",
            ToolStatus::Loaned => "loaned",
            ToolStatus::Repairing => "repairing",
            ToolStatus::Decommissioned => "decommissioned",
        }
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Client Status
// =============================================================================

/// Standing of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Active,
    /// Barred from new loans until reactivated.
    Restricted,
}

impl Default for ClientStatus {
    fn default() -> Self {
        ClientStatus::Active
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientStatus::Active => f.write_str("active"),
            ClientStatus::Restricted => f.write_str("restricted"),
        }
    }
}

// =============================================================================
// Loan Status
// =============================================================================

/// Status of a loan.
///
/// ## State Machine
/// ```text
///   ACTIVE ──────────────► CLOSED (terminal, set by return)
///     │                      ▲
///     │ overdue sweep        │ return
///     ▼                      │
///   LATE ────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Late,
    Closed,
}

impl LoanStatus {
    /// ACTIVE and LATE loans are open: they count against the loan ceiling
    /// and can still be returned.
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, LoanStatus::Active | LoanStatus::Late)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Late => "late",
            LoanStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(LoanStatus::Active),
            "late" => Ok(LoanStatus::Late),
            "closed" => Ok(LoanStatus::Closed),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["active".into(), "late".into(), "closed".into()],
            }),
        }
    }
}

// =============================================================================
// Movement Type
// =============================================================================

/// Kind of inventory movement recorded in the kardex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Units entering inventory (intake, restock, repaired unit back).
    Income,
    Loan,
    Return,
    Repair,
    Decommission,
    /// Units written off by hand (lost, miscounted).
    ManualDecrease,
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MovementType::Income => "income",
            MovementType::Loan => "loan",
            MovementType::Return => "return",
            MovementType::Repair => "repair",
            MovementType::Decommission => "decommission",
            MovementType::ManualDecrease => "manual_decrease",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Tool
// =============================================================================

/// A rentable tool. One row covers every unit of the same tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Tool {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub name: String,
    pub category: String,
    pub status: ToolStatus,

    /// Units on the shelf, never negative.
    pub stock: i64,

    /// Charged when a unit comes back damaged beyond repair.
    pub replacement_value: Money,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Optimistic-lock counter.
    pub version: i64,
}

impl Tool {
    /// Builds a freshly registered tool. Tools always start AVAILABLE.
    pub fn register(input: NewTool, now: DateTime<Utc>) -> Self {
        Tool {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            category: input.category.trim().to_string(),
            status: ToolStatus::Available,
            stock: input.stock,
            replacement_value: input.replacement_value,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }
}

/// Input for registering a tool.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTool {
    pub name: String,
    pub category: String,
    pub replacement_value: Money,
    /// Units received at intake.
    #[serde(default)]
    pub stock: i64,
}

/// Descriptive fields of a tool. Stock and status are owned by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ToolDetails {
    pub name: String,
    pub category: String,
    pub replacement_value: Money,
}

// =============================================================================
// Client
// =============================================================================

/// A registered borrower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: String,

    /// National id, normalised to `12345678-5`.
    pub rut: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub status: ClientStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl Client {
    /// Builds a newly registered client. `rut` must already be normalised.
    pub fn register(input: NewClient, rut: String, now: DateTime<Utc>) -> Self {
        Client {
            id: Uuid::new_v4().to_string(),
            rut,
            name: input.name.trim().to_string(),
            phone: input.phone.trim().to_string(),
            email: input.email.trim().to_string(),
            status: ClientStatus::Active,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    #[inline]
    pub fn is_restricted(&self) -> bool {
        self.status == ClientStatus::Restricted
    }
}

/// Input for registering a client.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewClient {
    pub rut: String,
    pub name: String,
    pub phone: String,
    pub email: String,
}

/// Contact fields a client may change. RUT and status are not among them.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientDetails {
    pub name: String,
    pub phone: String,
    pub email: String,
}

// =============================================================================
// Loan
// =============================================================================

/// A loan of one unit of a tool to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Loan {
    pub id: String,
    pub client_id: String,
    pub tool_id: String,

    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub due_date: NaiveDate,

    /// Set together with `Closed`, exactly once.
    #[ts(as = "Option<String>")]
    pub return_date: Option<NaiveDate>,

    pub status: LoanStatus,

    /// Amount owed for this loan. Zero until return, zero again once paid.
    pub total_charge: Money,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// Opens a new ACTIVE loan with nothing charged yet.
    pub fn open(
        client_id: &str,
        tool_id: &str,
        start_date: NaiveDate,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Loan {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            tool_id: tool_id.to_string(),
            start_date,
            due_date,
            return_date: None,
            status: LoanStatus::Active,
            total_charge: Money::zero(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Parameters for opening a loan.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LoanRequest {
    pub client_id: String,
    pub tool_id: String,
    /// Defaults to today.
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Required; `None` is rejected as a validation error.
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Parameters for returning a loan.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReturnRequest {
    /// Must match the loan's tool.
    pub tool_id: String,
    #[serde(default)]
    pub damaged: bool,
    /// Only meaningful together with `damaged`.
    #[serde(default)]
    pub irreparable: bool,
    /// Defaults to today.
    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub return_date: Option<NaiveDate>,
}

// =============================================================================
// Kardex Entry
// =============================================================================

/// One immutable inventory movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct KardexEntry {
    pub id: String,
    pub tool_id: String,
    pub movement_type: MovementType,
    /// Always positive; direction comes from `movement_type`.
    pub quantity: i64,
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
    /// Acting user, as resolved by the authentication layer.
    pub user_id: String,
}

impl KardexEntry {
    pub fn record(
        tool_id: &str,
        movement_type: MovementType,
        quantity: i64,
        user_id: &str,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        KardexEntry {
            id: Uuid::new_v4().to_string(),
            tool_id: tool_id.to_string(),
            movement_type,
            quantity,
            occurred_at,
            user_id: user_id.to_string(),
        }
    }
}

// =============================================================================
// Tariff
// =============================================================================

/// The single active pricing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Tariff {
    /// Always [`crate::TARIFF_KEY`].
    pub id: String,
    pub daily_rental_fee: Money,
    pub daily_late_fee: Money,
    pub repair_fee: Money,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Tariff {
    /// The three fees, as billing consumes them.
    pub fn values(&self) -> TariffValues {
        TariffValues {
            daily_rental_fee: self.daily_rental_fee,
            daily_late_fee: self.daily_late_fee,
            repair_fee: self.repair_fee,
        }
    }
}

/// Replacement values for the tariff. All three are written together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TariffValues {
    pub daily_rental_fee: Money,
    pub daily_late_fee: Money,
    pub repair_fee: Money,
}

// =============================================================================
// Reporting
// =============================================================================

/// A row of the most-borrowed ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ToolLoanCount {
    pub tool_id: String,
    pub tool_name: String,
    pub category: String,
    pub loan_count: i64,
}

/// An inclusive range of calendar dates used to filter reports by loan
/// start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub start: NaiveDate,
    #[ts(as = "String")]
    pub end: NaiveDate,
}

impl DateRange {
    /// Fails if `end` is before `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::DateOrder {
                earlier: "start".to_string(),
                later: "end".to_string(),
            });
        }
        Ok(DateRange { start, end })
    }

    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_loan_status_parsing() {
        assert_eq!("late".parse::<LoanStatus>().unwrap(), LoanStatus::Late);
        assert_eq!(" CLOSED ".parse::<LoanStatus>().unwrap(), LoanStatus::Closed);
        assert!("returned".parse::<LoanStatus>().is_err());
    }

    #[test]
    fn test_open_statuses() {
        assert!(LoanStatus::Active.is_open());
        assert!(LoanStatus::Late.is_open());
        assert!(!LoanStatus::Closed.is_open());
    }

    #[test]
    fn test_new_loan_is_active_and_uncharged() {
        let loan = Loan::open("c", "t", date(2025, 3, 1), date(2025, 3, 8), Utc::now());
        assert_eq!(loan.status, LoanStatus::Active);
        assert!(loan.total_charge.is_zero());
        assert!(loan.return_date.is_none());
    }

    #[test]
    fn test_registered_tool_starts_available() {
        let tool = Tool::register(
            NewTool {
                name: "  Rotomartillo  ".to_string(),
                category: "Electric".to_string(),
                replacement_value: Money::new(50000),
                stock: 0,
            },
            Utc::now(),
        );
        assert_eq!(tool.status, ToolStatus::Available);
        assert_eq!(tool.name, "Rotomartillo");
        assert_eq!(tool.version, 0);
    }

    #[test]
    fn test_date_range() {
        let range = DateRange::new(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        assert!(range.contains(date(2025, 1, 1)));
        assert!(range.contains(date(2025, 1, 31)));
        assert!(!range.contains(date(2025, 2, 1)));
        assert!(DateRange::new(date(2025, 2, 1), date(2025, 1, 1)).is_err());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&MovementType::ManualDecrease).unwrap(),
            "\"manual_decrease\""
        );
        assert_eq!(ToolStatus::Decommissioned.to_string(), "decommissioned");
    }
}
