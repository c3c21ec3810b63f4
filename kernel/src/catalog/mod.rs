// Circulation Entities
//
// Boundary records for titles, patrons, loans and reservations.
// This module is pure data; all mutation goes through the owning
// managers (ledger, loans, reservations).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod date;

/// Stable identifier for a catalog title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogId(pub Uuid);

/// Stable identifier for a patron.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatronId(pub Uuid);

/// Stable identifier for a loan record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoanId(pub Uuid);

/// Stable identifier for a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub Uuid);

impl CatalogId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl PatronId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl LoanId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl ReservationId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Derived status of a title.
///
/// AVAILABLE holds iff copies remain on the shelf and no terminal
/// mark is forced. LOST and DAMAGED are administrative overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TitleStatus {
    Available,
    CheckedOut,
    Reserved,
    Lost,
    Damaged,
}

impl TitleStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Lost | Self::Damaged)
    }
}

/// A catalog entry with one or more circulating copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Title {
    pub catalog_id: CatalogId,
    pub title: String,
    pub author: String,
    pub summary: String,
    pub status: TitleStatus,
    pub total_copies: u32,
    pub available_copies: u32,
    #[serde(default)]
    pub borrow_count: u64,
}

impl Title {
    /// New title with every copy on the shelf.
    pub fn new(title: impl Into<String>, author: impl Into<String>, total_copies: u32) -> Self {
        Self {
            catalog_id: CatalogId::random(),
            title: title.into(),
            author: author.into(),
            summary: String::new(),
            status: TitleStatus::Available,
            total_copies,
            available_copies: total_copies,
            borrow_count: 0,
        }
    }
}

/// Patron category, each mapped by the policy table to a quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatronCategory {
    Student,
    Faculty,
    Staff,
}

/// A library user with a category-based borrowing quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patron {
    pub patron_id: PatronId,
    pub name: String,
    pub category: PatronCategory,
    #[serde(default)]
    pub lifetime_borrow_count: u64,
    #[serde(default)]
    pub open_loan_ids: Vec<LoanId>,
}

impl Patron {
    pub fn new(name: impl Into<String>, category: PatronCategory) -> Self {
        Self {
            patron_id: PatronId::random(),
            name: name.into(),
            category,
            lifetime_borrow_count: 0,
            open_loan_ids: Vec::new(),
        }
    }

    pub fn open_loan_count(&self) -> usize {
        self.open_loan_ids.len()
    }
}

/// One copy of a title held by a patron between issue and return.
///
/// Open while `return_date` is `None`; closed records are never
/// deleted, forming an append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub loan_id: LoanId,
    pub catalog_id: CatalogId,
    pub patron_id: PatronId,
    #[serde(with = "date::ddmmyyyy")]
    pub issue_date: NaiveDate,
    #[serde(with = "date::ddmmyyyy")]
    pub due_date: NaiveDate,
    #[serde(with = "date::ddmmyyyy_opt", default)]
    pub return_date: Option<NaiveDate>,
    #[serde(default)]
    pub penalty: f64,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }
}

/// A queued request for a title that is currently unavailable.
///
/// `queue_position` is 1-based and derived; the authoritative order
/// is creation date, ties broken by insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub reservation_id: ReservationId,
    pub catalog_id: CatalogId,
    pub patron_id: PatronId,
    #[serde(with = "date::ddmmyyyy")]
    pub created_at: NaiveDate,
    pub queue_position: usize,
}
