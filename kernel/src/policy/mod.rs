// Borrowing Policy
//
// Flat quota table keyed by patron category, plus the engine
// configuration knobs. A data table replaces the per-category class
// hierarchy of older designs.

use serde::{Deserialize, Serialize};

use crate::catalog::PatronCategory;

/// Errors produced at the policy boundary.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid patron category: {0}")]
    InvalidCategory(String),
}

/// Borrowing quota per patron category.
///
/// A quota of zero means the category cannot borrow at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyTable {
    pub student: u32,
    pub faculty: u32,
    pub staff: u32,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            student: 4,
            faculty: 6,
            staff: 0,
        }
    }
}

impl PolicyTable {
    /// Pure, total lookup over the category enumeration.
    pub fn quota_for(&self, category: PatronCategory) -> u32 {
        match category {
            PatronCategory::Student => self.student,
            PatronCategory::Faculty => self.faculty,
            PatronCategory::Staff => self.staff,
        }
    }
}

/// Parse a category from boundary text.
///
/// Inside the engine an unknown category is unrepresentable; this is
/// the only place `InvalidCategory` can surface.
pub fn parse_category(raw: &str) -> Result<PatronCategory, PolicyError> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "STUDENT" => Ok(PatronCategory::Student),
        "FACULTY" => Ok(PatronCategory::Faculty),
        "STAFF" => Ok(PatronCategory::Staff),
        _ => Err(PolicyError::InvalidCategory(raw.to_owned())),
    }
}

/// Engine configuration loaded from JSON (used as-is if absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CirculationConfig {
    pub loan_period_days: u32,
    pub penalty_rate_per_day: f64,
    pub quotas: PolicyTable,
}

impl Default for CirculationConfig {
    fn default() -> Self {
        Self {
            loan_period_days: 30,
            penalty_rate_per_day: 0.5,
            quotas: PolicyTable::default(),
        }
    }
}
