// Availability Notifications
//
// Collaborator seam for the external notification channel. The engine
// only raises events; rendering and delivery live outside the kernel.

use chrono::NaiveDate;
use serde::Serialize;

use crate::catalog::{date, CatalogId, PatronId};

/// Event raised when a copy frees up and a queue head exists.
///
/// Raised exactly once per return, never speculatively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityNotice {
    pub catalog_id: CatalogId,
    pub patron_id: PatronId,
    pub available_copies: u32,
    #[serde(with = "date::ddmmyyyy")]
    pub timestamp: NaiveDate,
}

/// External collaborator receiving availability events.
///
/// Implementations must not feed back into engine state.
pub trait NotificationDispatcher {
    fn notify(&mut self, notice: &AvailabilityNotice);
}

/// Discards every notice.
#[derive(Debug, Default)]
pub struct NullDispatcher;

impl NotificationDispatcher for NullDispatcher {
    fn notify(&mut self, _notice: &AvailabilityNotice) {}
}

/// Records notices in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryDispatcher {
    pub notices: Vec<AvailabilityNotice>,
}

impl MemoryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationDispatcher for MemoryDispatcher {
    fn notify(&mut self, notice: &AvailabilityNotice) {
        self.notices.push(notice.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_dispatcher_keeps_arrival_order() {
        let mut dispatcher = MemoryDispatcher::new();
        let first = AvailabilityNotice {
            catalog_id: CatalogId::random(),
            patron_id: PatronId::random(),
            available_copies: 1,
            timestamp: NaiveDate::from_ymd_opt(2025, 2, 5).unwrap(),
        };
        let second = AvailabilityNotice {
            available_copies: 2,
            ..first.clone()
        };

        dispatcher.notify(&first);
        dispatcher.notify(&second);

        assert_eq!(dispatcher.notices, vec![first, second]);
    }

    #[test]
    fn notice_serializes_with_boundary_date_format() {
        let notice = AvailabilityNotice {
            catalog_id: CatalogId::random(),
            patron_id: PatronId::random(),
            available_copies: 1,
            timestamp: NaiveDate::from_ymd_opt(2025, 2, 5).unwrap(),
        };

        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["timestamp"], "05/02/2025");
        assert_eq!(json["availableCopies"], 1);
    }
}
