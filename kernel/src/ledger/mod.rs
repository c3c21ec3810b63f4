// Book Availability Ledger
//
// Owns per-title copy counts and the derived status. Mutated only by
// loan and reservation operations; every mutation is all-or-nothing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogId, Title, TitleStatus};

/// Errors produced by ledger operations.
///
/// `LedgerCorrupted` is the one non-recoverable kind: it signals an
/// invariant breach (`available > total`) detected before the
/// operation touched anything.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unknown title: {0:?}")]
    UnknownTitle(CatalogId),

    #[error("no copies of {0:?} available")]
    Unavailable(CatalogId),

    #[error("all copies of {0:?} already on the shelf")]
    OverCapacity(CatalogId),

    #[error("ledger corrupted for {catalog_id:?}: {detail}")]
    LedgerCorrupted {
        catalog_id: CatalogId,
        detail: String,
    },
}

/// Administrative terminal mark for a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminalMark {
    Lost,
    Damaged,
}

impl TerminalMark {
    fn as_status(self) -> TitleStatus {
        match self {
            Self::Lost => TitleStatus::Lost,
            Self::Damaged => TitleStatus::Damaged,
        }
    }
}

#[derive(Debug, Default)]
pub struct BookAvailabilityLedger {
    titles: HashMap<CatalogId, Title>,
}

impl BookAvailabilityLedger {
    pub fn new() -> Self {
        Self {
            titles: HashMap::new(),
        }
    }

    pub fn add_title(&mut self, title: Title) -> CatalogId {
        let catalog_id = title.catalog_id;
        self.titles.insert(catalog_id, title);
        catalog_id
    }

    pub fn title(&self, catalog_id: CatalogId) -> Option<&Title> {
        self.titles.get(&catalog_id)
    }

    pub fn titles(&self) -> impl Iterator<Item = &Title> {
        self.titles.values()
    }

    /// Look up a title for mutation, refusing to operate on a record
    /// whose counters are already out of bounds.
    fn checked_mut(&mut self, catalog_id: CatalogId) -> Result<&mut Title, LedgerError> {
        let title = self
            .titles
            .get_mut(&catalog_id)
            .ok_or(LedgerError::UnknownTitle(catalog_id))?;

        if title.available_copies > title.total_copies {
            return Err(LedgerError::LedgerCorrupted {
                catalog_id,
                detail: format!(
                    "available {} exceeds total {}",
                    title.available_copies, title.total_copies
                ),
            });
        }

        Ok(title)
    }

    /// True iff copies remain and no terminal mark is forced.
    pub fn is_available(&self, catalog_id: CatalogId) -> Result<bool, LedgerError> {
        let title = self
            .titles
            .get(&catalog_id)
            .ok_or(LedgerError::UnknownTitle(catalog_id))?;
        Ok(title.available_copies > 0 && !title.status.is_terminal())
    }

    pub fn available_copies(&self, catalog_id: CatalogId) -> Result<u32, LedgerError> {
        self.titles
            .get(&catalog_id)
            .map(|t| t.available_copies)
            .ok_or(LedgerError::UnknownTitle(catalog_id))
    }

    pub fn status(&self, catalog_id: CatalogId) -> Result<TitleStatus, LedgerError> {
        self.titles
            .get(&catalog_id)
            .map(|t| t.status)
            .ok_or(LedgerError::UnknownTitle(catalog_id))
    }

    /// Commit one copy to a borrower.
    pub fn reserve_copy(&mut self, catalog_id: CatalogId) -> Result<(), LedgerError> {
        let title = self.checked_mut(catalog_id)?;

        if title.status.is_terminal() || title.available_copies == 0 {
            return Err(LedgerError::Unavailable(catalog_id));
        }

        title.available_copies -= 1;
        if title.available_copies == 0 {
            title.status = TitleStatus::CheckedOut;
        }
        title.borrow_count += 1;

        Ok(())
    }

    /// Put one copy back on the shelf.
    pub fn release_copy(&mut self, catalog_id: CatalogId) -> Result<(), LedgerError> {
        let title = self.checked_mut(catalog_id)?;

        if title.available_copies == title.total_copies {
            return Err(LedgerError::OverCapacity(catalog_id));
        }

        title.available_copies += 1;
        if !title.status.is_terminal() {
            title.status = TitleStatus::Available;
        }

        Ok(())
    }

    /// Record that a queue has formed on an unavailable title.
    pub fn mark_reserved(&mut self, catalog_id: CatalogId) -> Result<(), LedgerError> {
        let title = self.checked_mut(catalog_id)?;
        if !title.status.is_terminal() {
            title.status = TitleStatus::Reserved;
        }
        Ok(())
    }

    /// Force a terminal status. Counts are unchanged; the title is
    /// non-borrowable and non-reservable until cleared.
    pub fn set_terminal_status(
        &mut self,
        catalog_id: CatalogId,
        mark: TerminalMark,
    ) -> Result<(), LedgerError> {
        let title = self.checked_mut(catalog_id)?;
        title.status = mark.as_status();
        Ok(())
    }

    /// Clear a terminal mark and recompute the derived status.
    pub fn clear_terminal_status(&mut self, catalog_id: CatalogId) -> Result<(), LedgerError> {
        let title = self.checked_mut(catalog_id)?;
        title.status = if title.available_copies > 0 {
            TitleStatus::Available
        } else {
            TitleStatus::CheckedOut
        };
        Ok(())
    }
}
