// Reservation Queues
//
// One FIFO queue per title, ordered by creation date with stable
// ties. The queues are owned here and passed by reference to
// whichever component needs them; there is no ambient global.
//
// Promotion into a loan is always explicit. A freed copy only
// triggers a notification; the notified patron (or the desk) must
// call `promote` to consume it.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::catalog::{CatalogId, Loan, PatronId, Reservation, ReservationId};
use crate::ledger::{BookAvailabilityLedger, LedgerError};
use crate::loans::{LoanError, LoanLifecycleManager};
use crate::notify::{AvailabilityNotice, NotificationDispatcher};

/// Errors produced by reservation operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReservationError {
    #[error("title {0:?} has copies on the shelf; borrow it directly")]
    TitleAvailable(CatalogId),

    #[error("patron {patron_id:?} already holds a reservation for {catalog_id:?}")]
    DuplicateReservation {
        catalog_id: CatalogId,
        patron_id: PatronId,
    },

    #[error("reservation {0:?} is not at the head of its queue")]
    NotQueueHead(ReservationId),

    #[error("title {0:?} is not in circulation")]
    TitleUnavailable(CatalogId),

    #[error("unknown reservation: {0:?}")]
    UnknownReservation(ReservationId),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Loan(#[from] LoanError),
}

#[derive(Debug, Default)]
pub struct ReservationQueueManager {
    queues: HashMap<CatalogId, Vec<Reservation>>,
    index: HashMap<ReservationId, CatalogId>,
}

impl ReservationQueueManager {
    pub fn new() -> Self {
        Self {
            queues: HashMap::new(),
            index: HashMap::new(),
        }
    }

    /// Queue for a title, head first. Empty slice when nobody waits.
    pub fn queue_for(&self, catalog_id: CatalogId) -> &[Reservation] {
        self.queues
            .get(&catalog_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn queue_len(&self, catalog_id: CatalogId) -> usize {
        self.queue_for(catalog_id).len()
    }

    pub fn head_of(&self, catalog_id: CatalogId) -> Option<&Reservation> {
        self.queue_for(catalog_id).first()
    }

    pub fn reservation(&self, reservation_id: ReservationId) -> Option<&Reservation> {
        let catalog_id = self.index.get(&reservation_id)?;
        self.queue_for(*catalog_id)
            .iter()
            .find(|r| r.reservation_id == reservation_id)
    }

    fn renumber(queue: &mut [Reservation]) {
        for (index, reservation) in queue.iter_mut().enumerate() {
            reservation.queue_position = index + 1;
        }
    }

    /// Join the queue for an unavailable title.
    pub fn reserve(
        &mut self,
        ledger: &mut BookAvailabilityLedger,
        catalog_id: CatalogId,
        patron_id: PatronId,
        today: NaiveDate,
    ) -> Result<Reservation, ReservationError> {
        if ledger.is_available(catalog_id)? {
            return Err(ReservationError::TitleAvailable(catalog_id));
        }
        // A lost or damaged title is non-reservable until cleared
        if ledger.status(catalog_id)?.is_terminal() {
            return Err(ReservationError::TitleUnavailable(catalog_id));
        }

        if self
            .queue_for(catalog_id)
            .iter()
            .any(|r| r.patron_id == patron_id)
        {
            return Err(ReservationError::DuplicateReservation {
                catalog_id,
                patron_id,
            });
        }

        ledger.mark_reserved(catalog_id)?;

        let reservation = Reservation {
            reservation_id: ReservationId::random(),
            catalog_id,
            patron_id,
            created_at: today,
            queue_position: 0,
        };

        let queue = self.queues.entry(catalog_id).or_default();
        // Stable insert: after every entry created on or before today
        let at = queue.partition_point(|r| r.created_at <= today);
        queue.insert(at, reservation.clone());
        Self::renumber(queue);
        self.index.insert(reservation.reservation_id, catalog_id);

        Ok(Reservation {
            queue_position: at + 1,
            ..reservation
        })
    }

    /// Drop a reservation and close the gap behind it.
    ///
    /// Never touches the ledger: cancellation does not change a
    /// title's status.
    pub fn cancel(&mut self, reservation_id: ReservationId) -> Result<Reservation, ReservationError> {
        let catalog_id = *self
            .index
            .get(&reservation_id)
            .ok_or(ReservationError::UnknownReservation(reservation_id))?;
        let queue = self
            .queues
            .get_mut(&catalog_id)
            .ok_or(ReservationError::UnknownReservation(reservation_id))?;
        let at = queue
            .iter()
            .position(|r| r.reservation_id == reservation_id)
            .ok_or(ReservationError::UnknownReservation(reservation_id))?;

        let removed = queue.remove(at);
        Self::renumber(queue);
        if queue.is_empty() {
            self.queues.remove(&catalog_id);
        }
        self.index.remove(&reservation_id);

        Ok(removed)
    }

    /// Read-only peek after a copy frees up.
    ///
    /// Emits exactly one notice when a queue head exists, never
    /// speculatively. Returns whether a notice went out.
    pub fn on_title_released(
        &self,
        ledger: &BookAvailabilityLedger,
        dispatcher: &mut dyn NotificationDispatcher,
        catalog_id: CatalogId,
        today: NaiveDate,
    ) -> Result<bool, LedgerError> {
        let Some(head) = self.head_of(catalog_id) else {
            return Ok(false);
        };

        let available_copies = ledger.available_copies(catalog_id)?;
        dispatcher.notify(&AvailabilityNotice {
            catalog_id,
            patron_id: head.patron_id,
            available_copies,
            timestamp: today,
        });

        Ok(true)
    }

    /// Convert the queue-head reservation into a loan.
    ///
    /// The only Reservation-to-Loan path. Quota is still enforced by
    /// the borrow underneath; on any failure the queue is unchanged.
    pub fn promote(
        &mut self,
        ledger: &mut BookAvailabilityLedger,
        loans: &mut LoanLifecycleManager,
        reservation_id: ReservationId,
        today: NaiveDate,
    ) -> Result<Loan, ReservationError> {
        let catalog_id = *self
            .index
            .get(&reservation_id)
            .ok_or(ReservationError::UnknownReservation(reservation_id))?;

        let head = self
            .head_of(catalog_id)
            .ok_or(ReservationError::UnknownReservation(reservation_id))?;
        if head.reservation_id != reservation_id {
            return Err(ReservationError::NotQueueHead(reservation_id));
        }
        if ledger.available_copies(catalog_id)? == 0 {
            return Err(ReservationError::TitleUnavailable(catalog_id));
        }

        let patron_id = head.patron_id;
        let loan = loans.borrow(ledger, catalog_id, patron_id, today)?;

        if let Some(queue) = self.queues.get_mut(&catalog_id) {
            queue.retain(|r| r.reservation_id != reservation_id);
            Self::renumber(queue);
            if queue.is_empty() {
                self.queues.remove(&catalog_id);
            }
        }
        self.index.remove(&reservation_id);

        Ok(loan)
    }
}
