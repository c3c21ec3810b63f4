// Circulation Engine
//
// Bundles the ledger, loan manager and reservation queues behind a
// single request surface. One request executes at a time; every
// failure is typed and leaves all state untouched.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::{date, CatalogId, LoanId, Patron, PatronId, ReservationId, Title};
use crate::ledger::{BookAvailabilityLedger, LedgerError, TerminalMark};
use crate::loans::{LoanError, LoanLifecycleManager};
use crate::notify::NotificationDispatcher;
use crate::policy::CirculationConfig;
use crate::reservations::{ReservationError, ReservationQueueManager};

/// Errors surfaced by request execution.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Loan(#[from] LoanError),

    #[error(transparent)]
    Reservation(#[from] ReservationError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// One circulation operation, as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    Borrow {
        catalog_id: CatalogId,
        patron_id: PatronId,
    },
    Return {
        loan_id: LoanId,
    },
    Renew {
        loan_id: LoanId,
    },
    Reserve {
        catalog_id: CatalogId,
        patron_id: PatronId,
    },
    Cancel {
        reservation_id: ReservationId,
    },
    Promote {
        reservation_id: ReservationId,
    },
    MarkTerminal {
        catalog_id: CatalogId,
        mark: TerminalMark,
    },
    ClearTerminal {
        catalog_id: CatalogId,
    },
}

/// What a successful request produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Outcome {
    Borrowed {
        loan_id: LoanId,
        #[serde(with = "date::ddmmyyyy")]
        due_date: NaiveDate,
    },
    Returned {
        loan_id: LoanId,
        days_late: i64,
        penalty: f64,
    },
    Renewed {
        loan_id: LoanId,
        #[serde(with = "date::ddmmyyyy")]
        due_date: NaiveDate,
    },
    Reserved {
        reservation_id: ReservationId,
        queue_position: usize,
    },
    Cancelled {
        reservation_id: ReservationId,
    },
    Promoted {
        reservation_id: ReservationId,
        loan_id: LoanId,
        #[serde(with = "date::ddmmyyyy")]
        due_date: NaiveDate,
    },
    Marked {
        catalog_id: CatalogId,
    },
    Cleared {
        catalog_id: CatalogId,
    },
}

#[derive(Debug, Default)]
pub struct CirculationEngine {
    ledger: BookAvailabilityLedger,
    loans: LoanLifecycleManager,
    reservations: ReservationQueueManager,
}

impl CirculationEngine {
    pub fn new(config: CirculationConfig) -> Self {
        Self {
            ledger: BookAvailabilityLedger::new(),
            loans: LoanLifecycleManager::new(config),
            reservations: ReservationQueueManager::new(),
        }
    }

    pub fn add_title(&mut self, title: Title) -> CatalogId {
        self.ledger.add_title(title)
    }

    pub fn register_patron(&mut self, patron: Patron) -> PatronId {
        self.loans.register_patron(patron)
    }

    pub fn ledger(&self) -> &BookAvailabilityLedger {
        &self.ledger
    }

    pub fn loans(&self) -> &LoanLifecycleManager {
        &self.loans
    }

    pub fn reservations(&self) -> &ReservationQueueManager {
        &self.reservations
    }

    /// Execute a single request as of `today`.
    pub fn execute(
        &mut self,
        request: &Request,
        today: NaiveDate,
        dispatcher: &mut dyn NotificationDispatcher,
    ) -> Result<Outcome, EngineError> {
        match *request {
            Request::Borrow {
                catalog_id,
                patron_id,
            } => {
                let loan = self.loans.borrow(&mut self.ledger, catalog_id, patron_id, today)?;
                Ok(Outcome::Borrowed {
                    loan_id: loan.loan_id,
                    due_date: loan.due_date,
                })
            }
            Request::Return { loan_id } => {
                let receipt = self.loans.return_loan(
                    &mut self.ledger,
                    &self.reservations,
                    dispatcher,
                    loan_id,
                    today,
                )?;
                Ok(Outcome::Returned {
                    loan_id,
                    days_late: receipt.days_late,
                    penalty: receipt.penalty,
                })
            }
            Request::Renew { loan_id } => {
                let due_date = self.loans.renew(&self.reservations, loan_id, today)?;
                Ok(Outcome::Renewed { loan_id, due_date })
            }
            Request::Reserve {
                catalog_id,
                patron_id,
            } => {
                let reservation =
                    self.reservations
                        .reserve(&mut self.ledger, catalog_id, patron_id, today)?;
                Ok(Outcome::Reserved {
                    reservation_id: reservation.reservation_id,
                    queue_position: reservation.queue_position,
                })
            }
            Request::Cancel { reservation_id } => {
                self.reservations.cancel(reservation_id)?;
                Ok(Outcome::Cancelled { reservation_id })
            }
            Request::Promote { reservation_id } => {
                let loan = self.reservations.promote(
                    &mut self.ledger,
                    &mut self.loans,
                    reservation_id,
                    today,
                )?;
                Ok(Outcome::Promoted {
                    reservation_id,
                    loan_id: loan.loan_id,
                    due_date: loan.due_date,
                })
            }
            Request::MarkTerminal { catalog_id, mark } => {
                self.ledger.set_terminal_status(catalog_id, mark)?;
                Ok(Outcome::Marked { catalog_id })
            }
            Request::ClearTerminal { catalog_id } => {
                self.ledger.clear_terminal_status(catalog_id)?;
                Ok(Outcome::Cleared { catalog_id })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PatronCategory, TitleStatus};
    use crate::notify::MemoryDispatcher;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn engine_with_single_copy() -> (CirculationEngine, CatalogId, PatronId, PatronId) {
        let mut engine = CirculationEngine::new(CirculationConfig::default());
        let catalog_id = engine.add_title(Title::new("Dune", "Frank Herbert", 1));
        let p1 = engine.register_patron(Patron::new("P1", PatronCategory::Student));
        let p2 = engine.register_patron(Patron::new("P2", PatronCategory::Student));
        (engine, catalog_id, p1, p2)
    }

    #[test]
    fn single_copy_full_lifecycle() {
        let (mut engine, catalog_id, p1, p2) = engine_with_single_copy();
        let mut dispatcher = MemoryDispatcher::new();

        // P1 borrows the only copy on day one
        let borrowed = engine
            .execute(
                &Request::Borrow {
                    catalog_id,
                    patron_id: p1,
                },
                date(2025, 1, 1),
                &mut dispatcher,
            )
            .unwrap();
        let loan_id = match borrowed {
            Outcome::Borrowed { loan_id, due_date } => {
                assert_eq!(due_date, date(2025, 1, 31));
                loan_id
            }
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(engine.ledger().available_copies(catalog_id).unwrap(), 0);
        assert_eq!(
            engine.ledger().status(catalog_id).unwrap(),
            TitleStatus::CheckedOut
        );

        // P2 queues up
        let reserved = engine
            .execute(
                &Request::Reserve {
                    catalog_id,
                    patron_id: p2,
                },
                date(2025, 1, 2),
                &mut dispatcher,
            )
            .unwrap();
        let reservation_id = match reserved {
            Outcome::Reserved {
                reservation_id,
                queue_position,
            } => {
                assert_eq!(queue_position, 1);
                reservation_id
            }
            other => panic!("unexpected outcome: {other:?}"),
        };

        // P1 returns five days late: penalty 2.5 at the default rate
        let returned = engine
            .execute(&Request::Return { loan_id }, date(2025, 2, 5), &mut dispatcher)
            .unwrap();
        assert_eq!(
            returned,
            Outcome::Returned {
                loan_id,
                days_late: 5,
                penalty: 2.5
            }
        );
        assert_eq!(engine.ledger().available_copies(catalog_id).unwrap(), 1);
        assert_eq!(
            engine.ledger().status(catalog_id).unwrap(),
            TitleStatus::Available
        );
        assert_eq!(engine.loans().loan(loan_id).unwrap().penalty, 2.5);

        // The head of the queue was notified exactly once
        assert_eq!(dispatcher.notices.len(), 1);
        assert_eq!(dispatcher.notices[0].patron_id, p2);
        assert_eq!(dispatcher.notices[0].available_copies, 1);

        // P2 promotes the reservation into a loan
        let promoted = engine
            .execute(
                &Request::Promote { reservation_id },
                date(2025, 2, 5),
                &mut dispatcher,
            )
            .unwrap();
        assert!(matches!(promoted, Outcome::Promoted { .. }));
        assert_eq!(engine.ledger().available_copies(catalog_id).unwrap(), 0);
        assert_eq!(engine.reservations().queue_len(catalog_id), 0);
    }

    #[test]
    fn staff_borrow_is_refused_with_counters_unchanged() {
        let mut engine = CirculationEngine::new(CirculationConfig::default());
        let catalog_id = engine.add_title(Title::new("Dune", "Frank Herbert", 2));
        let staff = engine.register_patron(Patron::new("Desk", PatronCategory::Staff));
        let mut dispatcher = MemoryDispatcher::new();

        let err = engine
            .execute(
                &Request::Borrow {
                    catalog_id,
                    patron_id: staff,
                },
                date(2025, 1, 1),
                &mut dispatcher,
            )
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Loan(LoanError::QuotaExceeded { quota: 0, .. })
        ));
        assert_eq!(engine.ledger().available_copies(catalog_id).unwrap(), 2);
        assert_eq!(engine.ledger().title(catalog_id).unwrap().borrow_count, 0);
    }

    #[test]
    fn availability_never_leaves_bounds_over_a_borrow_return_sequence() {
        let mut engine = CirculationEngine::new(CirculationConfig::default());
        let catalog_id = engine.add_title(Title::new("Dune", "Frank Herbert", 3));
        let faculty = engine.register_patron(Patron::new("F", PatronCategory::Faculty));
        let mut dispatcher = MemoryDispatcher::new();
        let today = date(2025, 1, 1);

        let mut open = Vec::new();
        for step in 0..20 {
            let total = engine.ledger().title(catalog_id).unwrap().total_copies;
            let available = engine.ledger().available_copies(catalog_id).unwrap();
            assert!(available <= total);

            // Alternate bursts of borrows and returns, tolerating
            // expected refusals at the edges
            if step % 3 == 0 && !open.is_empty() {
                let loan_id = open.remove(0);
                engine
                    .execute(&Request::Return { loan_id }, today, &mut dispatcher)
                    .unwrap();
            } else {
                let result = engine.execute(
                    &Request::Borrow {
                        catalog_id,
                        patron_id: faculty,
                    },
                    today,
                    &mut dispatcher,
                );
                if let Ok(Outcome::Borrowed { loan_id, .. }) = result {
                    open.push(loan_id);
                }
            }
        }

        let available = engine.ledger().available_copies(catalog_id).unwrap();
        assert!(available <= 3);
        assert_eq!(available, 3 - open.len() as u32);
    }

    #[test]
    fn terminal_title_is_neither_borrowable_nor_reservable() {
        let (mut engine, catalog_id, p1, _) = engine_with_single_copy();
        let mut dispatcher = MemoryDispatcher::new();

        engine
            .execute(
                &Request::MarkTerminal {
                    catalog_id,
                    mark: TerminalMark::Damaged,
                },
                date(2025, 1, 1),
                &mut dispatcher,
            )
            .unwrap();

        let borrow_err = engine
            .execute(
                &Request::Borrow {
                    catalog_id,
                    patron_id: p1,
                },
                date(2025, 1, 1),
                &mut dispatcher,
            )
            .unwrap_err();
        assert_eq!(
            borrow_err,
            EngineError::Loan(LoanError::TitleUnavailable(catalog_id))
        );

        let reserve_err = engine
            .execute(
                &Request::Reserve {
                    catalog_id,
                    patron_id: p1,
                },
                date(2025, 1, 1),
                &mut dispatcher,
            )
            .unwrap_err();
        assert_eq!(
            reserve_err,
            EngineError::Reservation(ReservationError::TitleUnavailable(catalog_id))
        );

        engine
            .execute(
                &Request::ClearTerminal { catalog_id },
                date(2025, 1, 1),
                &mut dispatcher,
            )
            .unwrap();
        assert!(engine.ledger().is_available(catalog_id).unwrap());
    }

    #[test]
    fn requests_deserialize_from_tagged_json() {
        let raw = format!(
            r#"{{ "op": "borrow", "catalogId": "{}", "patronId": "{}" }}"#,
            uuid::Uuid::nil(),
            uuid::Uuid::nil()
        );

        let request: Request = serde_json::from_str(&raw).unwrap();
        assert!(matches!(request, Request::Borrow { .. }));
    }
}
