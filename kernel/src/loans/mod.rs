// Loan Lifecycle
//
// Orchestrates borrow, return and renew. A loan has exactly two
// states: OPEN on creation, CLOSED on return, nothing after that.
// Closed loans are never deleted; the history is append-only.

use std::collections::HashMap;

use chrono::{Days, NaiveDate};

use crate::catalog::{CatalogId, Loan, LoanId, Patron, PatronId};
use crate::ledger::{BookAvailabilityLedger, LedgerError};
use crate::notify::NotificationDispatcher;
use crate::penalty;
use crate::policy::CirculationConfig;
use crate::reservations::ReservationQueueManager;

/// Errors produced by loan operations.
///
/// Each one leaves every entity unchanged.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LoanError {
    #[error("patron {patron_id:?} is at quota ({quota})")]
    QuotaExceeded { patron_id: PatronId, quota: u32 },

    #[error("title {0:?} is not available for borrowing")]
    TitleUnavailable(CatalogId),

    #[error("loan {0:?} is already closed")]
    AlreadyClosed(LoanId),

    #[error("renewal blocked: title {0:?} has waiting reservations")]
    RenewalBlocked(CatalogId),

    #[error("unknown loan: {0:?}")]
    UnknownLoan(LoanId),

    #[error("unknown patron: {0:?}")]
    UnknownPatron(PatronId),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// What a completed return recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnReceipt {
    pub days_late: i64,
    pub penalty: f64,
}

#[derive(Debug, Default)]
pub struct LoanLifecycleManager {
    config: CirculationConfig,
    patrons: HashMap<PatronId, Patron>,
    loans: HashMap<LoanId, Loan>,
}

impl LoanLifecycleManager {
    pub fn new(config: CirculationConfig) -> Self {
        Self {
            config,
            patrons: HashMap::new(),
            loans: HashMap::new(),
        }
    }

    pub fn config(&self) -> &CirculationConfig {
        &self.config
    }

    pub fn register_patron(&mut self, patron: Patron) -> PatronId {
        let patron_id = patron.patron_id;
        self.patrons.insert(patron_id, patron);
        patron_id
    }

    pub fn patron(&self, patron_id: PatronId) -> Option<&Patron> {
        self.patrons.get(&patron_id)
    }

    pub fn loan(&self, loan_id: LoanId) -> Option<&Loan> {
        self.loans.get(&loan_id)
    }

    /// Full loan history for a patron, oldest issue first.
    ///
    /// Same-day loans order by id so the listing is deterministic.
    pub fn loans_for_patron(&self, patron_id: PatronId) -> Vec<&Loan> {
        let mut loans: Vec<&Loan> = self
            .loans
            .values()
            .filter(|l| l.patron_id == patron_id)
            .collect();
        loans.sort_by_key(|l| (l.issue_date, l.loan_id));
        loans
    }

    /// Issue a copy to a patron.
    ///
    /// Checks run in order: quota, then availability; nothing mutates
    /// until both pass.
    pub fn borrow(
        &mut self,
        ledger: &mut BookAvailabilityLedger,
        catalog_id: CatalogId,
        patron_id: PatronId,
        today: NaiveDate,
    ) -> Result<Loan, LoanError> {
        let patron = self
            .patrons
            .get_mut(&patron_id)
            .ok_or(LoanError::UnknownPatron(patron_id))?;

        let quota = self.config.quotas.quota_for(patron.category);
        if patron.open_loan_ids.len() >= quota as usize {
            return Err(LoanError::QuotaExceeded { patron_id, quota });
        }

        if !ledger.is_available(catalog_id)? {
            return Err(LoanError::TitleUnavailable(catalog_id));
        }
        ledger.reserve_copy(catalog_id)?;

        let loan = Loan {
            loan_id: LoanId::random(),
            catalog_id,
            patron_id,
            issue_date: today,
            due_date: today + Days::new(u64::from(self.config.loan_period_days)),
            return_date: None,
            penalty: 0.0,
        };

        patron.open_loan_ids.push(loan.loan_id);
        patron.lifetime_borrow_count += 1;
        self.loans.insert(loan.loan_id, loan.clone());

        Ok(loan)
    }

    /// Close a loan, record any penalty, and hand the freed copy to
    /// the reservation queue for notification.
    ///
    /// The queue peek runs unconditionally after every return; it is a
    /// no-op when the queue is empty.
    pub fn return_loan(
        &mut self,
        ledger: &mut BookAvailabilityLedger,
        queues: &ReservationQueueManager,
        dispatcher: &mut dyn NotificationDispatcher,
        loan_id: LoanId,
        today: NaiveDate,
    ) -> Result<ReturnReceipt, LoanError> {
        let (catalog_id, patron_id, due_date) = {
            let loan = self
                .loans
                .get(&loan_id)
                .ok_or(LoanError::UnknownLoan(loan_id))?;
            if !loan.is_open() {
                return Err(LoanError::AlreadyClosed(loan_id));
            }
            (loan.catalog_id, loan.patron_id, loan.due_date)
        };

        if !self.patrons.contains_key(&patron_id) {
            return Err(LoanError::UnknownPatron(patron_id));
        }

        // Release first: a defensive ledger failure must leave the
        // loan and patron untouched.
        ledger.release_copy(catalog_id)?;

        let days_late = penalty::days_late(today, due_date);
        let amount = penalty::penalty(days_late, self.config.penalty_rate_per_day);

        if let Some(loan) = self.loans.get_mut(&loan_id) {
            loan.return_date = Some(today);
            loan.penalty = amount;
        }
        if let Some(patron) = self.patrons.get_mut(&patron_id) {
            patron.open_loan_ids.retain(|id| *id != loan_id);
        }

        queues.on_title_released(ledger, dispatcher, catalog_id, today)?;

        Ok(ReturnReceipt {
            days_late,
            penalty: amount,
        })
    }

    /// Extend an open loan by the configured period from `today`.
    ///
    /// Refused while anyone is waiting on the title, so renewals
    /// cannot starve the queue.
    pub fn renew(
        &mut self,
        queues: &ReservationQueueManager,
        loan_id: LoanId,
        today: NaiveDate,
    ) -> Result<NaiveDate, LoanError> {
        let catalog_id = {
            let loan = self
                .loans
                .get(&loan_id)
                .ok_or(LoanError::UnknownLoan(loan_id))?;
            if !loan.is_open() {
                return Err(LoanError::AlreadyClosed(loan_id));
            }
            loan.catalog_id
        };

        if queues.queue_len(catalog_id) > 0 {
            return Err(LoanError::RenewalBlocked(catalog_id));
        }

        let due_date = today + Days::new(u64::from(self.config.loan_period_days));
        if let Some(loan) = self.loans.get_mut(&loan_id) {
            loan.due_date = due_date;
        }

        Ok(due_date)
    }

    /// Days a loan is past due as of `today`. Pure query; usable on
    /// open loans for reporting.
    pub fn detect_overdue(&self, loan_id: LoanId, today: NaiveDate) -> Result<i64, LoanError> {
        let loan = self
            .loans
            .get(&loan_id)
            .ok_or(LoanError::UnknownLoan(loan_id))?;
        Ok(penalty::days_late(today, loan.due_date))
    }
}
