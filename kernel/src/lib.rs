// Stacks Kernel
//
// Core circulation engine: loan lifecycle, reservation queues and
// availability accounting. This crate never logs or prints.

pub mod catalog;
pub mod engine;
pub mod ledger;
pub mod loans;
pub mod notify;
pub mod penalty;
pub mod policy;
pub mod reservations;
