//! Core ledger rules for Payvault.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Domain types, validation rules, posting arithmetic and reconciliation math
//! live here; the storage layer decides *when* they run, never *what* they say.
//!
//! # Modules
//!
//! - `ledger` - Deposits, withdrawals, transfers and their invariants

pub mod ledger;
