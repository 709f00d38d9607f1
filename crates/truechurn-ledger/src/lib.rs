//! Churn accounting: the line-change ledger and the author/window aggregator.
//!
//! A [`Ledger`](ledger::Ledger) remembers, per file, every line address an
//! author touched inside the analysis window. The first touch of an address is
//! contribution; any later touch of the same address is churn. The
//! [`aggregate`](mod@aggregate) module replays commits through a ledger and sums the results
//! across aliases and repositories.

pub mod aggregate;
pub mod ledger;

pub use aggregate::{
    aggregate, compute_churn, plan_units, AggregateResult, ChurnRun, SkippedCommit, Unit,
    UnitFailure, UnitOutcome,
};
pub use ledger::{FileChangeMap, Ledger, LineChangeMap};
