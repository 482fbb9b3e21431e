//! Converges one provider record to the desired state.
//!
//! Every operation runs the same sequential pipeline: resolve the record
//! value (literal data or the current public IP), look up the zone, look up
//! the record, pick an [`Action`], and apply it through the
//! [`DnsProvider`](crate::dns::DnsProvider).

mod error;
mod operations;
mod reconcile;

pub use error::{BoxError, EngineError, RecordContext, Stage};
pub use reconcile::{
    decide, Action, DesiredRecord, InvalidRecord, Outcome, ReconciliationContext, Reconciler,
    DEFAULT_TTL,
};
