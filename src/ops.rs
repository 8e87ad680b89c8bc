//! Operators.
//!
//! Single-producer operators (`map`, `filter`, `take`, `take_last`, the
//! aggregates) wrap the downstream observer directly. Operators fed by more
//! than one producer at a time (`merge`, `merge_all`, `combine_latest`,
//! `group_by`, `take_for`) route everything through a
//! [`Sink`](crate::sink::Sink). The fallback family (`catch_all`,
//! `on_error_resume_next`, `retry`) shares one trampolined engine in
//! [`fallback`].

pub mod catch;
pub mod collect;
pub mod combine_latest;
pub mod delay_subscription;
pub mod fallback;
pub mod filter;
pub mod group_by;
pub mod group_by_until;
pub mod map;
pub mod map_err;
pub mod merge;
pub mod merge_all;
pub mod order_by;
pub mod retry;
pub mod scan;
pub mod take;
pub mod take_last;
