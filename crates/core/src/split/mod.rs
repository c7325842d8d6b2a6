//! Split allocation.
//!
//! Turns a transaction amount, a split policy and the included members into
//! per-member resolved amounts that sum exactly to the amount.

pub mod allocator;

#[cfg(test)]
mod allocator_props;

pub use allocator::{Allocation, Participant, SplitAllocator, SplitRequest};
