//! Intent detection: one ordered keyword rule table, consumed by both the
//! classifier (with exclusions) and the retriever (keywords plus extras).

pub mod classifier;
pub mod rules;

pub use classifier::classify;
