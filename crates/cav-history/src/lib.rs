//! cav-history: bounded multi-channel time-series storage.

pub mod store;

pub use store::{HistorySnapshot, HistoryStore, Sample};
