//! Database queries

pub mod journee;

pub use journee::PgJourneeStore;
