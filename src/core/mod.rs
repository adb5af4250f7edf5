//! Core business logic abstractions

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod entry;
pub mod log;
pub mod month;
pub mod rates;
pub mod resolver;
pub mod state;

// Re-export main types for cleaner imports
pub use aggregate::{ExpenseBreakdown, MonthlyBalance, MonthlyTotal};
pub use entry::{Cadence, Entry, EntryKind};
pub use month::MonthRef;
pub use rates::{MonthlyRateProvider, RateSource, RateTable};
pub use resolver::RateResolver;
