//! Shared-expense settlement and recurring-expense scheduling.
//!
//! The engines ([`settlement`], [`recurrence`], [`reports`]) are pure
//! functions over snapshots. [`Engine`] is the `sea-orm` backed store that
//! feeds them and persists what they produce.

pub use categories::Category;
pub use error::EngineError;
pub use expenses::Expense;
pub use money::MoneyCents;
pub use ops::{CategoryBudget, Engine, EngineBuilder, ScheduledExpense, Settlement};
pub use participants::{Participant, ParticipantId};
pub use recurrence::{Occurrence, RecurrencePattern, Upcoming};
pub use split_expenses::SplitExpense;
pub use split_groups::SplitGroup;
pub use store::{
    CategoryStore, ExpenseFilter, ExpenseStore, GenerationReport, ParticipantStore,
    SplitGroupStore,
};

mod categories;
mod error;
mod expenses;
pub mod money;
mod ops;
mod participants;
pub mod recurrence;
pub mod reports;
pub mod settlement;
mod split_expenses;
mod split_groups;
mod split_shares;
pub mod store;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
