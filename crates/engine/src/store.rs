//! Storage interfaces used by the workflows.
//!
//! The engines never talk to a database: they read snapshots through these
//! traits and hand results back. [`crate::Engine`] implements all of them over
//! `sea-orm`; tests can use any in-memory implementation.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    Category, EngineError, Expense, Participant, ParticipantId, ResultEngine, SplitExpense,
    SplitGroup, recurrence::generate_missing_occurrences,
};

/// Filters for listing expenses. Both date bounds are inclusive.
#[derive(Clone, Debug, Default)]
pub struct ExpenseFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub category_id: Option<Uuid>,
    /// Case-insensitive substring of the description.
    pub search: Option<String>,
}

#[allow(async_fn_in_trait)]
pub trait ExpenseStore {
    /// Matching expenses, newest first.
    async fn list_by_filter(&self, filter: &ExpenseFilter) -> ResultEngine<Vec<Expense>>;
    async fn list_recurring(&self) -> ResultEngine<Vec<Expense>>;
    async fn get(&self, id: Uuid) -> ResultEngine<Expense>;
    /// Fails with [`EngineError::Conflict`] if an occurrence of the same
    /// anchor already exists at the same date.
    async fn create(&self, expense: Expense) -> ResultEngine<Expense>;
    /// All or nothing.
    async fn create_many(&self, expenses: Vec<Expense>) -> ResultEngine<Vec<Expense>>;
    async fn delete(&self, id: Uuid) -> ResultEngine<()>;
    /// Dates of the occurrences already stored for `anchor_id`.
    async fn occurrence_dates(&self, anchor_id: Uuid) -> ResultEngine<HashSet<DateTime<Utc>>>;
}

#[allow(async_fn_in_trait)]
pub trait CategoryStore {
    async fn list_categories(&self) -> ResultEngine<Vec<Category>>;
    /// Fails with [`EngineError::ExistingKey`] if the normalised name is taken.
    async fn create_category(&self, category: Category) -> ResultEngine<Category>;
}

#[allow(async_fn_in_trait)]
pub trait ParticipantStore {
    /// Participants in the order they were added.
    async fn list_participants(&self) -> ResultEngine<Vec<Participant>>;
    async fn create_participant(&self, name: &str) -> ResultEngine<Participant>;
    /// Fails with [`EngineError::ParticipantInUse`] while any split expense
    /// references the participant.
    async fn remove_participant(&self, id: ParticipantId) -> ResultEngine<()>;
}

#[allow(async_fn_in_trait)]
pub trait SplitGroupStore {
    async fn list_groups(&self) -> ResultEngine<Vec<SplitGroup>>;
    async fn create_group(&self, name: &str, date: DateTime<Utc>) -> ResultEngine<SplitGroup>;
    async fn add_split_expense(&self, expense: SplitExpense) -> ResultEngine<SplitExpense>;
    async fn group_expenses(&self, group_id: Uuid) -> ResultEngine<Vec<SplitExpense>>;
    async fn all_split_expenses(&self) -> ResultEngine<Vec<SplitExpense>>;
    async fn delete_split_expense(&self, id: Uuid) -> ResultEngine<()>;
}

/// Outcome of one [`materialize_recurring`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub created: usize,
    /// Due occurrences that were already stored, including the ones a
    /// concurrent run inserted first.
    pub skipped: usize,
}

/// Stores every due occurrence of every recurring expense that is not stored
/// yet.
///
/// Safe to run repeatedly and concurrently: known dates are filtered out up
/// front and a [`EngineError::Conflict`] from the store counts as skipped.
pub async fn materialize_recurring<S: ExpenseStore>(
    store: &S,
    now: DateTime<Utc>,
) -> ResultEngine<GenerationReport> {
    let anchors = store.list_recurring().await?;
    let mut report = GenerationReport::default();

    for anchor in &anchors {
        let known = store.occurrence_dates(anchor.id).await?;
        report.skipped += known.iter().filter(|date| **date <= now).count();

        for occurrence in generate_missing_occurrences(anchor, now, &known)? {
            let occurred_at = occurrence.occurred_at;
            match store.create(occurrence.into_expense(now)).await {
                Ok(_) => {
                    report.created += 1;
                    debug!(anchor_id = %anchor.id, %occurred_at, "occurrence created");
                }
                Err(EngineError::Conflict(_)) => {
                    report.skipped += 1;
                    debug!(anchor_id = %anchor.id, %occurred_at, "occurrence already stored");
                }
                Err(err) => return Err(err),
            }
        }
    }

    info!(
        anchors = anchors.len(),
        created = report.created,
        skipped = report.skipped,
        "recurring expenses materialized"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;
    use crate::{MoneyCents, RecurrencePattern};

    /// Keeps expenses in memory. With `stale_reads` it reports no known
    /// dates, like a reader racing another writer.
    #[derive(Default)]
    struct MemoryStore {
        expenses: Mutex<Vec<Expense>>,
        stale_reads: bool,
    }

    impl ExpenseStore for MemoryStore {
        async fn list_by_filter(&self, _filter: &ExpenseFilter) -> ResultEngine<Vec<Expense>> {
            Ok(self.expenses.lock().unwrap().clone())
        }

        async fn list_recurring(&self) -> ResultEngine<Vec<Expense>> {
            let expenses = self.expenses.lock().unwrap();
            Ok(expenses.iter().filter(|e| e.is_recurring()).cloned().collect())
        }

        async fn get(&self, id: Uuid) -> ResultEngine<Expense> {
            let expenses = self.expenses.lock().unwrap();
            expenses
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .ok_or_else(|| EngineError::KeyNotFound(id.to_string()))
        }

        async fn create(&self, expense: Expense) -> ResultEngine<Expense> {
            let mut expenses = self.expenses.lock().unwrap();
            if expense.anchor_id.is_some()
                && expenses.iter().any(|e| {
                    e.anchor_id == expense.anchor_id && e.occurred_at == expense.occurred_at
                })
            {
                return Err(EngineError::Conflict("occurrence exists".to_string()));
            }
            expenses.push(expense.clone());
            Ok(expense)
        }

        async fn create_many(&self, expenses: Vec<Expense>) -> ResultEngine<Vec<Expense>> {
            let mut created = Vec::new();
            for expense in expenses {
                created.push(self.create(expense).await?);
            }
            Ok(created)
        }

        async fn delete(&self, id: Uuid) -> ResultEngine<()> {
            self.expenses.lock().unwrap().retain(|e| e.id != id);
            Ok(())
        }

        async fn occurrence_dates(&self, anchor_id: Uuid) -> ResultEngine<HashSet<DateTime<Utc>>> {
            if self.stale_reads {
                return Ok(HashSet::new());
            }
            let expenses = self.expenses.lock().unwrap();
            Ok(expenses
                .iter()
                .filter(|e| e.anchor_id == Some(anchor_id))
                .map(|e| e.occurred_at)
                .collect())
        }
    }

    fn rent(store: &MemoryStore) -> Expense {
        let anchor = Expense::new(
            MoneyCents::new(90_000),
            "Rent",
            None,
            Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(),
            Some(RecurrencePattern::Monthly),
        )
        .unwrap();
        store.expenses.lock().unwrap().push(anchor.clone());
        anchor
    }

    #[tokio::test]
    async fn second_run_creates_nothing() {
        let store = MemoryStore::default();
        let anchor = rent(&store);
        let now = Utc.with_ymd_and_hms(2024, 4, 15, 0, 0, 0).unwrap();

        let first = materialize_recurring(&store, now).await.unwrap();
        assert_eq!(first, GenerationReport { created: 2, skipped: 0 });

        let second = materialize_recurring(&store, now).await.unwrap();
        assert_eq!(second, GenerationReport { created: 0, skipped: 2 });

        let dates = store.occurrence_dates(anchor.id).await.unwrap();
        assert_eq!(dates.len(), 2);
        assert!(dates.contains(&Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()));
        assert!(dates.contains(&Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap()));
    }

    #[tokio::test]
    async fn conflicts_count_as_skipped() {
        let store = MemoryStore {
            stale_reads: true,
            ..MemoryStore::default()
        };
        rent(&store);
        let now = Utc.with_ymd_and_hms(2024, 4, 15, 0, 0, 0).unwrap();

        materialize_recurring(&store, now).await.unwrap();
        let rerun = materialize_recurring(&store, now).await.unwrap();
        assert_eq!(rerun, GenerationReport { created: 0, skipped: 2 });
        // Anchor plus two occurrences.
        assert_eq!(store.expenses.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn occurrences_do_not_recur() {
        let store = MemoryStore::default();
        let anchor = rent(&store);
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap();

        materialize_recurring(&store, now).await.unwrap();
        let recurring = store.list_recurring().await.unwrap();
        assert_eq!(recurring, vec![anchor.clone()]);

        let all = store.list_by_filter(&ExpenseFilter::default()).await.unwrap();
        let occurrence = all.iter().find(|e| e.anchor_id == Some(anchor.id)).unwrap();
        assert_eq!(occurrence.recurrence, None);
        assert_eq!(occurrence.amount, anchor.amount);
        assert_eq!(occurrence.description, "Rent");
    }
}
