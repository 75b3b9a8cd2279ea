use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    Expense, ResultEngine,
    recurrence::upcoming_within,
    store::{ExpenseStore, GenerationReport, materialize_recurring},
};

use super::Engine;

/// A recurring expense and the date it is next due.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScheduledExpense {
    pub expense: Expense,
    pub next_date: DateTime<Utc>,
}

impl Engine {
    /// Persist every due occurrence of the recurring expenses.
    pub async fn generate_recurring(&self, now: DateTime<Utc>) -> ResultEngine<GenerationReport> {
        materialize_recurring(self, now).await
    }

    /// Recurring expenses due within `horizon_days` of `now`, soonest first.
    pub async fn upcoming(
        &self,
        horizon_days: u32,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<ScheduledExpense>> {
        let recurring = self.list_recurring().await?;
        let upcoming = upcoming_within(&recurring, horizon_days, now)?
            .into_iter()
            .map(|item| ScheduledExpense {
                expense: item.expense.clone(),
                next_date: item.next_date,
            })
            .collect();
        Ok(upcoming)
    }
}
