use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    Category, ResultEngine,
    reports::{
        Budget, BudgetPeriod, BudgetProgress, CategoryShare, ExpenseSummary, LabeledAmount,
        TrendBucket, TrendGrouping, budget_progress, category_breakdown, spending_trend,
        summarize,
    },
    store::{CategoryStore, ExpenseFilter, ExpenseStore},
};

use super::Engine;

/// Monthly budget status of one category.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryBudget {
    pub category: Category,
    pub progress: BudgetProgress,
}

impl Engine {
    /// Expenses matching `filter` with their category names resolved.
    pub async fn labeled_expenses(&self, filter: &ExpenseFilter) -> ResultEngine<Vec<LabeledAmount>> {
        let names: HashMap<Uuid, String> = self
            .list_categories()
            .await?
            .into_iter()
            .map(|category| (category.id, category.name))
            .collect();

        let expenses = self.list_by_filter(filter).await?;
        Ok(expenses
            .into_iter()
            .map(|expense| LabeledAmount {
                label: expense.category_id.and_then(|id| names.get(&id).cloned()),
                amount: expense.amount,
                occurred_at: expense.occurred_at,
            })
            .collect())
    }

    pub async fn category_report(&self, filter: &ExpenseFilter) -> ResultEngine<Vec<CategoryShare>> {
        let items = self.labeled_expenses(filter).await?;
        Ok(category_breakdown(&items))
    }

    pub async fn expense_summary(&self, filter: &ExpenseFilter) -> ResultEngine<ExpenseSummary> {
        let items = self.labeled_expenses(filter).await?;
        Ok(summarize(&items))
    }

    pub async fn spending_trend(
        &self,
        filter: &ExpenseFilter,
        grouping: TrendGrouping,
    ) -> ResultEngine<Vec<TrendBucket>> {
        let items = self.labeled_expenses(filter).await?;
        spending_trend(&items, grouping)
    }

    /// Progress of every category with a budget limit in the month of `now`.
    pub async fn budget_overview(&self, now: DateTime<Utc>) -> ResultEngine<Vec<CategoryBudget>> {
        let mut overview = Vec::new();
        for category in self.list_categories().await? {
            let Some(limit) = category.budget_limit else {
                continue;
            };
            let budget = Budget {
                category_id: Some(category.id),
                amount: limit,
                period: BudgetPeriod::Monthly,
            };
            let (start, end) = budget.current_window(now)?;
            let filter = ExpenseFilter {
                from: Some(start),
                category_id: Some(category.id),
                ..ExpenseFilter::default()
            };
            let spent = self
                .list_by_filter(&filter)
                .await?
                .iter()
                .filter(|expense| expense.occurred_at < end)
                .map(|expense| expense.amount)
                .sum();
            overview.push(CategoryBudget {
                progress: budget_progress(&budget, spent),
                category,
            });
        }
        Ok(overview)
    }
}
