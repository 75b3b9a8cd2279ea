use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
};
use uuid::Uuid;

use crate::{
    EngineError, Expense, ResultEngine, categories, expenses,
    store::{ExpenseFilter, ExpenseStore},
    util::normalize_optional_text,
};

use super::{Engine, on_unique_violation, with_tx};

fn validate_filter(filter: &ExpenseFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from > to
    {
        return Err(EngineError::DateOutOfRange(
            "invalid range: from must be <= to".to_string(),
        ));
    }
    Ok(())
}

/// `LOWER(description) LIKE '%needle%' ESCAPE '\\'`, with `%` and `_` in the
/// needle matched literally.
fn description_contains(needle: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
    Expr::expr(Func::lower(Expr::col(expenses::Column::Description)))
        .like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}

const LIKE_ESCAPE: char = '\\';

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

async fn insert_expense<C: ConnectionTrait>(db: &C, expense: &Expense) -> ResultEngine<()> {
    if let Some(category_id) = expense.category_id
        && categories::Entity::find_by_id(category_id)
            .one(db)
            .await?
            .is_none()
    {
        return Err(EngineError::KeyNotFound(format!(
            "category {category_id}"
        )));
    }

    expenses::ActiveModel::from(expense)
        .insert(db)
        .await
        .map_err(|err| {
            on_unique_violation(err, || {
                EngineError::Conflict(format!(
                    "occurrence of {} on {} already exists",
                    expense.anchor_id.unwrap_or_default(),
                    expense.occurred_at.date_naive()
                ))
            })
        })?;
    Ok(())
}

fn into_expenses(models: Vec<expenses::Model>) -> ResultEngine<Vec<Expense>> {
    models.into_iter().map(Expense::try_from).collect()
}

impl ExpenseStore for Engine {
    async fn list_by_filter(&self, filter: &ExpenseFilter) -> ResultEngine<Vec<Expense>> {
        validate_filter(filter)?;

        let mut query = expenses::Entity::find();
        if let Some(from) = filter.from {
            query = query.filter(expenses::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(expenses::Column::OccurredAt.lte(to));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(expenses::Column::CategoryId.eq(category_id));
        }
        if let Some(search) = normalize_optional_text(filter.search.as_deref()) {
            query = query.filter(description_contains(&search));
        }

        let models = query
            .order_by_desc(expenses::Column::OccurredAt)
            .order_by_desc(expenses::Column::CreatedAt)
            .all(&self.database)
            .await?;
        into_expenses(models)
    }

    async fn list_recurring(&self) -> ResultEngine<Vec<Expense>> {
        let models = expenses::Entity::find()
            .filter(expenses::Column::Recurrence.is_not_null())
            .order_by_asc(expenses::Column::OccurredAt)
            .all(&self.database)
            .await?;
        into_expenses(models)
    }

    async fn get(&self, id: Uuid) -> ResultEngine<Expense> {
        let model = expenses::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("expense {id}")))?;
        Expense::try_from(model)
    }

    async fn create(&self, expense: Expense) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            insert_expense(&db_tx, &expense).await?;
            Ok(expense)
        })
    }

    async fn create_many(&self, expenses: Vec<Expense>) -> ResultEngine<Vec<Expense>> {
        with_tx!(self, |db_tx| {
            for expense in &expenses {
                insert_expense(&db_tx, expense).await?;
            }
            Ok(expenses)
        })
    }

    async fn delete(&self, id: Uuid) -> ResultEngine<()> {
        let result = expenses::Entity::delete_by_id(id)
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(format!("expense {id}")));
        }
        Ok(())
    }

    async fn occurrence_dates(&self, anchor_id: Uuid) -> ResultEngine<HashSet<DateTime<Utc>>> {
        let dates: Vec<DateTime<Utc>> = expenses::Entity::find()
            .select_only()
            .column(expenses::Column::OccurredAt)
            .filter(expenses::Column::AnchorId.eq(anchor_id))
            .into_tuple()
            .all(&self.database)
            .await?;
        Ok(dates.into_iter().collect())
    }
}
