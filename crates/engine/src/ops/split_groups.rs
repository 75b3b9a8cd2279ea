use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ParticipantId, ResultEngine, SplitExpense, SplitGroup, participants,
    split_expenses, split_groups, split_shares, store::SplitGroupStore,
    util::normalize_required_name,
};

use super::{Engine, with_tx};

impl SplitGroupStore for Engine {
    async fn list_groups(&self) -> ResultEngine<Vec<SplitGroup>> {
        let models = split_groups::Entity::find()
            .order_by_asc(split_groups::Column::Date)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(SplitGroup::from).collect())
    }

    async fn create_group(&self, name: &str, date: DateTime<Utc>) -> ResultEngine<SplitGroup> {
        let group = SplitGroup::new(normalize_required_name(name, "group")?, date);
        split_groups::ActiveModel::from(&group)
            .insert(&self.database)
            .await?;
        Ok(group)
    }

    async fn add_split_expense(&self, expense: SplitExpense) -> ResultEngine<SplitExpense> {
        expense.validate()?;

        with_tx!(self, |db_tx| {
            if split_groups::Entity::find_by_id(expense.group_id)
                .one(&db_tx)
                .await?
                .is_none()
            {
                return Err(EngineError::KeyNotFound(format!(
                    "group {}",
                    expense.group_id
                )));
            }

            let referenced: Vec<ParticipantId> = std::iter::once(expense.paid_by)
                .chain(expense.split_among.iter().copied())
                .collect();
            let known: HashSet<ParticipantId> = participants::Entity::find()
                .filter(participants::Column::Id.is_in(referenced.clone()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|model| model.id)
                .collect();
            if let Some(unknown) = referenced.iter().find(|id| !known.contains(id)) {
                return Err(EngineError::UnknownParticipant(unknown.to_string()));
            }

            split_expenses::ActiveModel::from(&expense)
                .insert(&db_tx)
                .await?;
            let shares = expense
                .split_among
                .iter()
                .enumerate()
                .map(|(position, participant_id)| split_shares::ActiveModel {
                    split_expense_id: ActiveValue::Set(expense.id),
                    participant_id: ActiveValue::Set(*participant_id),
                    position: ActiveValue::Set(position as i64),
                });
            split_shares::Entity::insert_many(shares)
                .exec(&db_tx)
                .await?;
            Ok(expense)
        })
    }

    async fn group_expenses(&self, group_id: Uuid) -> ResultEngine<Vec<SplitExpense>> {
        let rows = split_expenses::Entity::find()
            .filter(split_expenses::Column::GroupId.eq(group_id))
            .order_by_asc(split_expenses::Column::OccurredAt)
            .find_with_related(split_shares::Entity)
            .all(&self.database)
            .await?;
        Ok(rows.into_iter().map(SplitExpense::from).collect())
    }

    async fn all_split_expenses(&self) -> ResultEngine<Vec<SplitExpense>> {
        let rows = split_expenses::Entity::find()
            .order_by_asc(split_expenses::Column::OccurredAt)
            .find_with_related(split_shares::Entity)
            .all(&self.database)
            .await?;
        Ok(rows.into_iter().map(SplitExpense::from).collect())
    }

    async fn delete_split_expense(&self, id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            split_shares::Entity::delete_many()
                .filter(split_shares::Column::SplitExpenseId.eq(id))
                .exec(&db_tx)
                .await?;
            let result = split_expenses::Entity::delete_by_id(id)
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::KeyNotFound(format!(
                    "split expense {id}"
                )));
            }
            Ok(())
        })
    }
}
