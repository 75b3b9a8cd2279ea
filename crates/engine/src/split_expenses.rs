//! Shared expenses.
//!
//! A [`SplitExpense`] is paid in full by one participant and owed in equal
//! shares by the members of `split_among`. The payer does not have to be one
//! of the members.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ParticipantId, ResultEngine, split_shares};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitExpense {
    pub id: Uuid,
    pub description: String,
    pub amount: MoneyCents,
    pub category: String,
    pub paid_by: ParticipantId,
    pub split_among: Vec<ParticipantId>,
    pub date: DateTime<Utc>,
    pub group_id: Uuid,
}

impl SplitExpense {
    /// Build a validated split expense with a fresh id.
    pub fn new(
        group_id: Uuid,
        description: String,
        amount: MoneyCents,
        category: String,
        paid_by: ParticipantId,
        split_among: Vec<ParticipantId>,
        date: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        let expense = Self {
            id: Uuid::new_v4(),
            description,
            amount,
            category,
            paid_by,
            split_among,
            date,
            group_id,
        };
        expense.validate()?;
        Ok(expense)
    }

    /// Check the invariants that do not depend on the roster.
    pub fn validate(&self) -> ResultEngine<()> {
        if !self.amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "split expense '{}' must have amount > 0",
                self.description
            )));
        }
        if self.split_among.is_empty() {
            return Err(EngineError::InvalidSplit(format!(
                "split expense '{}' has no members",
                self.description
            )));
        }
        let mut seen = HashSet::with_capacity(self.split_among.len());
        if let Some(dup) = self.split_among.iter().find(|id| !seen.insert(**id)) {
            return Err(EngineError::InvalidSplit(format!(
                "split expense '{}' lists {dup} more than once",
                self.description
            )));
        }
        Ok(())
    }

    /// Unrounded share of each member, in minor units.
    #[must_use]
    pub fn share_minor(&self) -> f64 {
        self.amount.as_minor_f64() / self.split_among.len() as f64
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "split_expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub group_id: Uuid,
    pub description: String,
    pub amount_minor: i64,
    pub category: String,
    pub paid_by: Uuid,
    pub occurred_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::split_groups::Entity",
        from = "Column::GroupId",
        to = "super::split_groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    SplitGroup,
    #[sea_orm(has_many = "super::split_shares::Entity")]
    Shares,
}

impl Related<super::split_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SplitGroup.def()
    }
}

impl Related<super::split_shares::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shares.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&SplitExpense> for ActiveModel {
    fn from(expense: &SplitExpense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id),
            group_id: ActiveValue::Set(expense.group_id),
            description: ActiveValue::Set(expense.description.clone()),
            amount_minor: ActiveValue::Set(expense.amount.cents()),
            category: ActiveValue::Set(expense.category.clone()),
            paid_by: ActiveValue::Set(expense.paid_by),
            occurred_at: ActiveValue::Set(expense.date),
        }
    }
}

impl From<(Model, Vec<split_shares::Model>)> for SplitExpense {
    fn from((model, mut shares): (Model, Vec<split_shares::Model>)) -> Self {
        shares.sort_by_key(|share| share.position);
        Self {
            id: model.id,
            description: model.description,
            amount: MoneyCents::new(model.amount_minor),
            category: model.category,
            paid_by: model.paid_by,
            split_among: shares.into_iter().map(|share| share.participant_id).collect(),
            date: model.occurred_at,
            group_id: model.group_id,
        }
    }
}
