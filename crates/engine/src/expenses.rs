//! Personal expenses.
//!
//! An [`Expense`] with a recurrence pattern is the anchor of a series; the
//! occurrences generated from it are plain expenses that carry the anchor's
//! id in `anchor_id`. The pair `(anchor_id, occurred_at)` is unique in
//! storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, RecurrencePattern, ResultEngine,
    util::normalize_required_name,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub amount: MoneyCents,
    pub description: String,
    pub category_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
    pub recurrence: Option<RecurrencePattern>,
    /// Set on generated occurrences: the recurring expense they came from.
    pub anchor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(
        amount: MoneyCents,
        description: &str,
        category_id: Option<Uuid>,
        occurred_at: DateTime<Utc>,
        recurrence: Option<RecurrencePattern>,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be greater than 0".to_string(),
            ));
        }
        let description = normalize_required_name(description, "expense")?;
        Ok(Self {
            id: Uuid::new_v4(),
            amount,
            description,
            category_id,
            occurred_at,
            recurrence,
            anchor_id: None,
            created_at: Utc::now(),
        })
    }

    #[must_use]
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub amount_minor: i64,
    pub description: String,
    pub category_id: Option<Uuid>,
    pub occurred_at: DateTimeUtc,
    pub recurrence: Option<String>,
    pub anchor_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Category,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id),
            amount_minor: ActiveValue::Set(expense.amount.cents()),
            description: ActiveValue::Set(expense.description.clone()),
            category_id: ActiveValue::Set(expense.category_id),
            occurred_at: ActiveValue::Set(expense.occurred_at),
            recurrence: ActiveValue::Set(expense.recurrence.map(|p| p.as_str().to_string())),
            anchor_id: ActiveValue::Set(expense.anchor_id),
            created_at: ActiveValue::Set(expense.created_at),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            amount: MoneyCents::new(model.amount_minor),
            description: model.description,
            category_id: model.category_id,
            occurred_at: model.occurred_at,
            recurrence: RecurrencePattern::parse_optional(model.recurrence.as_deref())?,
            anchor_id: model.anchor_id,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn new_validates_amount_and_description() {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            Expense::new(MoneyCents::new(-5), "Rent", None, date, None).unwrap_err(),
            EngineError::InvalidAmount("amount must be greater than 0".to_string())
        );
        assert!(matches!(
            Expense::new(MoneyCents::new(500), "  ", None, date, None),
            Err(EngineError::InvalidName(_))
        ));

        let rent = Expense::new(
            MoneyCents::new(90_000),
            " Rent ",
            None,
            date,
            Some(RecurrencePattern::Monthly),
        )
        .unwrap();
        assert_eq!(rent.description, "Rent");
        assert!(rent.is_recurring());
        assert_eq!(rent.anchor_id, None);
    }

    #[test]
    fn stored_unknown_pattern_is_rejected() {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let model = Model {
            id: Uuid::new_v4(),
            amount_minor: 100,
            description: "Gym".to_string(),
            category_id: None,
            occurred_at: date,
            recurrence: Some("fortnightly".to_string()),
            anchor_id: None,
            created_at: date,
        };
        assert_eq!(
            Expense::try_from(model).unwrap_err(),
            EngineError::InvalidPattern("fortnightly".to_string())
        );
    }
}
