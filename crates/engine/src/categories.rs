//! Expense categories.
//!
//! `name_norm` is the folded form of the name used for uniqueness, so "Food"
//! and " food " are the same category.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine,
    util::{normalize_optional_text, normalize_required_name},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    /// Monthly spending limit, if the category is budgeted.
    pub budget_limit: Option<MoneyCents>,
}

impl Category {
    pub fn new(
        name: &str,
        icon: Option<&str>,
        color: Option<&str>,
        budget_limit: Option<MoneyCents>,
    ) -> ResultEngine<Self> {
        if budget_limit.is_some_and(|limit| !limit.is_positive()) {
            return Err(EngineError::InvalidAmount(
                "budget limit must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: normalize_required_name(name, "category")?,
            icon: normalize_optional_text(icon),
            color: normalize_optional_text(color),
            budget_limit,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub name_norm: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub budget_limit_minor: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn from_category(category: &Category, name_norm: String) -> Self {
        Self {
            id: ActiveValue::Set(category.id),
            name: ActiveValue::Set(category.name.clone()),
            name_norm: ActiveValue::Set(name_norm),
            icon: ActiveValue::Set(category.icon.clone()),
            color: ActiveValue::Set(category.color.clone()),
            budget_limit_minor: ActiveValue::Set(category.budget_limit.map(MoneyCents::cents)),
        }
    }
}

impl From<Model> for Category {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            icon: model.icon,
            color: model.color,
            budget_limit: model.budget_limit_minor.map(MoneyCents::new),
        }
    }
}
