//! A split group is a named, dated bucket of shared expenses (for example
//! "Day 2 in Lisbon"). Settlements can be computed per group or across all
//! groups.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitGroup {
    pub id: Uuid,
    pub name: String,
    pub date: DateTime<Utc>,
}

impl SplitGroup {
    pub fn new(name: String, date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            date,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "split_groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub date: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::split_expenses::Entity")]
    SplitExpenses,
}

impl Related<super::split_expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SplitExpenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&SplitGroup> for ActiveModel {
    fn from(group: &SplitGroup) -> Self {
        Self {
            id: ActiveValue::Set(group.id),
            name: ActiveValue::Set(group.name.clone()),
            date: ActiveValue::Set(group.date),
        }
    }
}

impl From<Model> for SplitGroup {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            date: model.date,
        }
    }
}
