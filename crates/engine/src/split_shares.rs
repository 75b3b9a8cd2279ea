//! Membership rows of a split expense: one row per participant sharing it.
//!
//! `position` keeps the order in which members were listed.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "split_shares")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub split_expense_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub participant_id: Uuid,
    pub position: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::split_expenses::Entity",
        from = "Column::SplitExpenseId",
        to = "super::split_expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    SplitExpense,
}

impl Related<super::split_expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SplitExpense.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
