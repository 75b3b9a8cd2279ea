//! Initial schema migration - creates all tables from scratch.
//!
//! - `categories`: expense categories with an optional monthly budget
//! - `expenses`: personal expenses, recurring anchors and their occurrences
//! - `participants`: people sharing expenses
//! - `split_groups`: named, dated buckets of shared expenses
//! - `split_expenses`: shared expenses paid by one participant
//! - `split_shares`: members each shared expense is split among

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    Name,
    NameNorm,
    Icon,
    Color,
    BudgetLimitMinor,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    AmountMinor,
    Description,
    CategoryId,
    OccurredAt,
    Recurrence,
    AnchorId,
    CreatedAt,
}

#[derive(Iden)]
enum Participants {
    Table,
    Id,
    Name,
    Position,
}

#[derive(Iden)]
enum SplitGroups {
    Table,
    Id,
    Name,
    Date,
}

#[derive(Iden)]
enum SplitExpenses {
    Table,
    Id,
    GroupId,
    Description,
    AmountMinor,
    Category,
    PaidBy,
    OccurredAt,
}

#[derive(Iden)]
enum SplitShares {
    Table,
    SplitExpenseId,
    ParticipantId,
    Position,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::NameNorm).string().not_null())
                    .col(ColumnDef::new(Categories::Icon).string())
                    .col(ColumnDef::new(Categories::Color).string())
                    .col(ColumnDef::new(Categories::BudgetLimitMinor).big_integer())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-name_norm-unique")
                    .table(Categories::Table)
                    .col(Categories::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Expenses::Description).string().not_null())
                    .col(ColumnDef::new(Expenses::CategoryId).blob())
                    .col(ColumnDef::new(Expenses::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Expenses::Recurrence).string())
                    .col(ColumnDef::new(Expenses::AnchorId).blob())
                    .col(ColumnDef::new(Expenses::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-category_id")
                            .from(Expenses::Table, Expenses::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // One stored occurrence per anchor and date. Rows without an anchor
        // have a NULL `anchor_id` and never collide.
        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-anchor_id-occurred_at-unique")
                    .table(Expenses::Table)
                    .col(Expenses::AnchorId)
                    .col(Expenses::OccurredAt)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-occurred_at")
                    .table(Expenses::Table)
                    .col(Expenses::OccurredAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Participants
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Participants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Participants::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Participants::Name).string().not_null())
                    .col(ColumnDef::new(Participants::Position).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Split groups
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SplitGroups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SplitGroups::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SplitGroups::Name).string().not_null())
                    .col(ColumnDef::new(SplitGroups::Date).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Split expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SplitExpenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SplitExpenses::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SplitExpenses::GroupId).blob().not_null())
                    .col(ColumnDef::new(SplitExpenses::Description).string().not_null())
                    .col(
                        ColumnDef::new(SplitExpenses::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SplitExpenses::Category).string().not_null())
                    .col(ColumnDef::new(SplitExpenses::PaidBy).blob().not_null())
                    .col(ColumnDef::new(SplitExpenses::OccurredAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-split_expenses-group_id")
                            .from(SplitExpenses::Table, SplitExpenses::GroupId)
                            .to(SplitGroups::Table, SplitGroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-split_expenses-paid_by")
                            .from(SplitExpenses::Table, SplitExpenses::PaidBy)
                            .to(Participants::Table, Participants::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-split_expenses-group_id")
                    .table(SplitExpenses::Table)
                    .col(SplitExpenses::GroupId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Split shares
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SplitShares::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SplitShares::SplitExpenseId).blob().not_null())
                    .col(ColumnDef::new(SplitShares::ParticipantId).blob().not_null())
                    .col(ColumnDef::new(SplitShares::Position).big_integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(SplitShares::SplitExpenseId)
                            .col(SplitShares::ParticipantId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-split_shares-split_expense_id")
                            .from(SplitShares::Table, SplitShares::SplitExpenseId)
                            .to(SplitExpenses::Table, SplitExpenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-split_shares-participant_id")
                            .from(SplitShares::Table, SplitShares::ParticipantId)
                            .to(Participants::Table, Participants::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-split_shares-participant_id")
                    .table(SplitShares::Table)
                    .col(SplitShares::ParticipantId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(SplitShares::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SplitExpenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SplitGroups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Participants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        Ok(())
    }
}
