//! One handler per CLI command. Each returns an [`Output`] for `main` to print.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use engine::{
    Category, CategoryStore, Engine, Expense, ExpenseFilter, ExpenseStore, Participant,
    ParticipantId, ParticipantStore, SplitExpense, SplitGroup, SplitGroupStore,
    money::{is_settled, round_minor},
    reports::TrendGrouping,
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{
    cli::{
        CategoryCommand, Command, ExpenseCommand, ExpenseFilterArgs, GroupBy, GroupCommand,
        ParticipantCommand, RecurringCommand, ReportCommand, SettleArgs, SplitAddArgs,
        SplitCommand,
    },
    error::{AppError, Result},
    output::Output,
    settings::Settings,
};

pub async fn run(engine: &Engine, settings: &Settings, command: Command) -> Result<Output> {
    match command {
        Command::Participant(args) => participant(engine, args.command).await,
        Command::Group(args) => group(engine, args.command).await,
        Command::Split(args) => split(engine, args.command).await,
        Command::Settle(args) => settle(engine, args).await,
        Command::Category(args) => category(engine, args.command).await,
        Command::Expense(args) => expense(engine, args.command).await,
        Command::Recurring(args) => recurring(engine, settings, args.command).await,
        Command::Report(args) => report(engine, args.command).await,
    }
}

async fn participant(engine: &Engine, command: ParticipantCommand) -> Result<Output> {
    match command {
        ParticipantCommand::Add { name } => {
            let participant = engine.create_participant(&name).await?;
            Output::message(
                format!("added participant {} ({})", participant.name, participant.id),
                &participant,
            )
        }
        ParticipantCommand::List => {
            let roster = engine.list_participants().await?;
            let rows = roster
                .iter()
                .map(|p| vec![p.id.to_string(), p.name.clone()])
                .collect();
            Output::new(vec!["id", "name"], rows, &roster)
        }
        ParticipantCommand::Remove { id } => {
            let roster = engine.list_participants().await?;
            let participant_id = resolve_participant(&roster, &id)?;
            engine.remove_participant(participant_id).await?;
            Output::message(format!("removed participant {participant_id}"), &participant_id)
        }
    }
}

async fn group(engine: &Engine, command: GroupCommand) -> Result<Output> {
    match command {
        GroupCommand::Create { name, date } => {
            let group = engine
                .create_group(&name, date.unwrap_or_else(Utc::now))
                .await?;
            Output::message(format!("created group {} ({})", group.name, group.id), &group)
        }
        GroupCommand::List => {
            let groups = engine.list_groups().await?;
            let rows = groups
                .iter()
                .map(|g| vec![g.id.to_string(), g.name.clone(), day(g.date)])
                .collect();
            Output::new(vec!["id", "name", "date"], rows, &groups)
        }
    }
}

#[derive(Serialize)]
struct SplitRow {
    id: Uuid,
    group_id: Uuid,
    date: DateTime<Utc>,
    description: String,
    category: String,
    amount: engine::MoneyCents,
    paid_by: String,
    split_among: Vec<String>,
}

async fn split(engine: &Engine, command: SplitCommand) -> Result<Output> {
    match command {
        SplitCommand::Add(args) => add_split(engine, args).await,
        SplitCommand::List { group } => {
            let expenses = match group {
                Some(key) => {
                    let group_id = resolve_group(&engine.list_groups().await?, &key)?;
                    engine.group_expenses(group_id).await?
                }
                None => engine.all_split_expenses().await?,
            };
            let names = participant_names(&engine.list_participants().await?);
            let view: Vec<SplitRow> = expenses
                .into_iter()
                .map(|e| SplitRow {
                    id: e.id,
                    group_id: e.group_id,
                    date: e.date,
                    paid_by: name_of(&names, e.paid_by),
                    split_among: e.split_among.iter().map(|id| name_of(&names, *id)).collect(),
                    description: e.description,
                    category: e.category,
                    amount: e.amount,
                })
                .collect();
            let rows = view
                .iter()
                .map(|r| {
                    vec![
                        r.id.to_string(),
                        day(r.date),
                        r.description.clone(),
                        r.category.clone(),
                        r.amount.to_string(),
                        r.paid_by.clone(),
                        r.split_among.join(", "),
                    ]
                })
                .collect();
            Output::new(
                vec!["id", "date", "description", "category", "amount", "paid by", "among"],
                rows,
                &view,
            )
        }
        SplitCommand::Remove { id } => {
            engine.delete_split_expense(id).await?;
            Output::message(format!("removed split expense {id}"), &id)
        }
    }
}

async fn add_split(engine: &Engine, args: SplitAddArgs) -> Result<Output> {
    let groups = engine.list_groups().await?;
    let group_id = resolve_group(&groups, &args.group)?;
    let group_date = groups
        .iter()
        .find(|g| g.id == group_id)
        .map(|g| g.date)
        .unwrap_or_else(Utc::now);

    let roster = engine.list_participants().await?;
    let paid_by = resolve_participant(&roster, &args.paid_by)?;
    let among = args
        .among
        .iter()
        .map(|key| resolve_participant(&roster, key))
        .collect::<Result<Vec<_>>>()?;

    let expense = SplitExpense::new(
        group_id,
        args.description.trim().to_string(),
        args.amount,
        args.category.trim().to_string(),
        paid_by,
        among,
        args.date.unwrap_or(group_date),
    )?;
    let expense = engine.add_split_expense(expense).await?;
    Output::message(
        format!("added split expense {} ({})", expense.description, expense.id),
        &expense,
    )
}

#[derive(Serialize)]
struct TransferRow {
    from_id: ParticipantId,
    from: String,
    to_id: ParticipantId,
    to: String,
    amount: engine::MoneyCents,
}

#[derive(Serialize)]
struct BalanceRow {
    participant_id: ParticipantId,
    name: String,
    paid: engine::MoneyCents,
    share: engine::MoneyCents,
    net: engine::MoneyCents,
    settled: bool,
}

async fn settle(engine: &Engine, args: SettleArgs) -> Result<Output> {
    let group_id = match args.group {
        Some(key) => Some(resolve_group(&engine.list_groups().await?, &key)?),
        None => None,
    };
    let settlement = engine.settle_group(group_id).await?;

    if args.balances {
        let view: Vec<BalanceRow> = settlement
            .summaries
            .iter()
            .map(|s| BalanceRow {
                participant_id: s.participant.id,
                name: s.participant.name.clone(),
                paid: s.paid,
                share: round_minor(s.share),
                net: round_minor(s.net),
                settled: is_settled(s.net),
            })
            .collect();
        let rows = view
            .iter()
            .map(|b| {
                let status = if b.settled {
                    "settled"
                } else if b.net.is_positive() {
                    "is owed"
                } else {
                    "owes"
                };
                vec![
                    b.name.clone(),
                    b.paid.to_string(),
                    b.share.to_string(),
                    b.net.to_string(),
                    status.to_string(),
                ]
            })
            .collect();
        return Output::new(vec!["participant", "paid", "share", "net", "status"], rows, &view);
    }

    let names: HashMap<ParticipantId, String> = settlement
        .summaries
        .iter()
        .map(|s| (s.participant.id, s.participant.name.clone()))
        .collect();
    let view: Vec<TransferRow> = settlement
        .transfers
        .iter()
        .map(|t| TransferRow {
            from_id: t.from,
            from: name_of(&names, t.from),
            to_id: t.to,
            to: name_of(&names, t.to),
            amount: t.amount,
        })
        .collect();
    let rows = view
        .iter()
        .map(|t| vec![t.from.clone(), t.to.clone(), t.amount.to_string()])
        .collect();
    Output::new(vec!["from", "to", "amount"], rows, &view)
}

async fn category(engine: &Engine, command: CategoryCommand) -> Result<Output> {
    match command {
        CategoryCommand::Add {
            name,
            icon,
            color,
            budget_limit,
        } => {
            let category = Category::new(&name, icon.as_deref(), color.as_deref(), budget_limit)?;
            let category = engine.create_category(category).await?;
            Output::message(
                format!("added category {} ({})", category.name, category.id),
                &category,
            )
        }
        CategoryCommand::List => {
            let categories = engine.list_categories().await?;
            let rows = categories
                .iter()
                .map(|c| {
                    vec![
                        c.id.to_string(),
                        c.name.clone(),
                        c.icon.clone().unwrap_or_default(),
                        c.color.clone().unwrap_or_default(),
                        c.budget_limit.map(|b| b.to_string()).unwrap_or_default(),
                    ]
                })
                .collect();
            Output::new(
                vec!["id", "name", "icon", "color", "monthly budget"],
                rows,
                &categories,
            )
        }
    }
}

async fn expense(engine: &Engine, command: ExpenseCommand) -> Result<Output> {
    match command {
        ExpenseCommand::Add {
            amount,
            description,
            category,
            date,
            recurrence,
        } => {
            let category_id = match category {
                Some(key) => Some(resolve_category(&engine.list_categories().await?, &key)?),
                None => None,
            };
            let expense = Expense::new(
                amount,
                &description,
                category_id,
                date.unwrap_or_else(Utc::now),
                recurrence,
            )?;
            let expense = engine.create(expense).await?;
            Output::message(
                format!("added expense {} ({})", expense.description, expense.id),
                &expense,
            )
        }
        ExpenseCommand::List(args) => {
            let categories = engine.list_categories().await?;
            let filter = expense_filter(&categories, args)?;
            let expenses = engine.list_by_filter(&filter).await?;
            let names: HashMap<Uuid, &str> = categories
                .iter()
                .map(|c| (c.id, c.name.as_str()))
                .collect();
            let rows = expenses
                .iter()
                .map(|e| {
                    let kind = match (e.recurrence, e.anchor_id) {
                        (Some(pattern), _) => pattern.to_string(),
                        (None, Some(_)) => "occurrence".to_string(),
                        (None, None) => String::new(),
                    };
                    vec![
                        e.id.to_string(),
                        day(e.occurred_at),
                        e.description.clone(),
                        e.category_id
                            .and_then(|id| names.get(&id).map(ToString::to_string))
                            .unwrap_or_default(),
                        e.amount.to_string(),
                        kind,
                    ]
                })
                .collect();
            Output::new(
                vec!["id", "date", "description", "category", "amount", "recurrence"],
                rows,
                &expenses,
            )
        }
        ExpenseCommand::Remove { id } => {
            engine.delete(id).await?;
            Output::message(format!("removed expense {id}"), &id)
        }
    }
}

async fn recurring(
    engine: &Engine,
    settings: &Settings,
    command: RecurringCommand,
) -> Result<Output> {
    match command {
        RecurringCommand::Generate { now } => {
            let report = engine.generate_recurring(now.unwrap_or_else(Utc::now)).await?;
            Output::message(
                format!(
                    "created {} occurrence(s), skipped {}",
                    report.created, report.skipped
                ),
                &report,
            )
        }
        RecurringCommand::Upcoming { days, now } => {
            let days = days.unwrap_or(settings.recurring.horizon_days);
            debug!(days, "listing upcoming recurring expenses");
            let upcoming = engine.upcoming(days, now.unwrap_or_else(Utc::now)).await?;
            let rows = upcoming
                .iter()
                .map(|u| {
                    vec![
                        day(u.next_date),
                        u.expense.description.clone(),
                        u.expense.amount.to_string(),
                        u.expense
                            .recurrence
                            .map(|p| p.to_string())
                            .unwrap_or_default(),
                        u.expense.id.to_string(),
                    ]
                })
                .collect();
            Output::new(
                vec!["next date", "description", "amount", "recurrence", "id"],
                rows,
                &upcoming,
            )
        }
    }
}

async fn report(engine: &Engine, command: ReportCommand) -> Result<Output> {
    match command {
        ReportCommand::Categories(args) => {
            let filter = expense_filter(&engine.list_categories().await?, args)?;
            let shares = engine.category_report(&filter).await?;
            let rows = shares
                .iter()
                .map(|s| {
                    vec![
                        s.category.clone(),
                        s.amount.to_string(),
                        s.count.to_string(),
                        format!("{:.1}%", s.percentage),
                    ]
                })
                .collect();
            Output::new(vec!["category", "amount", "count", "share"], rows, &shares)
        }
        ReportCommand::Summary(args) => {
            let filter = expense_filter(&engine.list_categories().await?, args)?;
            let summary = engine.expense_summary(&filter).await?;
            let rows = vec![vec![
                summary.total.to_string(),
                summary.count.to_string(),
                summary.average.to_string(),
            ]];
            Output::new(vec!["total", "count", "average"], rows, &summary)
        }
        ReportCommand::Trend { group_by, filter } => {
            let filter = expense_filter(&engine.list_categories().await?, filter)?;
            let grouping = match group_by {
                GroupBy::Day => TrendGrouping::Day,
                GroupBy::Week => TrendGrouping::Week,
                GroupBy::Month => TrendGrouping::Month,
            };
            let buckets = engine.spending_trend(&filter, grouping).await?;
            let rows = buckets
                .iter()
                .map(|b| vec![b.key.clone(), b.amount.to_string()])
                .collect();
            Output::new(vec!["period", "amount"], rows, &buckets)
        }
        ReportCommand::Budgets { now } => {
            let overview = engine.budget_overview(now.unwrap_or_else(Utc::now)).await?;
            let rows = overview
                .iter()
                .map(|b| {
                    vec![
                        b.category.name.clone(),
                        b.progress.budget_amount.to_string(),
                        b.progress.spent.to_string(),
                        b.progress.remaining.to_string(),
                        format!("{:.1}%", b.progress.percentage),
                    ]
                })
                .collect();
            Output::new(
                vec!["category", "budget", "spent", "remaining", "used"],
                rows,
                &overview,
            )
        }
    }
}

fn expense_filter(categories: &[Category], args: ExpenseFilterArgs) -> Result<ExpenseFilter> {
    let category_id = match args.category {
        Some(key) => Some(resolve_category(categories, &key)?),
        None => None,
    };
    Ok(ExpenseFilter {
        from: args.from,
        to: args.to,
        category_id,
        search: args.search,
    })
}

fn day(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn participant_names(roster: &[Participant]) -> HashMap<ParticipantId, String> {
    roster.iter().map(|p| (p.id, p.name.clone())).collect()
}

fn name_of(names: &HashMap<ParticipantId, String>, id: ParticipantId) -> String {
    names.get(&id).cloned().unwrap_or_else(|| id.to_string())
}

/// Match an id first, then a case-insensitive name.
fn resolve<'a, T>(
    items: &'a [T],
    key: &str,
    id: impl Fn(&T) -> Uuid,
    name: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    let key = key.trim();
    if let Ok(wanted) = Uuid::parse_str(key)
        && let Some(item) = items.iter().find(|item| id(item) == wanted)
    {
        return Some(item);
    }
    let wanted = key.to_lowercase();
    items
        .iter()
        .find(|item| name(item).trim().to_lowercase() == wanted)
}

fn resolve_participant(roster: &[Participant], key: &str) -> Result<ParticipantId> {
    resolve(roster, key, |p| p.id, |p| p.name.as_str())
        .map(|p| p.id)
        .ok_or_else(|| AppError::Argument(format!("unknown participant '{key}'")))
}

fn resolve_group(groups: &[SplitGroup], key: &str) -> Result<Uuid> {
    resolve(groups, key, |g| g.id, |g| g.name.as_str())
        .map(|g| g.id)
        .ok_or_else(|| AppError::Argument(format!("unknown group '{key}'")))
}

fn resolve_category(categories: &[Category], key: &str) -> Result<Uuid> {
    resolve(categories, key, |c| c.id, |c| c.name.as_str())
        .map(|c| c.id)
        .ok_or_else(|| AppError::Argument(format!("unknown category '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participants_resolve_by_id_or_name() {
        let roster = vec![Participant::new("Ann"), Participant::new("Bob")];
        let bob = roster[1].id;

        assert_eq!(resolve_participant(&roster, "bob").unwrap(), bob);
        assert_eq!(resolve_participant(&roster, " Bob ").unwrap(), bob);
        assert_eq!(resolve_participant(&roster, &bob.to_string()).unwrap(), bob);
        assert!(matches!(
            resolve_participant(&roster, "Cid"),
            Err(AppError::Argument(_))
        ));
    }
}
