use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{MoneyCents, RecurrencePattern};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "divvy")]
#[command(about = "Split shared expenses, settle debts and track recurring charges")]
pub struct Cli {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// Override the database connection string.
    #[arg(long, global = true)]
    pub database_url: Option<String>,
    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// People sharing expenses.
    Participant(Participant),
    /// Named, dated buckets of shared expenses.
    Group(Group),
    /// Shared expenses.
    Split(Split),
    /// Who pays whom to clear every balance.
    Settle(SettleArgs),
    Category(Category),
    /// Personal expenses.
    Expense(Expense),
    Recurring(Recurring),
    Report(Report),
}

#[derive(Args, Debug)]
pub struct Participant {
    #[command(subcommand)]
    pub command: ParticipantCommand,
}

#[derive(Subcommand, Debug)]
pub enum ParticipantCommand {
    Add {
        #[arg(long)]
        name: String,
    },
    List,
    /// Remove a participant no split expense refers to.
    Remove {
        /// Participant id or name.
        #[arg(long)]
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct Group {
    #[command(subcommand)]
    pub command: GroupCommand,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    Create {
        #[arg(long)]
        name: String,
        /// Defaults to today.
        #[arg(long, value_parser = parse_date)]
        date: Option<DateTime<Utc>>,
    },
    List,
}

#[derive(Args, Debug)]
pub struct Split {
    #[command(subcommand)]
    pub command: SplitCommand,
}

#[derive(Subcommand, Debug)]
pub enum SplitCommand {
    Add(SplitAddArgs),
    List {
        /// Group id or name; all groups when omitted.
        #[arg(long)]
        group: Option<String>,
    },
    Remove {
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct SplitAddArgs {
    /// Group id or name.
    #[arg(long)]
    pub group: String,
    #[arg(long)]
    pub description: String,
    #[arg(long)]
    pub amount: MoneyCents,
    /// Participant id or name.
    #[arg(long)]
    pub paid_by: String,
    /// Comma separated participant ids or names.
    #[arg(long, value_delimiter = ',', required = true)]
    pub among: Vec<String>,
    #[arg(long, default_value = "")]
    pub category: String,
    /// Defaults to the group date.
    #[arg(long, value_parser = parse_date)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct SettleArgs {
    /// Group id or name; all groups when omitted.
    #[arg(long)]
    pub group: Option<String>,
    /// Show paid/share/net per participant instead of transfers.
    #[arg(long)]
    pub balances: bool,
}

#[derive(Args, Debug)]
pub struct Category {
    #[command(subcommand)]
    pub command: CategoryCommand,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
        /// Monthly budget.
        #[arg(long)]
        budget_limit: Option<MoneyCents>,
    },
    List,
}

#[derive(Args, Debug)]
pub struct Expense {
    #[command(subcommand)]
    pub command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
pub enum ExpenseCommand {
    Add {
        #[arg(long)]
        amount: MoneyCents,
        #[arg(long)]
        description: String,
        /// Category id or name.
        #[arg(long)]
        category: Option<String>,
        /// Defaults to now.
        #[arg(long, value_parser = parse_date)]
        date: Option<DateTime<Utc>>,
        #[arg(long)]
        recurrence: Option<RecurrencePattern>,
    },
    List(ExpenseFilterArgs),
    Remove {
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Args, Debug, Default)]
pub struct ExpenseFilterArgs {
    #[arg(long, value_parser = parse_date)]
    pub from: Option<DateTime<Utc>>,
    #[arg(long, value_parser = parse_date)]
    pub to: Option<DateTime<Utc>>,
    /// Category id or name.
    #[arg(long)]
    pub category: Option<String>,
    /// Case-insensitive text to look for in descriptions.
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args, Debug)]
pub struct Recurring {
    #[command(subcommand)]
    pub command: RecurringCommand,
}

#[derive(Subcommand, Debug)]
pub enum RecurringCommand {
    /// Store every due occurrence that is not stored yet.
    Generate {
        #[arg(long, value_parser = parse_date)]
        now: Option<DateTime<Utc>>,
    },
    /// Recurring expenses due soon.
    Upcoming {
        /// Defaults to `recurring.horizon_days`.
        #[arg(long)]
        days: Option<u32>,
        #[arg(long, value_parser = parse_date)]
        now: Option<DateTime<Utc>>,
    },
}

#[derive(Args, Debug)]
pub struct Report {
    #[command(subcommand)]
    pub command: ReportCommand,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Totals per category, largest first.
    Categories(ExpenseFilterArgs),
    /// Total, count and average.
    Summary(ExpenseFilterArgs),
    Trend {
        #[arg(long, value_enum, default_value_t = GroupBy::Month)]
        group_by: GroupBy,
        #[command(flatten)]
        filter: ExpenseFilterArgs,
    },
    /// Monthly budget progress of the budgeted categories.
    Budgets {
        #[arg(long, value_parser = parse_date)]
        now: Option<DateTime<Utc>>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum GroupBy {
    Day,
    Week,
    Month,
}

/// `YYYY-MM-DD` (midnight UTC) or RFC 3339.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|_| format!("invalid date '{raw}': expected YYYY-MM-DD or RFC 3339"))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn dates_accept_plain_days_and_rfc3339() {
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date("2024-02-29T10:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 8, 0, 0).unwrap()
        );
        assert!(parse_date("29/02/2024").is_err());
    }

    #[test]
    fn split_add_parses_member_list() {
        let cli = Cli::try_parse_from([
            "divvy",
            "split",
            "add",
            "--group",
            "Lisbon",
            "--description",
            "Dinner",
            "--amount",
            "90",
            "--paid-by",
            "Ann",
            "--among",
            "Ann,Bob,Cid",
        ])
        .unwrap();
        let Command::Split(Split {
            command: SplitCommand::Add(args),
        }) = cli.command
        else {
            panic!("expected split add");
        };
        assert_eq!(args.amount, MoneyCents::new(9_000));
        assert_eq!(args.among, vec!["Ann", "Bob", "Cid"]);
        assert_eq!(cli.format, Format::Table);
    }
}
