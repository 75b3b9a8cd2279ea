//! Category aggregation and spending reports.
//!
//! Everything here is a pure reduction over a snapshot of expenses. Anything
//! that can be reported implements [`ReportItem`].

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, MoneyCents, ResultEngine, SplitExpense,
    money::{percentage, round_minor},
    util::normalize_category_key,
};

/// Label used for expenses with a blank or missing category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A dated amount with an optional category label.
pub trait ReportItem {
    fn category_label(&self) -> Option<&str>;
    fn amount(&self) -> MoneyCents;
    fn occurred_at(&self) -> DateTime<Utc>;
}

impl ReportItem for SplitExpense {
    fn category_label(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn amount(&self) -> MoneyCents {
        self.amount
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.date
    }
}

/// A personal expense with its category already resolved to a name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledAmount {
    pub label: Option<String>,
    pub amount: MoneyCents,
    pub occurred_at: DateTime<Utc>,
}

impl ReportItem for LabeledAmount {
    fn category_label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn amount(&self) -> MoneyCents {
        self.amount
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: MoneyCents,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: String,
    pub amount: MoneyCents,
    pub count: usize,
    /// Share of the grand total, `0..=100`.
    pub percentage: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseSummary {
    pub total: MoneyCents,
    pub count: usize,
    pub average: MoneyCents,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendGrouping {
    Day,
    Week,
    Month,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendBucket {
    /// `YYYY-MM-DD` for day and week buckets, `YYYY-MM` for months.
    pub key: String,
    pub amount: MoneyCents,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub category_id: Option<Uuid>,
    pub amount: MoneyCents,
    pub period: BudgetPeriod,
}

impl Budget {
    /// The `[start, end)` window of the period containing `now`.
    pub fn current_window(&self, now: DateTime<Utc>) -> ResultEngine<(DateTime<Utc>, DateTime<Utc>)> {
        let today = now.date_naive();
        let (start, end) = match self.period {
            BudgetPeriod::Weekly => {
                let start = week_start(today)?;
                (start, start.checked_add_days(Days::new(7)))
            }
            BudgetPeriod::Monthly => {
                let start = ymd(today.year(), today.month())?;
                (start, start.checked_add_months(Months::new(1)))
            }
            BudgetPeriod::Yearly => {
                let start = ymd(today.year(), 1)?;
                (start, start.checked_add_months(Months::new(12)))
            }
        };
        let end = end.ok_or_else(|| out_of_range(today))?;
        Ok((midnight(start), midnight(end)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetProgress {
    pub budget_amount: MoneyCents,
    pub spent: MoneyCents,
    /// Negative once the budget is exceeded.
    pub remaining: MoneyCents,
    pub percentage: f64,
}

/// Groups items by category, keeping first-seen order and spelling.
///
/// Labels compare after trimming, NFKC normalisation and lowercasing; blank or
/// missing labels fold into [`UNCATEGORIZED`].
pub fn aggregate_by_category<T: ReportItem>(items: &[T]) -> Vec<CategoryTotal> {
    let uncategorized_key = UNCATEGORIZED.to_lowercase();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut totals: Vec<CategoryTotal> = Vec::new();

    for item in items {
        let label = item.category_label().map(str::trim).unwrap_or_default();
        let (key, display) = match normalize_category_key(label) {
            Some(key) => (key, label.to_string()),
            None => (uncategorized_key.clone(), UNCATEGORIZED.to_string()),
        };
        let position = *index.entry(key).or_insert_with(|| {
            totals.push(CategoryTotal {
                category: display,
                amount: MoneyCents::ZERO,
                count: 0,
            });
            totals.len() - 1
        });
        let total = &mut totals[position];
        total.amount += item.amount();
        total.count += 1;
    }

    totals
}

/// Category totals with their share of the whole, largest first.
pub fn category_breakdown<T: ReportItem>(items: &[T]) -> Vec<CategoryShare> {
    let totals = aggregate_by_category(items);
    let grand_total: MoneyCents = totals.iter().map(|t| t.amount).sum();
    let mut shares: Vec<CategoryShare> = totals
        .into_iter()
        .map(|t| CategoryShare {
            percentage: percentage(t.amount, grand_total),
            category: t.category,
            amount: t.amount,
            count: t.count,
        })
        .collect();
    shares.sort_by(|a, b| b.amount.cmp(&a.amount));
    shares
}

pub fn summarize<T: ReportItem>(items: &[T]) -> ExpenseSummary {
    let total: MoneyCents = items.iter().map(ReportItem::amount).sum();
    let count = items.len();
    let average = if count == 0 {
        MoneyCents::ZERO
    } else {
        round_minor(total.as_minor_f64() / count as f64)
    };
    ExpenseSummary {
        total,
        count,
        average,
    }
}

/// Sums amounts per day, week (starting Sunday) or month, oldest first.
pub fn spending_trend<T: ReportItem>(
    items: &[T],
    grouping: TrendGrouping,
) -> ResultEngine<Vec<TrendBucket>> {
    let mut buckets: BTreeMap<NaiveDate, MoneyCents> = BTreeMap::new();
    for item in items {
        let day = item.occurred_at().date_naive();
        let start = match grouping {
            TrendGrouping::Day => day,
            TrendGrouping::Week => week_start(day)?,
            TrendGrouping::Month => ymd(day.year(), day.month())?,
        };
        *buckets.entry(start).or_default() += item.amount();
    }

    let format = match grouping {
        TrendGrouping::Day | TrendGrouping::Week => "%Y-%m-%d",
        TrendGrouping::Month => "%Y-%m",
    };
    Ok(buckets
        .into_iter()
        .map(|(start, amount)| TrendBucket {
            key: start.format(format).to_string(),
            amount,
        })
        .collect())
}

pub fn budget_progress(budget: &Budget, spent: MoneyCents) -> BudgetProgress {
    BudgetProgress {
        budget_amount: budget.amount,
        spent,
        remaining: budget.amount - spent,
        percentage: percentage(spent, budget.amount),
    }
}

fn week_start(day: NaiveDate) -> ResultEngine<NaiveDate> {
    let offset = u64::from(day.weekday().num_days_from_sunday());
    day.checked_sub_days(Days::new(offset))
        .ok_or_else(|| out_of_range(day))
}

fn ymd(year: i32, month: u32) -> ResultEngine<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| EngineError::DateOutOfRange(format!("{year}-{month:02}")))
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn out_of_range(day: NaiveDate) -> EngineError {
    EngineError::DateOutOfRange(day.to_string())
}
