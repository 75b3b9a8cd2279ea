//! Settlement engine.
//!
//! Turns a roster and a list of split expenses into net balances, then into
//! a short list of transfers that brings every balance back to zero.
//!
//! Balances are accumulated as floating minor units: each member owes
//! `amount / members` without rounding, so many small splits do not compound
//! rounding error. Balances are rounded to whole cents once, right before
//! matching. A group where everyone is within one cent of zero
//! ([`EPSILON_MINOR`]) is settled.
//!
//! The matching is greedy (largest creditor against largest debtor). It never
//! needs more than `participants - 1` transfers, but it is not guaranteed to
//! find the global minimum for every distribution.

use std::{
    cmp::Reverse,
    collections::HashMap,
};

use serde::{Deserialize, Serialize};

use crate::{
    EngineError, MoneyCents, Participant, ParticipantId, ResultEngine, SplitExpense,
    money::{EPSILON_MINOR, round_minor},
};

/// Net position of a participant. Positive: is owed money. Negative: owes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Balance {
    pub participant_id: ParticipantId,
    /// Signed amount in minor units, unrounded.
    pub net: f64,
}

/// A single payment from a debtor to a creditor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: ParticipantId,
    pub to: ParticipantId,
    pub amount: MoneyCents,
}

/// What a participant paid, what they consumed, and the difference.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParticipantSummary {
    pub participant: Participant,
    pub paid: MoneyCents,
    /// Sum of unrounded shares, in minor units.
    pub share: f64,
    pub net: f64,
}

fn roster_index(participants: &[Participant]) -> ResultEngine<HashMap<ParticipantId, usize>> {
    let mut index = HashMap::with_capacity(participants.len());
    for (position, participant) in participants.iter().enumerate() {
        if index.insert(participant.id, position).is_some() {
            return Err(EngineError::InvalidSplit(format!(
                "participant {} is listed twice in the roster",
                participant.id
            )));
        }
    }
    Ok(index)
}

fn position_of(index: &HashMap<ParticipantId, usize>, id: ParticipantId) -> ResultEngine<usize> {
    index
        .get(&id)
        .copied()
        .ok_or_else(|| EngineError::UnknownParticipant(id.to_string()))
}

/// Net balance of every participant, in roster order.
///
/// Participants without expenses are included with a zero balance. Fails on
/// malformed expenses or ids outside the roster.
pub fn compute_balances(
    expenses: &[SplitExpense],
    participants: &[Participant],
) -> ResultEngine<Vec<Balance>> {
    let index = roster_index(participants)?;
    let mut net = vec![0.0_f64; participants.len()];

    for expense in expenses {
        expense.validate()?;
        let payer = position_of(&index, expense.paid_by)?;
        let members = expense
            .split_among
            .iter()
            .map(|id| position_of(&index, *id))
            .collect::<ResultEngine<Vec<_>>>()?;

        let share = expense.share_minor();
        net[payer] += expense.amount.as_minor_f64();
        for member in members {
            net[member] -= share;
        }
    }

    Ok(participants
        .iter()
        .zip(net)
        .map(|(participant, net)| Balance {
            participant_id: participant.id,
            net,
        })
        .collect())
}

struct Party {
    id: ParticipantId,
    net: f64,
    remaining: i64,
}

/// Rounds each balance to whole cents so that the rounded values add up to
/// the rounded total (largest remainder; ties keep roster order).
fn round_balances(nets: &[f64]) -> Vec<i64> {
    // Values like 2999.9999999999995 are float noise around a whole cent.
    let snapped: Vec<f64> = nets
        .iter()
        .map(|net| {
            let whole = net.round();
            if (net - whole).abs() < 1e-6 { whole } else { *net }
        })
        .collect();

    let mut rounded: Vec<i64> = snapped.iter().map(|net| net.floor() as i64).collect();
    let target = round_minor(snapped.iter().sum()).cents();
    let floor_total: i64 = rounded.iter().sum();
    let units = (target - floor_total).clamp(0, rounded.len() as i64) as usize;

    let mut by_remainder: Vec<usize> = (0..snapped.len()).collect();
    by_remainder.sort_by_key(|&i| {
        let remainder = snapped[i] - snapped[i].floor();
        Reverse((remainder * 1e6).round() as i64)
    });
    for &i in by_remainder.iter().take(units) {
        rounded[i] += 1;
    }
    rounded
}

/// Transfers that settle the given balances.
///
/// When every balance is within one cent of zero there is nothing to settle.
/// Otherwise all balances, settled ones included, are rounded to whole cents
/// once, keeping their sum, so sub-cent residue lands on someone instead of
/// being dropped. Parties with a non-zero rounded balance are matched
/// greedily: creditors by balance descending, debtors by balance ascending
/// (largest debt first). Both sorts are stable so ties keep roster order.
/// Every party ends within one cent of its exact balance.
pub fn settle_balances(balances: &[Balance]) -> Vec<Transfer> {
    if balances.iter().all(|b| b.net.abs() <= EPSILON_MINOR) {
        return Vec::new();
    }

    let nets: Vec<f64> = balances.iter().map(|b| b.net).collect();
    let rounded = round_balances(&nets);

    let parties = balances
        .iter()
        .zip(rounded)
        .filter(|(_, cents)| *cents != 0)
        .map(|(balance, cents)| Party {
            id: balance.participant_id,
            net: balance.net,
            remaining: cents,
        });
    let (mut creditors, mut debtors): (Vec<Party>, Vec<Party>) =
        parties.partition(|party| party.remaining > 0);
    creditors.sort_by(|a, b| b.net.total_cmp(&a.net));
    debtors.sort_by(|a, b| a.net.total_cmp(&b.net));

    let mut transfers = Vec::new();
    let (mut c, mut d) = (0, 0);
    while c < creditors.len() && d < debtors.len() {
        let creditor = &mut creditors[c];
        let debtor = &mut debtors[d];
        let amount = creditor.remaining.min(-debtor.remaining);

        if amount > 0 {
            transfers.push(Transfer {
                from: debtor.id,
                to: creditor.id,
                amount: MoneyCents::new(amount),
            });
        }

        creditor.remaining -= amount;
        debtor.remaining += amount;

        if creditor.remaining <= 0 {
            c += 1;
        }
        if debtor.remaining >= 0 {
            d += 1;
        }
    }

    transfers
}

/// Minimal-ish list of transfers that zeroes every participant's balance.
pub fn compute_settlements(
    expenses: &[SplitExpense],
    participants: &[Participant],
) -> ResultEngine<Vec<Transfer>> {
    let balances = compute_balances(expenses, participants)?;
    Ok(settle_balances(&balances))
}

/// Total amount the participant paid for others (and themselves).
pub fn total_paid(expenses: &[SplitExpense], participant: ParticipantId) -> MoneyCents {
    expenses
        .iter()
        .filter(|expense| expense.paid_by == participant)
        .map(|expense| expense.amount)
        .sum()
}

/// Sum of the participant's unrounded shares, in minor units.
pub fn total_share(expenses: &[SplitExpense], participant: ParticipantId) -> f64 {
    expenses
        .iter()
        .filter(|expense| expense.split_among.contains(&participant))
        .map(SplitExpense::share_minor)
        .sum()
}

/// Paid/share/net for each participant, in roster order.
pub fn participant_summaries(
    expenses: &[SplitExpense],
    participants: &[Participant],
) -> ResultEngine<Vec<ParticipantSummary>> {
    let balances = compute_balances(expenses, participants)?;
    Ok(participants
        .iter()
        .zip(balances)
        .map(|(participant, balance)| ParticipantSummary {
            participant: participant.clone(),
            paid: total_paid(expenses, participant.id),
            share: total_share(expenses, participant.id),
            net: balance.net,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;

    fn roster(names: &[&str]) -> Vec<Participant> {
        names.iter().map(|name| Participant::new(*name)).collect()
    }

    fn split(amount_minor: i64, paid_by: &Participant, among: &[&Participant]) -> SplitExpense {
        SplitExpense::new(
            Uuid::new_v4(),
            "expense".to_string(),
            MoneyCents::new(amount_minor),
            "Food".to_string(),
            paid_by.id,
            among.iter().map(|p| p.id).collect(),
            Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap(),
        )
        .unwrap()
    }

    /// Applies transfers to the initial balances: debtor pays, creditor receives.
    fn apply(balances: &[Balance], transfers: &[Transfer]) -> HashMap<ParticipantId, f64> {
        let mut after: HashMap<_, _> = balances.iter().map(|b| (b.participant_id, b.net)).collect();
        for transfer in transfers {
            *after.get_mut(&transfer.from).unwrap() += transfer.amount.as_minor_f64();
            *after.get_mut(&transfer.to).unwrap() -= transfer.amount.as_minor_f64();
        }
        after
    }

    fn assert_closes(expenses: &[SplitExpense], participants: &[Participant]) {
        let balances = compute_balances(expenses, participants).unwrap();
        let total: f64 = balances.iter().map(|b| b.net).sum();
        assert!(total.abs() < 1e-6, "balances sum to {total}");

        let transfers = settle_balances(&balances);
        assert!(transfers.len() <= participants.len().saturating_sub(1));
        assert!(transfers.iter().all(|t| t.from != t.to));
        assert!(transfers.iter().all(|t| t.amount.is_positive()));
        for (id, rest) in apply(&balances, &transfers) {
            assert!(rest.abs() <= EPSILON_MINOR, "{id} left with {rest}");
        }
    }

    #[test]
    fn one_payer_three_way_split() {
        let people = roster(&["A", "B", "C"]);
        let (a, b, c) = (&people[0], &people[1], &people[2]);
        let expenses = vec![split(9_000, a, &[a, b, c])];

        let balances = compute_balances(&expenses, &people).unwrap();
        let nets: Vec<f64> = balances.iter().map(|b| b.net).collect();
        assert_eq!(nets, vec![6_000.0, -3_000.0, -3_000.0]);

        let transfers = compute_settlements(&expenses, &people).unwrap();
        assert_eq!(
            transfers,
            vec![
                Transfer { from: b.id, to: a.id, amount: MoneyCents::new(3_000) },
                Transfer { from: c.id, to: a.id, amount: MoneyCents::new(3_000) },
            ]
        );
    }

    #[test]
    fn symmetric_expenses_cancel_out() {
        let people = roster(&["A", "B"]);
        let (a, b) = (&people[0], &people[1]);
        let expenses = vec![split(10_000, a, &[a, b]), split(10_000, b, &[a, b])];

        assert!(compute_settlements(&expenses, &people).unwrap().is_empty());
    }

    #[test]
    fn empty_inputs_settle_nothing() {
        let people = roster(&["A", "B"]);
        assert!(compute_settlements(&[], &people).unwrap().is_empty());
        assert!(compute_settlements(&[], &[]).unwrap().is_empty());

        let solo = roster(&["A"]);
        let expenses = vec![split(500, &solo[0], &[&solo[0]])];
        assert!(compute_settlements(&expenses, &solo).unwrap().is_empty());
    }

    #[test]
    fn payer_outside_split_is_owed_everything() {
        let people = roster(&["A", "B", "C"]);
        let (a, b, c) = (&people[0], &people[1], &people[2]);
        let expenses = vec![split(5_000, a, &[b, c])];

        let transfers = compute_settlements(&expenses, &people).unwrap();
        assert_eq!(transfers.len(), 2);
        assert!(transfers.iter().all(|t| t.to == a.id && t.amount == MoneyCents::new(2_500)));
    }

    #[test]
    fn single_member_split_takes_full_share() {
        let people = roster(&["A", "B"]);
        let (a, b) = (&people[0], &people[1]);
        let expenses = vec![split(1_234, a, &[b])];

        assert_eq!(
            compute_settlements(&expenses, &people).unwrap(),
            vec![Transfer { from: b.id, to: a.id, amount: MoneyCents::new(1_234) }]
        );
    }

    #[test]
    fn uneven_thirds_close_within_a_cent() {
        let people = roster(&["A", "B", "C"]);
        let (a, b, c) = (&people[0], &people[1], &people[2]);
        let expenses = vec![split(10_000, a, &[a, b, c])];

        let transfers = compute_settlements(&expenses, &people).unwrap();
        let total: MoneyCents = transfers.iter().map(|t| t.amount).sum();
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].from, b.id);
        assert_eq!(transfers[1].from, c.id);
        assert_eq!(total, MoneyCents::new(6_667));
        assert_closes(&expenses, &people);
    }

    #[test]
    fn chain_of_debts_is_simplified() {
        let people = roster(&["A", "B", "C", "D"]);
        let (a, b, c, d) = (&people[0], &people[1], &people[2], &people[3]);
        let expenses = vec![
            split(12_000, a, &[a, b, c, d]),
            split(4_000, b, &[c, d]),
            split(999, c, &[a, b, c]),
            split(7_777, d, &[a, d]),
        ];

        assert_closes(&expenses, &people);
    }

    #[test]
    fn many_small_uneven_splits_close() {
        let people = roster(&["A", "B", "C", "D", "E"]);
        let refs: Vec<&Participant> = people.iter().collect();
        let mut expenses = Vec::new();
        for i in 0..40_i64 {
            let payer = refs[(i % 5) as usize];
            let among: Vec<&Participant> = refs.iter().copied().skip((i % 3) as usize).collect();
            expenses.push(split(1_000 + i * 37, payer, &among));
        }

        assert_closes(&expenses, &people);
    }

    #[test]
    fn sub_cent_residue_is_not_dropped() {
        let people = roster(&["A", "B", "C", "D", "E"]);
        let refs: Vec<&Participant> = people.iter().collect();
        let a = refs[0];
        // Each of B..E is owed half a cent; A owes two cents in total.
        let expenses: Vec<SplitExpense> = refs[1..]
            .iter()
            .map(|payer| split(1, payer, &[payer, a]))
            .collect();

        let transfers = compute_settlements(&expenses, &people).unwrap();
        assert_eq!(
            transfers,
            vec![
                Transfer { from: a.id, to: refs[1].id, amount: MoneyCents::new(1) },
                Transfer { from: a.id, to: refs[2].id, amount: MoneyCents::new(1) },
            ]
        );
        assert_closes(&expenses, &people);
    }

    #[test]
    fn ties_keep_roster_order() {
        let people = roster(&["A", "B", "C", "D"]);
        let (a, b, c, d) = (&people[0], &people[1], &people[2], &people[3]);
        // A and B are owed the same; C and D owe the same.
        let expenses = vec![split(2_000, a, &[c, d]), split(2_000, b, &[c, d])];

        let transfers = compute_settlements(&expenses, &people).unwrap();
        assert_eq!(
            transfers,
            vec![
                Transfer { from: c.id, to: a.id, amount: MoneyCents::new(2_000) },
                Transfer { from: d.id, to: b.id, amount: MoneyCents::new(2_000) },
            ]
        );
    }

    #[test]
    fn settlement_is_deterministic() {
        let people = roster(&["A", "B", "C", "D"]);
        let (a, b, c, d) = (&people[0], &people[1], &people[2], &people[3]);
        let expenses = vec![
            split(3_001, a, &[b, c, d]),
            split(1_500, c, &[a, b]),
            split(250, d, &[d, a]),
        ];

        let first = compute_settlements(&expenses, &people).unwrap();
        let second = compute_settlements(&expenses, &people).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rounding_keeps_transfers_zero_sum() {
        let people = roster(&["A", "B", "C"]);
        let (a, b, c) = (&people[0], &people[1], &people[2]);
        let balances = vec![
            Balance { participant_id: a.id, net: 1_000.4 },
            Balance { participant_id: b.id, net: 1_000.4 },
            Balance { participant_id: c.id, net: -2_000.8 },
        ];

        let transfers = settle_balances(&balances);
        assert_eq!(
            transfers,
            vec![
                Transfer { from: c.id, to: a.id, amount: MoneyCents::new(1_001) },
                Transfer { from: c.id, to: b.id, amount: MoneyCents::new(1_000) },
            ]
        );
    }

    #[test]
    fn float_noise_does_not_move_a_cent() {
        let people = roster(&["A", "B"]);
        let balances = vec![
            Balance { participant_id: people[0].id, net: 2_999.999_999_999_999_5 },
            Balance { participant_id: people[1].id, net: -3_000.000_000_000_000_5 },
        ];
        assert_eq!(
            settle_balances(&balances),
            vec![Transfer { from: people[1].id, to: people[0].id, amount: MoneyCents::new(3_000) }]
        );
    }

    #[test]
    fn sub_cent_balances_are_already_settled() {
        let people = roster(&["A", "B"]);
        let balances = vec![
            Balance { participant_id: people[0].id, net: 0.6 },
            Balance { participant_id: people[1].id, net: -0.6 },
        ];
        assert!(settle_balances(&balances).is_empty());
    }

    #[test]
    fn rejects_unknown_participant() {
        let people = roster(&["A", "B"]);
        let stranger = Participant::new("Z");
        let expenses = vec![split(1_000, &people[0], &[&people[1], &stranger])];

        assert_eq!(
            compute_settlements(&expenses, &people).unwrap_err(),
            EngineError::UnknownParticipant(stranger.id.to_string())
        );
    }

    #[test]
    fn rejects_malformed_expense() {
        let people = roster(&["A", "B"]);
        let mut expense = split(1_000, &people[0], &[&people[1]]);
        expense.split_among.clear();
        assert!(matches!(
            compute_balances(&[expense], &people),
            Err(EngineError::InvalidSplit(_))
        ));

        let mut expense = split(1_000, &people[0], &[&people[1]]);
        expense.amount = MoneyCents::ZERO;
        assert!(matches!(
            compute_balances(&[expense], &people),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[test]
    fn summaries_report_paid_and_share() {
        let people = roster(&["A", "B", "C"]);
        let (a, b, c) = (&people[0], &people[1], &people[2]);
        let expenses = vec![split(9_000, a, &[a, b, c]), split(3_000, b, &[b, c])];

        let summaries = participant_summaries(&expenses, &people).unwrap();

        assert_eq!(summaries[0].paid, MoneyCents::new(9_000));
        assert_eq!(summaries[0].share, 3_000.0);
        assert_eq!(summaries[0].net, 6_000.0);
        assert_eq!(summaries[1].paid, MoneyCents::new(3_000));
        assert_eq!(summaries[1].share, 4_500.0);
        assert_eq!(summaries[2].paid, MoneyCents::ZERO);
        assert_eq!(summaries[2].net, -4_500.0);
        assert_eq!(summaries[2].share, 4_500.0);
    }
}
