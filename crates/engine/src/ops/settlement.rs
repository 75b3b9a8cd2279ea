use sea_orm::prelude::*;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    settlement::{
        Balance, ParticipantSummary, Transfer, compute_balances, participant_summaries,
        settle_balances,
    },
    split_groups,
    store::{ParticipantStore, SplitGroupStore},
};

use super::Engine;

/// Balances and the transfers that clear them, for one group or for all.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Settlement {
    pub summaries: Vec<ParticipantSummary>,
    pub balances: Vec<Balance>,
    pub transfers: Vec<Transfer>,
}

impl Engine {
    /// Settle the expenses of `group_id`, or of every group when `None`.
    pub async fn settle_group(&self, group_id: Option<Uuid>) -> ResultEngine<Settlement> {
        let expenses = match group_id {
            Some(group_id) => {
                split_groups::Entity::find_by_id(group_id)
                    .one(&self.database)
                    .await?
                    .ok_or_else(|| {
                        EngineError::KeyNotFound(format!("group {group_id}"))
                    })?;
                self.group_expenses(group_id).await?
            }
            None => self.all_split_expenses().await?,
        };
        let participants = self.list_participants().await?;

        let balances = compute_balances(&expenses, &participants)?;
        let transfers = settle_balances(&balances);
        let summaries = participant_summaries(&expenses, &participants)?;
        debug!(
            group = ?group_id,
            expenses = expenses.len(),
            transfers = transfers.len(),
            "settlement computed"
        );

        Ok(Settlement {
            summaries,
            balances,
            transfers,
        })
    }
}
