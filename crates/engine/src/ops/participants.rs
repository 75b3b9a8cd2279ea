use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
    sea_query::{Expr, Func},
};

use crate::{
    EngineError, Participant, ParticipantId, ResultEngine, participants, split_expenses,
    split_shares, store::ParticipantStore, util::normalize_required_name,
};

use super::{Engine, with_tx};

impl ParticipantStore for Engine {
    async fn list_participants(&self) -> ResultEngine<Vec<Participant>> {
        let models = participants::Entity::find()
            .order_by_asc(participants::Column::Position)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Participant::from).collect())
    }

    async fn create_participant(&self, name: &str) -> ResultEngine<Participant> {
        let name = normalize_required_name(name, "participant")?;

        with_tx!(self, |db_tx| {
            let exists = participants::Entity::find()
                .filter(
                    Expr::expr(Func::lower(Expr::col(participants::Column::Name)))
                        .eq(name.to_lowercase()),
                )
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(format!("participant '{name}'")));
            }

            let last: Option<Option<i64>> = participants::Entity::find()
                .select_only()
                .column_as(participants::Column::Position.max(), "position")
                .into_tuple()
                .one(&db_tx)
                .await?;
            let position = last.flatten().map_or(0, |p| p + 1);

            let participant = Participant::new(name);
            participants::ActiveModel {
                id: ActiveValue::Set(participant.id),
                name: ActiveValue::Set(participant.name.clone()),
                position: ActiveValue::Set(position),
            }
            .insert(&db_tx)
            .await?;
            Ok(participant)
        })
    }

    async fn remove_participant(&self, id: ParticipantId) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = participants::Entity::find_by_id(id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("participant {id}")))?;

            let pays = split_expenses::Entity::find()
                .filter(split_expenses::Column::PaidBy.eq(id))
                .one(&db_tx)
                .await?
                .is_some();
            let shares = split_shares::Entity::find()
                .filter(split_shares::Column::ParticipantId.eq(id))
                .one(&db_tx)
                .await?
                .is_some();
            if pays || shares {
                return Err(EngineError::ParticipantInUse(model.name));
            }

            participants::Entity::delete_by_id(id).exec(&db_tx).await?;
            Ok(())
        })
    }
}
