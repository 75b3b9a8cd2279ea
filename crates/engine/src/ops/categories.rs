use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    Category, EngineError, ResultEngine, categories, store::CategoryStore,
    util::normalize_category_key,
};

use super::{Engine, on_unique_violation, with_tx};

impl CategoryStore for Engine {
    async fn list_categories(&self) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .order_by_asc(categories::Column::NameNorm)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Category::from).collect())
    }

    async fn create_category(&self, category: Category) -> ResultEngine<Category> {
        let name_norm = normalize_category_key(&category.name).ok_or_else(|| {
            EngineError::InvalidName("category name must not be empty".to_string())
        })?;
        let existing = || EngineError::ExistingKey(format!("category '{}'", category.name));

        with_tx!(self, |db_tx| {
            let exists = categories::Entity::find()
                .filter(categories::Column::NameNorm.eq(name_norm.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(existing());
            }

            categories::ActiveModel::from_category(&category, name_norm)
                .insert(&db_tx)
                .await
                .map_err(|err| on_unique_violation(err, existing))?;
            Ok(category)
        })
    }
}
