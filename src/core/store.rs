//! Store business logic - retail outlets and the production center.
//!
//! The production center is an ordinary store row; it is identified by the configured
//! name and carried around as a [`ProductionCenter`] so ledger code cannot mix it up
//! with an arbitrary store id.

use crate::{
    entities::{DeliverySchedule, Store, store},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, instrument};

/// The store acting as the central production location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductionCenter {
    /// Store id of the production center
    pub store_id: i64,
}

/// Retrieves all stores ordered alphabetically by name.
pub async fn get_all_stores<C>(db: &C) -> Result<Vec<store::Model>>
where
    C: ConnectionTrait,
{
    Store::find()
        .order_by_asc(store::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a store by its unique ID.
pub async fn get_store_by_id<C>(db: &C, store_id: i64) -> Result<Option<store::Model>>
where
    C: ConnectionTrait,
{
    Store::find_by_id(store_id).one(db).await.map_err(Into::into)
}

/// Finds a store by its exact name.
pub async fn get_store_by_name<C>(db: &C, name: &str) -> Result<Option<store::Model>>
where
    C: ConnectionTrait,
{
    Store::find()
        .filter(store::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads a store or fails with `Error::NotFound`.
pub async fn require_store<C>(db: &C, store_id: i64) -> Result<store::Model>
where
    C: ConnectionTrait,
{
    get_store_by_id(db, store_id)
        .await?
        .ok_or_else(|| Error::not_found("Store", store_id))
}

/// Creates a new store.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or whitespace-only
/// - A store with the same name exists (`Error::Conflict`)
#[instrument(skip(db))]
pub async fn create_store(
    db: &DatabaseConnection,
    name: String,
    delivery_schedule: DeliverySchedule,
) -> Result<store::Model> {
    if name.trim().is_empty() {
        return Err(Error::validation("name", "Store name cannot be empty"));
    }

    let store = store::ActiveModel {
        name: Set(name.trim().to_string()),
        delivery_schedule: Set(delivery_schedule),
        ..Default::default()
    };
    let store = store.insert(db).await?;
    info!("Created store '{}' (ID: {})", store.name, store.id);
    Ok(store)
}

/// Looks up the production center by its configured name.
///
/// # Errors
/// Returns `Error::NotFound` when no store carries that name.
pub async fn resolve_production_center<C>(db: &C, name: &str) -> Result<ProductionCenter>
where
    C: ConnectionTrait,
{
    get_store_by_name(db, name)
        .await?
        .map(|store| ProductionCenter { store_id: store.id })
        .ok_or_else(|| Error::not_found("Store", name))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::ErrorKind;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_store_integration() -> Result<()> {
        let db = setup_test_db().await?;

        let store = create_store(&db, "  Harbour Street ".to_string(), DeliverySchedule::Every3Days)
            .await?;
        assert_eq!(store.name, "Harbour Street");
        assert_eq!(store.delivery_schedule, DeliverySchedule::Every3Days);

        let found = get_store_by_name(&db, "Harbour Street").await?.unwrap();
        assert_eq!(found, store);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_store_rejects_duplicate_name() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_store(&db, "Harbour Street").await?;

        let result = create_test_store(&db, "Harbour Street").await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Conflict);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_store_rejects_empty_name() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_store(&db, "   ".to_string(), DeliverySchedule::Daily).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Validation { field: "name", .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_production_center() -> Result<()> {
        let db = setup_test_db().await?;

        let missing = resolve_production_center(&db, TEST_PRODUCTION_CENTER).await;
        assert!(matches!(missing.unwrap_err(), Error::NotFound { .. }));

        let center = create_production_center(&db).await?;
        let resolved = resolve_production_center(&db, TEST_PRODUCTION_CENTER).await?;
        assert_eq!(resolved, center);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_all_stores_sorted() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_store(&db, "Zeta").await?;
        create_test_store(&db, "Alpha").await?;

        let stores = get_all_stores(&db).await?;
        let names: Vec<_> = stores.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);

        Ok(())
    }
}
