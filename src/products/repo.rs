use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::store::{Clause, Kind, Predicate, Store, Window};

/// Catalog item owned by one retailer. `ownerId` references the User acting
/// as retailer; the Retailer profile's `products` list is only a cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    pub price: f64,
    pub city: String,
    pub area: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image: Option<String>,
    pub owner_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

fn decode(doc: Value) -> Result<Product, ApiError> {
    Ok(serde_json::from_value(doc)?)
}

pub async fn list(
    store: &dyn Store,
    filter: &Predicate,
    window: &Window,
) -> Result<Vec<Product>, ApiError> {
    store
        .find(Kind::Product, filter, window)
        .await?
        .into_iter()
        .map(decode)
        .collect()
}

pub async fn find_by_id(store: &dyn Store, id: Uuid) -> Result<Option<Product>, ApiError> {
    match store.find_one(Kind::Product, &Predicate::by_id(id)).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

pub async fn find_by_owner(store: &dyn Store, owner: Uuid) -> Result<Vec<Product>, ApiError> {
    let filter = Predicate::new().with(Clause::IdEq("ownerId", owner));
    list(store, &filter, &Window::default()).await
}

/// Ids of products matching a filter, for the cross-entity offer queries.
pub async fn ids_matching(store: &dyn Store, filter: &Predicate) -> Result<Vec<Uuid>, ApiError> {
    Ok(list(store, filter, &Window::default())
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect())
}

pub async fn insert(store: &dyn Store, product: &Product) -> Result<Product, ApiError> {
    let doc = store
        .insert(Kind::Product, serde_json::to_value(product)?)
        .await?;
    decode(doc)
}

pub async fn update(
    store: &dyn Store,
    id: Uuid,
    patch: Value,
) -> Result<Option<Product>, ApiError> {
    match store.update_by_id(Kind::Product, id, patch).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

pub async fn delete(store: &dyn Store, id: Uuid) -> Result<Option<Product>, ApiError> {
    match store.delete_by_id(Kind::Product, id).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}
