use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::store::{Clause, Kind, Predicate, Store, Window};

/// Time-bounded discount tied to one product and one owning retailer.
/// `validFrom`/`validTill` are descriptive only; expired offers are still
/// returned unless the caller filters them out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: Uuid,
    pub product_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    pub discount_percent: f64,
    pub original_price: f64,
    pub offer_price: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub valid_from: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub valid_till: OffsetDateTime,
    pub city: String,
    pub area: String,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

fn decode(doc: Value) -> Result<Offer, ApiError> {
    Ok(serde_json::from_value(doc)?)
}

pub async fn list(
    store: &dyn Store,
    filter: &Predicate,
    window: &Window,
) -> Result<Vec<Offer>, ApiError> {
    store
        .find(Kind::Offer, filter, window)
        .await?
        .into_iter()
        .map(decode)
        .collect()
}

pub async fn find_by_id(store: &dyn Store, id: Uuid) -> Result<Option<Offer>, ApiError> {
    match store.find_one(Kind::Offer, &Predicate::by_id(id)).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

pub async fn find_by_owner(store: &dyn Store, owner: Uuid) -> Result<Vec<Offer>, ApiError> {
    let filter = Predicate::new().with(Clause::IdEq("ownerId", owner));
    list(store, &filter, &Window::default()).await
}

pub async fn insert(store: &dyn Store, offer: &Offer) -> Result<Offer, ApiError> {
    let doc = store
        .insert(Kind::Offer, serde_json::to_value(offer)?)
        .await?;
    decode(doc)
}

pub async fn update(store: &dyn Store, id: Uuid, patch: Value) -> Result<Option<Offer>, ApiError> {
    match store.update_by_id(Kind::Offer, id, patch).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

pub async fn delete(store: &dyn Store, id: Uuid) -> Result<Option<Offer>, ApiError> {
    match store.delete_by_id(Kind::Offer, id).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}
