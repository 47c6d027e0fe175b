use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::store::{Clause, Kind, Predicate, Store, Window};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusinessType {
    Grocery,
    Bakery,
    Salon,
    Mobile,
    Electronics,
    Clothing,
    Other,
}

impl BusinessType {
    pub const ALL: [BusinessType; 7] = [
        Self::Grocery,
        Self::Bakery,
        Self::Salon,
        Self::Mobile,
        Self::Electronics,
        Self::Clothing,
        Self::Other,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|bt| bt.as_str() == raw)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grocery => "Grocery",
            Self::Bakery => "Bakery",
            Self::Salon => "Salon",
            Self::Mobile => "Mobile",
            Self::Electronics => "Electronics",
            Self::Clothing => "Clothing",
            Self::Other => "Other",
        }
    }
}

/// Retailer profile owned by one User with the retailer role. The `products`
/// and `offers` lists are denormalized caches of ids, not a second source of
/// truth; the authoritative ownership lives on Product/Offer `ownerId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Retailer {
    pub id: Uuid,
    pub retailer_code: String,
    pub shop_name: String,
    pub owner_id: Uuid,
    pub business_type: BusinessType,
    pub description: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub opening_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub closing_time: Option<String>,
    #[serde(default)]
    pub products: Vec<Uuid>,
    #[serde(default)]
    pub offers: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

fn decode(doc: Value) -> Result<Retailer, ApiError> {
    Ok(serde_json::from_value(doc)?)
}

pub async fn list(
    store: &dyn Store,
    filter: &Predicate,
    window: &Window,
) -> Result<Vec<Retailer>, ApiError> {
    store
        .find(Kind::Retailer, filter, window)
        .await?
        .into_iter()
        .map(decode)
        .collect()
}

pub async fn total(store: &dyn Store, filter: &Predicate) -> Result<u64, ApiError> {
    Ok(store.count(Kind::Retailer, filter).await?)
}

pub async fn find_by_id(store: &dyn Store, id: Uuid) -> Result<Option<Retailer>, ApiError> {
    match store.find_one(Kind::Retailer, &Predicate::by_id(id)).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

pub async fn find_by_code(store: &dyn Store, code: &str) -> Result<Option<Retailer>, ApiError> {
    let filter = Predicate::new().with(Clause::FieldEq("retailerCode", code.to_string()));
    match store.find_one(Kind::Retailer, &filter).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

pub async fn find_by_owner(store: &dyn Store, owner: Uuid) -> Result<Option<Retailer>, ApiError> {
    let filter = Predicate::new().with(Clause::IdEq("ownerId", owner));
    match store.find_one(Kind::Retailer, &filter).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

pub async fn insert(store: &dyn Store, retailer: &Retailer) -> Result<Retailer, ApiError> {
    let doc = store
        .insert(Kind::Retailer, serde_json::to_value(retailer)?)
        .await?;
    decode(doc)
}

pub async fn update(
    store: &dyn Store,
    id: Uuid,
    patch: Value,
) -> Result<Option<Retailer>, ApiError> {
    match store.update_by_id(Kind::Retailer, id, patch).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

pub async fn delete(store: &dyn Store, id: Uuid) -> Result<Option<Retailer>, ApiError> {
    match store.delete_by_id(Kind::Retailer, id).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}
