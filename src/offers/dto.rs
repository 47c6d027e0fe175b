use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo::Offer;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOfferRequest {
    pub product: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub discount_percent: Option<f64>,
    pub original_price: Option<f64>,
    pub offer_price: Option<f64>,
    pub valid_from: Option<String>,
    pub valid_till: Option<String>,
    pub city: Option<String>,
    pub area: Option<String>,
    pub is_premium: Option<bool>,
}

/// Partial update; date strings are validated before the patch is applied.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOfferRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_till: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OfferListParams {
    pub city: Option<String>,
    pub area: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Params for the cross-entity filter; category/brand/product select against
/// the catalog first.
#[derive(Debug, Default, Deserialize)]
pub struct OfferFilterParams {
    pub city: Option<String>,
    pub area: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub product: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OfferSearchParams {
    pub area: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OfferResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub offer: Offer,
}

#[derive(Debug, Serialize)]
pub struct OfferListResponse {
    pub success: bool,
    pub count: usize,
    pub offers: Vec<Offer>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub message: String,
}
