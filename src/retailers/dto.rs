use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo::Retailer;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRetailerRequest {
    pub retailer_code: Option<String>,
    pub shop_name: Option<String>,
    pub owner_id: Option<String>,
    pub business_type: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub opening_time: Option<String>,
    pub closing_time: Option<String>,
    pub products: Option<Vec<String>>,
    pub offers: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRetailerRequest {
    pub retailer_code: Option<String>,
    pub shop_name: Option<String>,
    pub owner_id: Option<String>,
    pub business_type: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub opening_time: Option<String>,
    pub closing_time: Option<String>,
    pub products: Option<Vec<String>>,
    pub offers: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailerListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub business_type: Option<String>,
    pub owner_id: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RetailerResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub retailer: Retailer,
}

/// Paginated listing envelope: `data` plus the pagination bookkeeping.
#[derive(Debug, Serialize)]
pub struct RetailerPageResponse {
    pub success: bool,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
    pub count: usize,
    pub data: Vec<Retailer>,
}

#[derive(Debug, Serialize)]
pub struct RetailerListResponse {
    pub success: bool,
    pub count: usize,
    pub retailers: Vec<Retailer>,
}

#[derive(Debug, Serialize)]
pub struct DeletedRetailerResponse {
    pub success: bool,
    pub message: String,
    pub id: Uuid,
}
