use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    integrity,
    policy::{self, Action, Caller, Identity, ResourceKind, Role},
    query::{self, Page},
    state::AppState,
    store::{Kind, Sort},
};

use super::dto::{
    CreateRetailerRequest, DeletedRetailerResponse, RetailerListParams, RetailerListResponse,
    RetailerPageResponse, RetailerResponse, UpdateRetailerRequest,
};
use super::repo::{self, BusinessType, Retailer};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_retailers).post(create_retailer))
        .route("/mine", get(my_retailer))
        .route("/search/:query", get(search_retailers))
        .route("/code/:code", get(get_retailer_by_code))
        .route(
            "/:id",
            get(get_retailer)
                .put(update_retailer)
                .delete(delete_retailer),
        )
}

fn is_valid_time(value: &str) -> bool {
    lazy_static! {
        static ref TIME_RE: Regex = Regex::new(r"^([01]?[0-9]|2[0-3]):[0-5][0-9]$").unwrap();
    }
    TIME_RE.is_match(value)
}

fn required(value: Option<String>) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation("All required fields must be provided.".into()))
}

fn checked_code(code: &str) -> Result<(), ApiError> {
    if (3..=20).contains(&code.chars().count()) {
        Ok(())
    } else {
        Err(ApiError::Validation(
            "Retailer code must be between 3 and 20 characters.".into(),
        ))
    }
}

fn checked_shop_name(name: &str) -> Result<(), ApiError> {
    if (2..=100).contains(&name.chars().count()) {
        Ok(())
    } else {
        Err(ApiError::Validation(
            "Shop name must be between 2 and 100 characters.".into(),
        ))
    }
}

fn checked_business_type(raw: &str) -> Result<BusinessType, ApiError> {
    BusinessType::parse(raw.trim()).ok_or_else(|| {
        ApiError::Validation(
            "Invalid business type. Use one of: Grocery, Bakery, Salon, Mobile, Electronics, \
             Clothing, Other."
                .into(),
        )
    })
}

fn checked_time(raw: Option<String>, label: &str) -> Result<Option<String>, ApiError> {
    match raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(value) if is_valid_time(&value) => Ok(Some(value)),
        Some(_) => Err(ApiError::Validation(format!(
            "{label} must be in HH:MM format."
        ))),
        None => Ok(None),
    }
}

/// Id-format pass over a denormalized id list. Existence is checked
/// separately, against the store.
fn parsed_ids(raw: Option<Vec<String>>, field: &str) -> Result<Vec<Uuid>, ApiError> {
    let mut ids = Vec::new();
    for (index, value) in raw.unwrap_or_default().iter().enumerate() {
        let id = Uuid::parse_str(value.trim()).map_err(|_| {
            ApiError::Validation(format!("Invalid {field} ID at index {index}."))
        })?;
        ids.push(id);
    }
    Ok(ids)
}

#[instrument(skip(state, payload))]
pub async fn create_retailer(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(payload): Json<CreateRetailerRequest>,
) -> Result<(StatusCode, Json<RetailerResponse>), ApiError> {
    let retailer_code = required(payload.retailer_code)?;
    let shop_name = required(payload.shop_name)?;
    let business_raw = required(payload.business_type)?;
    let description = required(payload.description)?;
    let address = required(payload.address)?;

    let business_type = checked_business_type(&business_raw)?;
    checked_code(&retailer_code)?;
    checked_shop_name(&shop_name)?;
    let opening_time = checked_time(payload.opening_time, "Opening time")?;
    let closing_time = checked_time(payload.closing_time, "Closing time")?;

    // The profile's owner defaults to the caller; naming someone else is an
    // admin-only path, enforced by the policy below.
    let owner_id = match payload.owner_id {
        Some(raw) => Uuid::parse_str(raw.trim())
            .map_err(|_| ApiError::Validation("Invalid owner ID format.".into()))?,
        None => identity.id,
    };
    let products = parsed_ids(payload.products, "product")?;
    let offers = parsed_ids(payload.offers, "offer")?;

    policy::authorize(
        &Caller::from(identity.clone()),
        Action::Create,
        ResourceKind::Retailer,
        Some(owner_id),
    )?;
    integrity::require_retailer_owner(state.store.as_ref(), owner_id).await?;
    integrity::check_id_batch(state.store.as_ref(), Kind::Product, &products, "products").await?;
    integrity::check_id_batch(state.store.as_ref(), Kind::Offer, &offers, "offers").await?;
    integrity::ensure_unique_retailer(
        state.store.as_ref(),
        Some(&shop_name),
        Some(&retailer_code),
        None,
    )
    .await?;

    let retailer = Retailer {
        id: Uuid::new_v4(),
        retailer_code,
        shop_name,
        owner_id,
        business_type,
        description,
        address,
        opening_time,
        closing_time,
        products,
        offers,
        created_at: OffsetDateTime::now_utc(),
    };
    // The store's unique indexes on shopName/retailerCode backstop races.
    let retailer = repo::insert(state.store.as_ref(), &retailer).await?;

    info!(retailer_id = %retailer.id, owner_id = %owner_id, "retailer created");
    Ok((
        StatusCode::CREATED,
        Json(RetailerResponse {
            success: true,
            message: Some("Retailer created".into()),
            retailer,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_retailers(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(params): Query<RetailerListParams>,
) -> Result<Json<RetailerPageResponse>, ApiError> {
    policy::authorize(
        &Caller::from(identity),
        Action::Read,
        ResourceKind::Retailer,
        None,
    )?;

    let filter = query::retailer_filter(
        params.business_type.as_deref(),
        params.owner_id.as_deref(),
        params.q.as_deref(),
    );
    let page = Page::from_raw(params.page.as_deref(), params.limit.as_deref());

    let total = repo::total(state.store.as_ref(), &filter).await?;
    let data = repo::list(
        state.store.as_ref(),
        &filter,
        &page.window_sorted(Sort::newest_first()),
    )
    .await?;

    Ok(Json(RetailerPageResponse {
        success: true,
        page: page.page,
        limit: page.limit,
        total,
        pages: page.pages(total),
        count: data.len(),
        data,
    }))
}

#[instrument(skip(state))]
pub async fn get_retailer(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RetailerResponse>, ApiError> {
    policy::authorize(
        &Caller::from(identity),
        Action::Read,
        ResourceKind::Retailer,
        None,
    )?;
    let retailer = repo::find_by_id(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Retailer not found.".into()))?;
    Ok(Json(RetailerResponse {
        success: true,
        message: None,
        retailer,
    }))
}

#[instrument(skip(state))]
pub async fn get_retailer_by_code(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(code): Path<String>,
) -> Result<Json<RetailerResponse>, ApiError> {
    policy::authorize(
        &Caller::from(identity),
        Action::Read,
        ResourceKind::Retailer,
        None,
    )?;
    let retailer = repo::find_by_code(state.store.as_ref(), code.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("Retailer not found.".into()))?;
    Ok(Json(RetailerResponse {
        success: true,
        message: None,
        retailer,
    }))
}

#[instrument(skip(state))]
pub async fn search_retailers(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(search): Path<String>,
) -> Result<Json<RetailerListResponse>, ApiError> {
    policy::authorize(
        &Caller::from(identity),
        Action::Read,
        ResourceKind::Retailer,
        None,
    )?;
    let filter = query::retailer_search(search.trim());
    let retailers = repo::list(state.store.as_ref(), &filter, &Default::default()).await?;
    if retailers.is_empty() {
        return Err(ApiError::NotFound("No matching retailers found.".into()));
    }
    Ok(Json(RetailerListResponse {
        success: true,
        count: retailers.len(),
        retailers,
    }))
}

#[instrument(skip(state))]
pub async fn my_retailer(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<RetailerResponse>, ApiError> {
    let retailer = repo::find_by_owner(state.store.as_ref(), identity.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No retailer profile found for this user.".into()))?;
    Ok(Json(RetailerResponse {
        success: true,
        message: None,
        retailer,
    }))
}

/// Validates an update payload field by field and assembles the patch. Only
/// fields actually present in the request land in the patch.
async fn build_patch(
    state: &AppState,
    identity: &Identity,
    existing: &Retailer,
    payload: UpdateRetailerRequest,
) -> Result<Value, ApiError> {
    let mut patch = Map::new();

    if let Some(code) = payload.retailer_code {
        let code = code.trim().to_string();
        checked_code(&code)?;
        patch.insert("retailerCode".into(), Value::String(code));
    }
    if let Some(name) = payload.shop_name {
        let name = name.trim().to_string();
        checked_shop_name(&name)?;
        patch.insert("shopName".into(), Value::String(name));
    }
    if let Some(raw) = payload.business_type {
        let bt = checked_business_type(&raw)?;
        patch.insert("businessType".into(), Value::String(bt.as_str().into()));
    }
    if let Some(description) = payload.description {
        patch.insert("description".into(), Value::String(description));
    }
    if let Some(address) = payload.address {
        patch.insert("address".into(), Value::String(address));
    }
    if let Some(time) = checked_time(payload.opening_time, "Opening time")? {
        patch.insert("openingTime".into(), Value::String(time));
    }
    if let Some(time) = checked_time(payload.closing_time, "Closing time")? {
        patch.insert("closingTime".into(), Value::String(time));
    }

    if let Some(raw) = payload.owner_id {
        let owner = Uuid::parse_str(raw.trim())
            .map_err(|_| ApiError::Validation("Invalid owner ID format.".into()))?;
        if owner != existing.owner_id {
            if identity.role != Role::Admin {
                return Err(ApiError::Authorization(
                    "Only admins may reassign ownership.".into(),
                ));
            }
            integrity::require_retailer_owner(state.store.as_ref(), owner).await?;
            patch.insert("ownerId".into(), Value::String(owner.to_string()));
        }
    }

    if let Some(raw) = payload.products {
        let ids = parsed_ids(Some(raw), "product")?;
        integrity::check_id_batch(state.store.as_ref(), Kind::Product, &ids, "products").await?;
        patch.insert("products".into(), serde_json::to_value(ids)?);
    }
    if let Some(raw) = payload.offers {
        let ids = parsed_ids(Some(raw), "offer")?;
        integrity::check_id_batch(state.store.as_ref(), Kind::Offer, &ids, "offers").await?;
        patch.insert("offers".into(), serde_json::to_value(ids)?);
    }

    Ok(Value::Object(patch))
}

#[instrument(skip(state, payload))]
pub async fn update_retailer(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRetailerRequest>,
) -> Result<Json<RetailerResponse>, ApiError> {
    // Existence first, so probing a missing id yields 404 before 403.
    let existing = repo::find_by_id(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Retailer not found.".into()))?;
    policy::authorize(
        &Caller::from(identity.clone()),
        Action::Update,
        ResourceKind::Retailer,
        Some(existing.owner_id),
    )?;

    let patch = build_patch(&state, &identity, &existing, payload).await?;
    let shop_name = patch.get("shopName").and_then(Value::as_str);
    let retailer_code = patch.get("retailerCode").and_then(Value::as_str);
    integrity::ensure_unique_retailer(state.store.as_ref(), shop_name, retailer_code, Some(id))
        .await?;

    let retailer = repo::update(state.store.as_ref(), id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Retailer not found.".into()))?;

    info!(retailer_id = %id, "retailer updated");
    Ok(Json(RetailerResponse {
        success: true,
        message: Some("Retailer updated".into()),
        retailer,
    }))
}

#[instrument(skip(state))]
pub async fn delete_retailer(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedRetailerResponse>, ApiError> {
    let existing = repo::find_by_id(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Retailer not found.".into()))?;
    policy::authorize(
        &Caller::from(identity),
        Action::Delete,
        ResourceKind::Retailer,
        Some(existing.owner_id),
    )?;

    repo::delete(state.store.as_ref(), id).await?;
    info!(retailer_id = %id, "retailer deleted");
    Ok(Json(DeletedRetailerResponse {
        success: true,
        message: "Retailer deleted".into(),
        id,
    }))
}
