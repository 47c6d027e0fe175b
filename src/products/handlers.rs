use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    integrity,
    policy::{self, Action, Caller, ResourceKind},
    query::{self, Page},
    state::AppState,
};

use super::dto::{
    CreateProductRequest, DeletedResponse, ProductListParams, ProductListResponse, ProductResponse,
    UpdateProductRequest,
};
use super::repo::{self, Product};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/mine", get(my_products))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

fn required(value: Option<String>) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation("All required fields must be provided.".into()))
}

fn positive_price(price: f64) -> Result<f64, ApiError> {
    if price > 0.0 {
        Ok(price)
    } else {
        Err(ApiError::Validation("Price must be greater than zero.".into()))
    }
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let name = required(payload.name)?;
    let brand = required(payload.brand)?;
    let category = required(payload.category)?;
    let city = required(payload.city)?;
    let area = required(payload.area)?;
    let price = positive_price(
        payload
            .price
            .ok_or_else(|| ApiError::Validation("All required fields must be provided.".into()))?,
    )?;

    let caller = Caller::from(identity.clone());
    policy::authorize(&caller, Action::Create, ResourceKind::Product, Some(identity.id))?;
    integrity::require_active_retailer(state.store.as_ref(), identity.id).await?;

    let product = Product {
        id: Uuid::new_v4(),
        name,
        brand,
        category,
        description: payload.description,
        price,
        city,
        area,
        image: payload.image,
        owner_id: identity.id,
        created_at: OffsetDateTime::now_utc(),
    };
    let product = repo::insert(state.store.as_ref(), &product).await?;

    info!(product_id = %product.id, owner_id = %identity.id, "product created");
    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            success: true,
            message: Some("Product created".into()),
            product,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> Result<Json<ProductListResponse>, ApiError> {
    let filter = query::product_filter(
        params.city.as_deref(),
        params.area.as_deref(),
        params.category.as_deref(),
        params.min_price.as_deref(),
        params.max_price.as_deref(),
    );
    let page = Page::from_raw(params.page.as_deref(), params.limit.as_deref());
    let products = repo::list(state.store.as_ref(), &filter, &page.window()).await?;
    Ok(Json(ProductListResponse {
        success: true,
        count: products.len(),
        products,
    }))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = repo::find_by_id(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found.".into()))?;
    Ok(Json(ProductResponse {
        success: true,
        message: None,
        product,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    // Existence first, so probing a missing id yields 404 before 403.
    let existing = repo::find_by_id(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found.".into()))?;
    policy::authorize(
        &Caller::from(identity.clone()),
        Action::Update,
        ResourceKind::Product,
        Some(existing.owner_id),
    )?;

    if let Some(price) = payload.price {
        positive_price(price)?;
    }

    let patch = serde_json::to_value(&payload)?;
    let product = repo::update(state.store.as_ref(), id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found.".into()))?;

    info!(product_id = %id, "product updated");
    Ok(Json(ProductResponse {
        success: true,
        message: Some("Product updated".into()),
        product,
    }))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let existing = repo::find_by_id(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found.".into()))?;
    policy::authorize(
        &Caller::from(identity),
        Action::Delete,
        ResourceKind::Product,
        Some(existing.owner_id),
    )?;

    repo::delete(state.store.as_ref(), id).await?;
    info!(product_id = %id, "product deleted");
    Ok(Json(DeletedResponse {
        success: true,
        message: "Product deleted".into(),
    }))
}

#[instrument(skip(state))]
pub async fn my_products(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<ProductListResponse>, ApiError> {
    let products = repo::find_by_owner(state.store.as_ref(), identity.id).await?;
    if products.is_empty() {
        return Err(ApiError::NotFound("No products found.".into()));
    }
    Ok(Json(ProductListResponse {
        success: true,
        count: products.len(),
        products,
    }))
}
