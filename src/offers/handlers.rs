use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    integrity,
    policy::{self, Action, Caller, ResourceKind},
    products::repo as products,
    query::{self, Page},
    state::AppState,
};

use super::dto::{
    CreateOfferRequest, DeletedResponse, OfferFilterParams, OfferListParams, OfferListResponse,
    OfferResponse, OfferSearchParams, UpdateOfferRequest,
};
use super::repo::{self, Offer};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_offers).post(create_offer))
        .route("/filter", get(filter_offers))
        .route("/search/:city/:query", get(search_offers))
        .route("/mine", get(my_offers))
        .route("/:id", get(get_offer).put(update_offer).delete(delete_offer))
}

fn required<T>(value: Option<T>) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::Validation("All required fields must be provided.".into()))
}

fn required_str(value: Option<String>) -> Result<String, ApiError> {
    required(value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
}

fn parse_date(raw: &str, field: &str) -> Result<OffsetDateTime, ApiError> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|_| ApiError::Validation(format!("Invalid {field} date. Use RFC 3339 format.")))
}

fn valid_discount(value: f64) -> Result<f64, ApiError> {
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(ApiError::Validation(
            "Discount percent must be between 0 and 100.".into(),
        ))
    }
}

#[instrument(skip(state, payload))]
pub async fn create_offer(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(payload): Json<CreateOfferRequest>,
) -> Result<(StatusCode, Json<OfferResponse>), ApiError> {
    let product_id = required(payload.product)?;
    let title = required_str(payload.title)?;
    let discount_percent = valid_discount(required(payload.discount_percent)?)?;
    let original_price = required(payload.original_price)?;
    // offerPrice < originalPrice is deliberately not enforced.
    let offer_price = required(payload.offer_price)?;
    let valid_from = parse_date(&required_str(payload.valid_from)?, "validFrom")?;
    let valid_till = parse_date(&required_str(payload.valid_till)?, "validTill")?;
    let city = required_str(payload.city)?;
    let area = required_str(payload.area)?;

    let caller = Caller::from(identity.clone());
    policy::authorize(&caller, Action::Create, ResourceKind::Offer, Some(identity.id))?;
    integrity::require_active_retailer(state.store.as_ref(), identity.id).await?;
    integrity::require_product(state.store.as_ref(), product_id).await?;

    let offer = Offer {
        id: Uuid::new_v4(),
        product_id,
        owner_id: identity.id,
        title,
        description: payload.description,
        discount_percent,
        original_price,
        offer_price,
        valid_from,
        valid_till,
        city,
        area,
        is_premium: payload.is_premium.unwrap_or(false),
        created_at: OffsetDateTime::now_utc(),
    };
    let offer = repo::insert(state.store.as_ref(), &offer).await?;

    info!(offer_id = %offer.id, owner_id = %identity.id, "offer created");
    Ok((
        StatusCode::CREATED,
        Json(OfferResponse {
            success: true,
            message: Some("Offer created".into()),
            offer,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_offers(
    State(state): State<AppState>,
    Query(params): Query<OfferListParams>,
) -> Result<Json<OfferListResponse>, ApiError> {
    let filter = query::offer_filter(params.city.as_deref(), params.area.as_deref());
    let page = Page::from_raw(params.page.as_deref(), params.limit.as_deref());
    let offers = repo::list(state.store.as_ref(), &filter, &page.window()).await?;
    Ok(Json(OfferListResponse {
        success: true,
        count: offers.len(),
        offers,
    }))
}

/// Offers filtered by locality plus product attributes. Product attributes
/// resolve matching catalog ids first; when nothing matches, the offers
/// store is never queried at all.
#[instrument(skip(state))]
pub async fn filter_offers(
    State(state): State<AppState>,
    Query(params): Query<OfferFilterParams>,
) -> Result<Json<OfferListResponse>, ApiError> {
    let city = params
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::Validation("City is required.".into()))?;

    let mut filter = query::offer_filter(Some(city), params.area.as_deref());

    let product_filter = query::product_match_filter(
        params.category.as_deref(),
        params.brand.as_deref(),
        params.product.as_deref(),
    );
    if let Some(product_filter) = product_filter {
        let ids = products::ids_matching(state.store.as_ref(), &product_filter).await?;
        if ids.is_empty() {
            return Ok(Json(OfferListResponse {
                success: true,
                count: 0,
                offers: Vec::new(),
            }));
        }
        filter = query::with_product_ids(filter, ids);
    }

    let page = Page::from_raw(params.page.as_deref(), params.limit.as_deref());
    let offers = repo::list(state.store.as_ref(), &filter, &page.window()).await?;
    Ok(Json(OfferListResponse {
        success: true,
        count: offers.len(),
        offers,
    }))
}

/// Free-text search: locality is a substring scope, the query matches
/// product name/brand/category.
#[instrument(skip(state))]
pub async fn search_offers(
    State(state): State<AppState>,
    Path((city, text)): Path<(String, String)>,
    Query(params): Query<OfferSearchParams>,
) -> Result<Json<OfferListResponse>, ApiError> {
    if city.trim().is_empty() || text.trim().is_empty() {
        return Err(ApiError::Validation(
            "City and search query are required.".into(),
        ));
    }

    let ids = products::ids_matching(state.store.as_ref(), &query::product_search(&text)).await?;
    if ids.is_empty() {
        return Err(ApiError::NotFound("No matching offers found.".into()));
    }

    let scope = query::offer_search_scope(&city, params.area.as_deref());
    let filter = query::with_product_ids(scope, ids);
    let offers = repo::list(state.store.as_ref(), &filter, &Default::default()).await?;
    if offers.is_empty() {
        return Err(ApiError::NotFound("No matching offers found.".into()));
    }
    Ok(Json(OfferListResponse {
        success: true,
        count: offers.len(),
        offers,
    }))
}

#[instrument(skip(state))]
pub async fn get_offer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OfferResponse>, ApiError> {
    let offer = repo::find_by_id(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Offer not found.".into()))?;
    Ok(Json(OfferResponse {
        success: true,
        message: None,
        offer,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_offer(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOfferRequest>,
) -> Result<Json<OfferResponse>, ApiError> {
    let existing = repo::find_by_id(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Offer not found.".into()))?;
    policy::authorize(
        &Caller::from(identity.clone()),
        Action::Update,
        ResourceKind::Offer,
        Some(existing.owner_id),
    )?;

    if let Some(value) = payload.discount_percent {
        valid_discount(value)?;
    }
    if let Some(raw) = payload.valid_from.as_deref() {
        parse_date(raw, "validFrom")?;
    }
    if let Some(raw) = payload.valid_till.as_deref() {
        parse_date(raw, "validTill")?;
    }

    let patch = serde_json::to_value(&payload)?;
    let offer = repo::update(state.store.as_ref(), id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Offer not found.".into()))?;

    info!(offer_id = %id, "offer updated");
    Ok(Json(OfferResponse {
        success: true,
        message: Some("Offer updated".into()),
        offer,
    }))
}

#[instrument(skip(state))]
pub async fn delete_offer(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let existing = repo::find_by_id(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Offer not found.".into()))?;
    policy::authorize(
        &Caller::from(identity),
        Action::Delete,
        ResourceKind::Offer,
        Some(existing.owner_id),
    )?;

    repo::delete(state.store.as_ref(), id).await?;
    info!(offer_id = %id, "offer deleted");
    Ok(Json(DeletedResponse {
        success: true,
        message: "Offer deleted".into(),
    }))
}

#[instrument(skip(state))]
pub async fn my_offers(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<OfferListResponse>, ApiError> {
    let offers = repo::find_by_owner(state.store.as_ref(), identity.id).await?;
    if offers.is_empty() {
        return Err(ApiError::NotFound("No offers found.".into()));
    }
    Ok(Json(OfferListResponse {
        success: true,
        count: offers.len(),
        offers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::products::handlers::tests::{seed_product, seed_retailer};
    use crate::store::Kind;

    fn offer_body(product: Uuid, city: &str) -> CreateOfferRequest {
        CreateOfferRequest {
            product: Some(product),
            title: Some("Weekend deal".into()),
            description: None,
            discount_percent: Some(20.0),
            original_price: Some(120.0),
            offer_price: Some(96.0),
            valid_from: Some("2025-06-01T00:00:00Z".into()),
            valid_till: Some("2025-06-08T00:00:00Z".into()),
            city: Some(city.into()),
            area: Some("Kothrud".into()),
            is_premium: None,
        }
    }

    #[tokio::test]
    async fn dangling_product_reference_fails_and_inserts_nothing() {
        let state = AppState::fake();
        let identity = seed_retailer(&state, "r@example.com").await;
        let err = create_offer(
            State(state.clone()),
            AuthUser(identity),
            Json(offer_body(Uuid::new_v4(), "Pune")),
        )
        .await
        .unwrap_err();
        match err {
            ApiError::Integrity { field, .. } => assert_eq!(field, "productId"),
            other => panic!("expected integrity error, got {other:?}"),
        }
        let total = state
            .store
            .count(Kind::Offer, &Default::default())
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn cross_entity_filter_selects_offers_through_product_attributes() {
        let state = AppState::fake();
        let identity = seed_retailer(&state, "r@example.com").await;
        let bakery = seed_product(&state, &identity, "Loaf", "Bakery", "Pune").await;
        let grocery = seed_product(&state, &identity, "Rice", "Grocery", "Pune").await;

        let (_, Json(o1)) = create_offer(
            State(state.clone()),
            AuthUser(identity.clone()),
            Json(offer_body(bakery.id, "Pune")),
        )
        .await
        .unwrap();
        create_offer(
            State(state.clone()),
            AuthUser(identity),
            Json(offer_body(grocery.id, "Pune")),
        )
        .await
        .unwrap();

        let params = OfferFilterParams {
            city: Some("Pune".into()),
            category: Some("Bakery".into()),
            ..Default::default()
        };
        let Json(res) = filter_offers(State(state), Query(params)).await.unwrap();
        assert_eq!(res.count, 1);
        assert_eq!(res.offers[0].id, o1.offer.id);
        assert_eq!(res.offers[0].product_id, bakery.id);
    }

    #[tokio::test]
    async fn filter_short_circuits_to_empty_when_no_product_matches() {
        let state = AppState::fake();
        let identity = seed_retailer(&state, "r@example.com").await;
        let product = seed_product(&state, &identity, "Loaf", "Bakery", "Pune").await;
        create_offer(
            State(state.clone()),
            AuthUser(identity),
            Json(offer_body(product.id, "Pune")),
        )
        .await
        .unwrap();

        let params = OfferFilterParams {
            city: Some("Pune".into()),
            category: Some("Salon".into()),
            ..Default::default()
        };
        let Json(res) = filter_offers(State(state), Query(params)).await.unwrap();
        assert!(res.success);
        assert_eq!(res.count, 0);
    }

    #[tokio::test]
    async fn filter_requires_a_city() {
        let state = AppState::fake();
        let err = filter_offers(State(state), Query(OfferFilterParams::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn search_matches_product_text_within_the_city_scope() {
        let state = AppState::fake();
        let identity = seed_retailer(&state, "r@example.com").await;
        let product = seed_product(&state, &identity, "Sourdough Loaf", "Bakery", "Pune").await;
        create_offer(
            State(state.clone()),
            AuthUser(identity),
            Json(offer_body(product.id, "Pune")),
        )
        .await
        .unwrap();

        let Json(found) = search_offers(
            State(state.clone()),
            Path(("pune".into(), "sourdough".into())),
            Query(OfferSearchParams::default()),
        )
        .await
        .unwrap();
        assert_eq!(found.count, 1);

        let miss = search_offers(
            State(state),
            Path(("pune".into(), "bagel".into())),
            Query(OfferSearchParams::default()),
        )
        .await
        .unwrap_err();
        assert!(matches!(miss, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn expired_offers_are_still_returned() {
        let state = AppState::fake();
        let identity = seed_retailer(&state, "r@example.com").await;
        let product = seed_product(&state, &identity, "Loaf", "Bakery", "Pune").await;
        let mut body = offer_body(product.id, "Pune");
        body.valid_from = Some("2020-01-01T00:00:00Z".into());
        body.valid_till = Some("2020-01-08T00:00:00Z".into());
        create_offer(State(state.clone()), AuthUser(identity), Json(body))
            .await
            .unwrap();

        let Json(res) = list_offers(State(state), Query(OfferListParams::default()))
            .await
            .unwrap();
        assert_eq!(res.count, 1);
    }
}
