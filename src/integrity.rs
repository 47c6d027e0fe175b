//! Referential integrity pre-write gates. The store enforces no foreign-key
//! constraints, so these checks run synchronously before every write. They
//! are advisory under concurrency; unique-field safety ultimately rests on
//! the store's own unique indexes.

use uuid::Uuid;

use crate::auth::repo::{self as users, User};
use crate::error::ApiError;
use crate::policy::Role;
use crate::products::repo::{self as products, Product};
use crate::retailers::repo::Retailer;
use crate::store::{Clause, Kind, Predicate, Store};

/// The declared owner of a Retailer profile must exist and hold the retailer
/// role. A missing user is a 404, a wrong role a plain validation failure.
pub async fn require_retailer_owner(store: &dyn Store, owner_id: Uuid) -> Result<User, ApiError> {
    let owner = users::find_by_id(store, owner_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Owner user not found.".into()))?;
    if owner.role != Role::Retailer {
        return Err(ApiError::Validation(
            "User must have retailer role to own a shop.".into(),
        ));
    }
    Ok(owner)
}

/// Products and offers are written under the caller's id; that account must
/// still exist, be active and carry the retailer role when the write lands.
pub async fn require_active_retailer(store: &dyn Store, owner_id: Uuid) -> Result<User, ApiError> {
    let owner = users::find_by_id(store, owner_id).await?;
    match owner {
        Some(user) if user.active && user.role == Role::Retailer => Ok(user),
        _ => Err(ApiError::Integrity {
            field: "retailerId".into(),
            message: "Owner is not an existing, active retailer.".into(),
        }),
    }
}

/// An offer must reference an existing product.
pub async fn require_product(store: &dyn Store, product_id: Uuid) -> Result<Product, ApiError> {
    products::find_by_id(store, product_id)
        .await?
        .ok_or_else(|| ApiError::Integrity {
            field: "productId".into(),
            message: "Product not found.".into(),
        })
}

/// Batch reference check for the denormalized id lists on a Retailer. Fails
/// on the first missing element, naming its index.
pub async fn check_id_batch(
    store: &dyn Store,
    kind: Kind,
    ids: &[Uuid],
    field: &'static str,
) -> Result<(), ApiError> {
    for (index, id) in ids.iter().enumerate() {
        let found = store.find_one(kind, &Predicate::by_id(*id)).await?;
        if found.is_none() {
            return Err(ApiError::Integrity {
                field: format!("{field}[{index}]"),
                message: format!("Referenced record {id} does not exist."),
            });
        }
    }
    Ok(())
}

/// UX-level duplicate check for (retailerCode, shopName), case-insensitive,
/// excluding the record under update. The store's unique index remains the
/// backstop against races.
pub async fn ensure_unique_retailer(
    store: &dyn Store,
    shop_name: Option<&str>,
    retailer_code: Option<&str>,
    exclude: Option<Uuid>,
) -> Result<(), ApiError> {
    let mut alternatives = Vec::new();
    if let Some(name) = shop_name {
        alternatives.push(Clause::FieldEq("shopName", name.to_string()));
    }
    if let Some(code) = retailer_code {
        alternatives.push(Clause::FieldEq("retailerCode", code.to_string()));
    }
    if alternatives.is_empty() {
        return Ok(());
    }

    let mut filter = Predicate::new().with(Clause::AnyOf(alternatives));
    if let Some(id) = exclude {
        filter.push(Clause::IdNe("id", id));
    }

    if let Some(doc) = store.find_one(Kind::Retailer, &filter).await? {
        let existing: Retailer = serde_json::from_value(doc)?;
        let field = match shop_name {
            Some(name) if existing.shop_name.eq_ignore_ascii_case(name) => "shopName",
            _ => "retailerCode",
        };
        return Err(ApiError::Conflict(format!(
            "A retailer with this {field} already exists."
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use serde_json::json;
    use time::OffsetDateTime;

    fn seed_user(role: Role, active: bool) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Asha".into(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password: "hash".into(),
            role,
            city: Some("Pune".into()),
            active,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn offer_with_dangling_product_names_the_field() {
        let store = MemStore::new();
        let err = require_product(&store, Uuid::new_v4()).await.unwrap_err();
        match err {
            ApiError::Integrity { field, .. } => assert_eq!(field, "productId"),
            other => panic!("expected integrity error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn retailer_owner_must_exist_and_have_the_role() {
        let store = MemStore::new();
        let missing = require_retailer_owner(&store, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(missing, ApiError::NotFound(_)));

        let customer = seed_user(Role::Customer, true);
        users::insert(&store, &customer).await.unwrap();
        let wrong_role = require_retailer_owner(&store, customer.id)
            .await
            .unwrap_err();
        assert!(matches!(wrong_role, ApiError::Validation(_)));

        let retailer = seed_user(Role::Retailer, true);
        users::insert(&store, &retailer).await.unwrap();
        assert!(require_retailer_owner(&store, retailer.id).await.is_ok());
    }

    #[tokio::test]
    async fn inactive_owner_fails_the_active_check() {
        let store = MemStore::new();
        let dormant = seed_user(Role::Retailer, false);
        users::insert(&store, &dormant).await.unwrap();
        let err = require_active_retailer(&store, dormant.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Integrity { .. }));
    }

    #[tokio::test]
    async fn batch_check_names_the_failing_index() {
        let store = MemStore::new();
        let good = Uuid::new_v4();
        store
            .insert(Kind::Product, json!({ "id": good.to_string() }))
            .await
            .unwrap();
        let bad = Uuid::new_v4();

        assert!(check_id_batch(&store, Kind::Product, &[good], "products")
            .await
            .is_ok());
        let err = check_id_batch(&store, Kind::Product, &[good, bad], "products")
            .await
            .unwrap_err();
        match err {
            ApiError::Integrity { field, .. } => assert_eq!(field, "products[1]"),
            other => panic!("expected integrity error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_check_is_case_insensitive_and_excludes_self() {
        let store = MemStore::new();
        let id = Uuid::new_v4();
        store
            .insert(
                Kind::Retailer,
                json!({
                    "id": id.to_string(),
                    "retailerCode": "DC-01",
                    "shopName": "Daily Crust",
                    "ownerId": Uuid::new_v4().to_string(),
                    "businessType": "Bakery",
                    "description": "bread",
                    "address": "FC Road",
                    "createdAt": "2025-01-01T00:00:00Z",
                }),
            )
            .await
            .unwrap();

        let err = ensure_unique_retailer(&store, Some("daily crust"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert!(err.to_string().contains("shopName"));

        // The record under update never conflicts with itself.
        assert!(
            ensure_unique_retailer(&store, Some("Daily Crust"), Some("DC-01"), Some(id))
                .await
                .is_ok()
        );
    }
}
