use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{Kind, Predicate, Sort, Store, StoreError, Window};

/// In-memory document store. One lock guards all collections, so every write
/// (including its unique-index check) is atomic; that lock is what makes the
/// verify-then-insert pattern safe here.
#[derive(Default)]
pub struct MemStore {
    collections: RwLock<HashMap<Kind, Vec<Value>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Fields with a case-insensitive unique index, per collection.
fn unique_fields(kind: Kind) -> &'static [&'static str] {
    match kind {
        Kind::User => &["email"],
        Kind::Retailer => &["retailerCode", "shopName"],
        Kind::Product | Kind::Offer => &[],
    }
}

fn doc_id(doc: &Value) -> Option<Uuid> {
    doc.get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

fn field_eq_ci(a: &Value, b: &Value, field: &str) -> bool {
    match (a.get(field).and_then(Value::as_str), b.get(field).and_then(Value::as_str)) {
        (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
        _ => false,
    }
}

fn value_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

fn apply_window(mut docs: Vec<Value>, window: &Window) -> Vec<Value> {
    if let Some(Sort { field, descending }) = &window.sort {
        docs.sort_by(|a, b| {
            let null = Value::Null;
            let ord = value_cmp(a.get(*field).unwrap_or(&null), b.get(*field).unwrap_or(&null));
            if *descending {
                ord.reverse()
            } else {
                ord
            }
        });
    }
    let skipped = docs.into_iter().skip(window.skip as usize);
    match window.limit {
        Some(limit) => skipped.take(limit as usize).collect(),
        None => skipped.collect(),
    }
}

impl MemStore {
    fn check_unique(
        collection: &[Value],
        kind: Kind,
        candidate: &Value,
        exclude: Option<Uuid>,
    ) -> Result<(), StoreError> {
        for field in unique_fields(kind) {
            if candidate.get(*field).is_none() {
                continue;
            }
            let clash = collection.iter().any(|existing| {
                doc_id(existing) != exclude && field_eq_ci(existing, candidate, field)
            });
            if clash {
                return Err(StoreError::Duplicate { field });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemStore {
    async fn find(
        &self,
        kind: Kind,
        filter: &Predicate,
        window: &Window,
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;
        let matched = collections
            .get(&kind)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();
        Ok(apply_window(matched, window))
    }

    async fn find_one(&self, kind: Kind, filter: &Predicate) -> Result<Option<Value>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;
        Ok(collections
            .get(&kind)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn count(&self, kind: Kind, filter: &Predicate) -> Result<u64, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;
        Ok(collections
            .get(&kind)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, kind: Kind, doc: Value) -> Result<Value, StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;
        let collection = collections.entry(kind).or_default();
        Self::check_unique(collection, kind, &doc, None)?;
        collection.push(doc.clone());
        Ok(doc)
    }

    async fn update_by_id(
        &self,
        kind: Kind,
        id: Uuid,
        patch: Value,
    ) -> Result<Option<Value>, StoreError> {
        let Some(patch) = patch.as_object().cloned() else {
            return Err(StoreError::Backend("update patch must be an object".into()));
        };
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;
        let collection = collections.entry(kind).or_default();
        let Some(pos) = collection.iter().position(|d| doc_id(d) == Some(id)) else {
            return Ok(None);
        };
        Self::check_unique(collection, kind, &Value::Object(patch.clone()), Some(id))?;
        let doc = &mut collection[pos];
        if let Some(fields) = doc.as_object_mut() {
            for (key, value) in patch {
                fields.insert(key, value);
            }
        }
        Ok(Some(doc.clone()))
    }

    async fn delete_by_id(&self, kind: Kind, id: Uuid) -> Result<Option<Value>, StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;
        let Some(collection) = collections.get_mut(&kind) else {
            return Ok(None);
        };
        match collection.iter().position(|d| doc_id(d) == Some(id)) {
            Some(pos) => Ok(Some(collection.remove(pos))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Clause;
    use serde_json::json;

    fn user(id: Uuid, email: &str) -> Value {
        json!({ "id": id.to_string(), "email": email, "name": "someone" })
    }

    #[tokio::test]
    async fn insert_then_find_one_by_id() {
        let store = MemStore::new();
        let id = Uuid::new_v4();
        store.insert(Kind::User, user(id, "a@b.com")).await.unwrap();
        let found = store
            .find_one(Kind::User, &Predicate::by_id(id))
            .await
            .unwrap();
        assert!(found.is_some());
        let missing = store
            .find_one(Kind::User, &Predicate::by_id(Uuid::new_v4()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let store = MemStore::new();
        store
            .insert(Kind::User, user(Uuid::new_v4(), "a@b.com"))
            .await
            .unwrap();
        let err = store
            .insert(Kind::User, user(Uuid::new_v4(), "A@B.COM"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "email" }));
    }

    #[tokio::test]
    async fn duplicate_shop_name_is_rejected_on_update_but_not_self() {
        let store = MemStore::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        store
            .insert(
                Kind::Retailer,
                json!({ "id": first.to_string(), "shopName": "Daily Crust", "retailerCode": "DC-01" }),
            )
            .await
            .unwrap();
        store
            .insert(
                Kind::Retailer,
                json!({ "id": second.to_string(), "shopName": "Corner Shop", "retailerCode": "CS-01" }),
            )
            .await
            .unwrap();

        // Patching a record with its own shopName must not self-conflict.
        let patched = store
            .update_by_id(Kind::Retailer, first, json!({ "shopName": "Daily Crust" }))
            .await
            .unwrap();
        assert!(patched.is_some());

        let err = store
            .update_by_id(Kind::Retailer, second, json!({ "shopName": "daily crust" }))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "shopName" }));
    }

    #[tokio::test]
    async fn update_merges_patch_and_is_idempotent() {
        let store = MemStore::new();
        let id = Uuid::new_v4();
        store
            .insert(
                Kind::Product,
                json!({ "id": id.to_string(), "name": "Loaf", "price": 100.0 }),
            )
            .await
            .unwrap();
        let patch = json!({ "price": 90.0 });
        let once = store
            .update_by_id(Kind::Product, id, patch.clone())
            .await
            .unwrap()
            .unwrap();
        let twice = store
            .update_by_id(Kind::Product, id, patch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice["name"], "Loaf");
        assert_eq!(twice["price"], 90.0);
    }

    #[tokio::test]
    async fn find_applies_sort_skip_and_limit() {
        let store = MemStore::new();
        for day in ["01", "02", "03", "04"] {
            store
                .insert(
                    Kind::Retailer,
                    json!({
                        "id": Uuid::new_v4().to_string(),
                        "shopName": format!("shop-{day}"),
                        "retailerCode": format!("rc-{day}"),
                        "createdAt": format!("2025-03-{day}T10:00:00Z"),
                    }),
                )
                .await
                .unwrap();
        }
        let window = Window {
            skip: 1,
            limit: Some(2),
            sort: Some(Sort::newest_first()),
        };
        let page = store
            .find(Kind::Retailer, &Predicate::new(), &window)
            .await
            .unwrap();
        let names: Vec<_> = page.iter().map(|d| d["shopName"].clone()).collect();
        assert_eq!(names, vec![json!("shop-03"), json!("shop-02")]);
    }

    #[tokio::test]
    async fn count_and_delete() {
        let store = MemStore::new();
        let id = Uuid::new_v4();
        store
            .insert(Kind::Offer, json!({ "id": id.to_string(), "city": "Pune" }))
            .await
            .unwrap();
        store
            .insert(
                Kind::Offer,
                json!({ "id": Uuid::new_v4().to_string(), "city": "Mumbai" }),
            )
            .await
            .unwrap();

        let pune = Predicate::new().with(Clause::FieldEq("city", "pune".into()));
        assert_eq!(store.count(Kind::Offer, &pune).await.unwrap(), 1);

        let removed = store.delete_by_id(Kind::Offer, id).await.unwrap();
        assert!(removed.is_some());
        assert_eq!(store.count(Kind::Offer, &pune).await.unwrap(), 0);
        assert!(store.delete_by_id(Kind::Offer, id).await.unwrap().is_none());
    }
}
