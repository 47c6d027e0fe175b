use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::policy::Role;
use crate::store::{Clause, Kind, Predicate, Store};

/// Stored user document. The password hash travels with the document; only
/// `PublicUser` ever leaves the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub city: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

fn default_active() -> bool {
    true
}

pub async fn find_by_email(store: &dyn Store, email: &str) -> Result<Option<User>, ApiError> {
    let filter = Predicate::new().with(Clause::FieldEq("email", email.to_string()));
    match store.find_one(Kind::User, &filter).await? {
        Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
        None => Ok(None),
    }
}

pub async fn find_by_id(store: &dyn Store, id: Uuid) -> Result<Option<User>, ApiError> {
    match store.find_one(Kind::User, &Predicate::by_id(id)).await? {
        Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
        None => Ok(None),
    }
}

pub async fn insert(store: &dyn Store, user: &User) -> Result<User, ApiError> {
    let doc = store.insert(Kind::User, serde_json::to_value(user)?).await?;
    Ok(serde_json::from_value(doc)?)
}
