use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Role carried by every user record and every token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Retailer,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "customer" => Some(Self::Customer),
            "retailer" => Some(Self::Retailer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Retailer => "retailer",
            Self::Admin => "admin",
        }
    }
}

/// Verified identity produced by the authenticator.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
    pub email: String,
}

/// The caller as seen by the policy engine.
#[derive(Debug, Clone)]
pub enum Caller {
    Anonymous,
    Known(Identity),
}

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Anonymous => None,
            Self::Known(identity) => Some(identity),
        }
    }
}

impl From<Identity> for Caller {
    fn from(identity: Identity) -> Self {
        Self::Known(identity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    User,
    Retailer,
    Product,
    Offer,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Deny {
    #[error("Authentication required.")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(&'static str),
}

impl From<Deny> for ApiError {
    fn from(deny: Deny) -> Self {
        match deny {
            Deny::Unauthenticated => ApiError::Authentication(deny.to_string()),
            Deny::Forbidden(reason) => ApiError::Authorization(reason.to_string()),
        }
    }
}

/// Pure authorization decision. Performs no I/O; callers fetch the target
/// record first and pass its owner, so a missing id surfaces as 404 before
/// ownership is ever evaluated.
///
/// `owner` is the resource's owner for Update/Delete, the payload's declared
/// owner for Create, and ignored for Read.
pub fn authorize(
    caller: &Caller,
    action: Action,
    kind: ResourceKind,
    owner: Option<Uuid>,
) -> Result<(), Deny> {
    if action == Action::Read {
        // Products and offers are browsable anonymously; retailer profiles
        // and user records are behind authentication (observed asymmetry).
        return match kind {
            ResourceKind::Product | ResourceKind::Offer => Ok(()),
            ResourceKind::Retailer | ResourceKind::User => {
                caller.identity().map(|_| ()).ok_or(Deny::Unauthenticated)
            }
        };
    }

    let identity = caller.identity().ok_or(Deny::Unauthenticated)?;

    match action {
        Action::Create => {
            let role_ok = match kind {
                ResourceKind::Product | ResourceKind::Offer => identity.role == Role::Retailer,
                ResourceKind::Retailer => {
                    matches!(identity.role, Role::Retailer | Role::Admin)
                }
                // Self-registration bypasses the engine; anything else is
                // admin provisioning.
                ResourceKind::User => identity.role == Role::Admin,
            };
            if !role_ok {
                return Err(Deny::Forbidden("Retailer role required."));
            }
            if let Some(owner) = owner {
                if owner != identity.id && identity.role != Role::Admin {
                    return Err(Deny::Forbidden(
                        "You can only create resources for yourself.",
                    ));
                }
            }
            Ok(())
        }
        Action::Update | Action::Delete => match owner {
            Some(owner) if owner == identity.id || identity.role == Role::Admin => Ok(()),
            _ => Err(Deny::Forbidden("Unauthorized.")),
        },
        Action::Read => unreachable!("handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            role,
            email: format!("{}@example.com", role.as_str()),
        }
    }

    fn known(role: Role) -> Caller {
        Caller::Known(identity(role))
    }

    #[test]
    fn products_and_offers_are_readable_anonymously() {
        for kind in [ResourceKind::Product, ResourceKind::Offer] {
            assert_eq!(
                authorize(&Caller::Anonymous, Action::Read, kind, None),
                Ok(())
            );
        }
    }

    #[test]
    fn retailer_and_user_reads_require_authentication() {
        for kind in [ResourceKind::Retailer, ResourceKind::User] {
            assert_eq!(
                authorize(&Caller::Anonymous, Action::Read, kind, None),
                Err(Deny::Unauthenticated)
            );
            assert_eq!(
                authorize(&known(Role::Customer), Action::Read, kind, None),
                Ok(())
            );
        }
    }

    #[test]
    fn writes_require_authentication() {
        for action in [Action::Create, Action::Update, Action::Delete] {
            assert_eq!(
                authorize(&Caller::Anonymous, action, ResourceKind::Product, None),
                Err(Deny::Unauthenticated)
            );
        }
    }

    #[test]
    fn product_and_offer_creation_needs_retailer_role() {
        let retailer = identity(Role::Retailer);
        let caller = Caller::Known(retailer.clone());
        for kind in [ResourceKind::Product, ResourceKind::Offer] {
            assert_eq!(
                authorize(&caller, Action::Create, kind, Some(retailer.id)),
                Ok(())
            );
            assert!(authorize(&known(Role::Customer), Action::Create, kind, None).is_err());
        }
    }

    #[test]
    fn retailer_creation_allows_retailer_or_admin() {
        assert!(authorize(&known(Role::Retailer), Action::Create, ResourceKind::Retailer, None).is_ok());
        assert!(authorize(&known(Role::Admin), Action::Create, ResourceKind::Retailer, None).is_ok());
        assert!(authorize(&known(Role::Customer), Action::Create, ResourceKind::Retailer, None).is_err());
    }

    #[test]
    fn creation_for_someone_else_is_admin_only() {
        let retailer = identity(Role::Retailer);
        let other = Uuid::new_v4();
        assert_eq!(
            authorize(
                &Caller::Known(retailer),
                Action::Create,
                ResourceKind::Retailer,
                Some(other)
            ),
            Err(Deny::Forbidden("You can only create resources for yourself."))
        );
        assert_eq!(
            authorize(
                &known(Role::Admin),
                Action::Create,
                ResourceKind::Retailer,
                Some(other)
            ),
            Ok(())
        );
    }

    // Update/Delete is Allow iff caller owns the record or is admin.
    #[test]
    fn update_and_delete_follow_ownership_or_admin() {
        let owner = identity(Role::Retailer);
        let owner_caller = Caller::Known(owner.clone());
        let stranger = known(Role::Retailer);
        let admin = known(Role::Admin);

        for action in [Action::Update, Action::Delete] {
            for kind in [
                ResourceKind::Product,
                ResourceKind::Offer,
                ResourceKind::Retailer,
                ResourceKind::User,
            ] {
                assert_eq!(authorize(&owner_caller, action, kind, Some(owner.id)), Ok(()));
                assert_eq!(
                    authorize(&stranger, action, kind, Some(owner.id)),
                    Err(Deny::Forbidden("Unauthorized."))
                );
                assert_eq!(authorize(&admin, action, kind, Some(owner.id)), Ok(()));
            }
        }
    }

    #[test]
    fn deny_maps_to_the_error_taxonomy() {
        use axum::http::StatusCode;
        let unauthenticated: ApiError = Deny::Unauthenticated.into();
        assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);
        let forbidden: ApiError = Deny::Forbidden("Unauthorized.").into();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }
}
