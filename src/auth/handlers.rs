use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, JwtKeys, LoginRequest, MeResponse, PublicUser, SignupRequest},
        jwt::AuthUser,
        password::{hash_password, verify_password},
        repo::{self, User},
    },
    error::ApiError,
    policy::{Identity, Role},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(signup))
        .route("/session", post(login))
        .route("/me", get(me))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(message.into()))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let name = required(payload.name, "Missing required fields.")?;
    let email = required(payload.email, "Missing required fields.")?.to_lowercase();
    let password = required(payload.password, "Missing required fields.")?;
    let role_raw = required(payload.role, "Missing required fields.")?;

    // Self-registration only hands out the two public roles.
    let role = match Role::parse(&role_raw) {
        Some(role @ (Role::Retailer | Role::Customer)) => role,
        _ => {
            return Err(ApiError::Validation(
                "Invalid role. Use 'retailer' or 'customer'.".into(),
            ))
        }
    };

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("Invalid email.".into()));
    }
    if password.len() < 8 {
        return Err(ApiError::Validation("Password too short.".into()));
    }

    if repo::find_by_email(state.store.as_ref(), &email)
        .await?
        .is_some()
    {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Conflict(
            "User already exists with this email.".into(),
        ));
    }

    let user = User {
        id: Uuid::new_v4(),
        name,
        email,
        password: hash_password(&password)?,
        role,
        city: payload.city.filter(|c| !c.trim().is_empty()),
        active: true,
        created_at: OffsetDateTime::now_utc(),
    };
    // The store's unique email index is the backstop if two signups race.
    let user = repo::insert(state.store.as_ref(), &user).await?;

    let identity = Identity {
        id: user.id,
        role: user.role,
        email: user.email.clone(),
    };
    let token = JwtKeys::from_ref(&state).sign(&identity)?;

    info!(user_id = %user.id, role = user.role.as_str(), "user signed up");
    Ok(Json(AuthResponse {
        success: true,
        message: "Signup successful".into(),
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = required(payload.email, "Both email and password are required.")?.to_lowercase();
    let password = required(payload.password, "Both email and password are required.")?;

    let user = repo::find_by_email(state.store.as_ref(), &email)
        .await?
        .ok_or_else(|| {
            warn!(email = %email, "login for unknown email");
            ApiError::NotFound("User not found.".into())
        })?;

    if !verify_password(&password, &user.password)? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::Authentication("Invalid credentials.".into()));
    }

    let identity = Identity {
        id: user.id,
        role: user.role,
        email: user.email.clone(),
    };
    let token = JwtKeys::from_ref(&state).sign(&identity)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful".into(),
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    let user = repo::find_by_id(state.store.as_ref(), identity.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".into()))?;
    Ok(Json(MeResponse {
        success: true,
        user: user.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup_body(email: &str, role: &str) -> SignupRequest {
        SignupRequest {
            name: Some("Asha".into()),
            email: Some(email.into()),
            password: Some("longenough".into()),
            role: Some(role.into()),
            city: Some("Pune".into()),
        }
    }

    #[tokio::test]
    async fn signup_then_login_yields_a_token_with_the_role() {
        let state = AppState::fake();
        let signed_up = signup(State(state.clone()), Json(signup_body("a@b.com", "retailer")))
            .await
            .expect("signup")
            .0;
        assert!(signed_up.success);
        assert_eq!(signed_up.user.role, Role::Retailer);

        let logged_in = login(
            State(state.clone()),
            Json(LoginRequest {
                email: Some("a@b.com".into()),
                password: Some("longenough".into()),
            }),
        )
        .await
        .expect("login")
        .0;

        let claims = JwtKeys::from_ref(&state)
            .verify(&logged_in.token)
            .expect("token verifies");
        assert_eq!(claims.role, Role::Retailer);
        assert_eq!(claims.sub, signed_up.user.id);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let state = AppState::fake();
        signup(State(state.clone()), Json(signup_body("a@b.com", "customer")))
            .await
            .expect("first signup");
        let err = signup(State(state), Json(signup_body("A@B.com", "customer")))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn admin_role_cannot_be_self_assigned() {
        let state = AppState::fake();
        let err = signup(State(state), Json(signup_body("a@b.com", "admin")))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn login_distinguishes_unknown_user_from_bad_password() {
        let state = AppState::fake();
        signup(State(state.clone()), Json(signup_body("a@b.com", "customer")))
            .await
            .expect("signup");

        let unknown = login(
            State(state.clone()),
            Json(LoginRequest {
                email: Some("nobody@b.com".into()),
                password: Some("longenough".into()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(unknown, ApiError::NotFound(_)));

        let wrong = login(
            State(state),
            Json(LoginRequest {
                email: Some("a@b.com".into()),
                password: Some("wrongpassword".into()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(wrong, ApiError::Authentication(_)));
    }
}
