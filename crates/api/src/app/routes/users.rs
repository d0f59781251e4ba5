use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

use carhub_core::{fields::user, Collection};
use carhub_store::{FilterBuilder, UpdateAck};

use crate::app::dto::{self, CurrentUserQuery};
use crate::app::errors::ApiError;
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub const ALREADY_EXISTS: &str = "user already exists";

pub fn public_router() -> Router {
    Router::new().route("/newUser", post(create_user))
}

pub fn protected_router() -> Router {
    Router::new()
        .route("/updateProfile", put(update_profile))
        .route("/currentUser", get(current_user))
}

/// Register a user record once per email. Registering an existing email
/// changes nothing.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let Some(Some(email)) = dto::body_email(&body) else {
        return Err(ApiError::bad_request("email is required"));
    };

    let filter = FilterBuilder::new().eq(user::EMAIL, email).build();
    let doc = dto::update_fields(&body)?;

    let outcome = services
        .store()
        .insert_if_absent(Collection::Users, filter, doc)
        .await?;

    Ok(match outcome {
        Some(ack) => Json(ack).into_response(),
        None => Json(json!({
            "message": ALREADY_EXISTS,
            "insertedId": null,
        }))
        .into_response(),
    })
}

/// Upsert the caller's own profile. The email key always comes from the
/// token; a body naming another email is refused.
pub async fn update_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<Value>,
) -> Result<Json<UpdateAck>, ApiError> {
    if let Some(email) = dto::body_email(&body) {
        if email != Some(principal.email()) {
            return Err(ApiError::Forbidden);
        }
    }

    let set = dto::update_fields(&body)?;
    let filter = FilterBuilder::new().eq(user::EMAIL, principal.email()).build();

    let ack = common::apply_update(services.store(), Collection::Users, filter, set, true).await?;
    Ok(Json(ack))
}

/// The caller's user record, or `null`. Without an `email` parameter the
/// token's email is used.
pub async fn current_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<CurrentUserQuery>,
) -> Result<Json<Value>, ApiError> {
    let email = query.email.unwrap_or_else(|| principal.email().to_string());
    crate::authz::ensure_owner(&principal, &email)?;

    let doc = services
        .store()
        .find_one(Collection::Users, FilterBuilder::new().eq(user::EMAIL, email).build())
        .await?;
    Ok(Json(dto::optional_document_to_json(doc)))
}
