use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::Value;

use carhub_core::{fields::booking, Collection};
use carhub_store::{DeleteAck, FilterBuilder, FindOptions, InsertAck};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn protected_router() -> Router {
    Router::new()
        .route("/newBooking", post(create_booking))
        .route("/myBookings/:email", get(my_bookings))
        .route("/deleteBookedCar/:id", delete(delete_booking))
}

/// Record a booking as submitted. The client supplies the denormalized car
/// fields and its own `userEmail`.
pub async fn create_booking(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<Value>,
) -> Result<Json<InsertAck>, ApiError> {
    let doc = dto::body_to_document(&body)?;
    let ack = services.store().insert_one(Collection::Bookings, doc).await?;
    Ok(Json(ack))
}

pub async fn my_bookings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    crate::authz::ensure_owner(&principal, &email)?;

    let filter = FilterBuilder::new().eq(booking::USER_EMAIL, email).build();
    let docs = services
        .store()
        .find(Collection::Bookings, filter, FindOptions::default())
        .await?;
    Ok(Json(dto::documents_to_json(docs)))
}

pub async fn delete_booking(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<DeleteAck>, ApiError> {
    let Some(id) = common::parse_id(&id) else {
        return Ok(Json(DeleteAck::new(0)));
    };

    let filter = FilterBuilder::new()
        .id(id)
        .eq(booking::USER_EMAIL, principal.email())
        .build();

    let ack = services.store().delete_one(Collection::Bookings, filter).await?;
    Ok(Json(ack))
}
