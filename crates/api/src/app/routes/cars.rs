use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde_json::Value;

use carhub_core::{fields::car, Collection};
use carhub_store::{DeleteAck, FilterBuilder, FindOptions, InsertAck, Projection, Sort, UpdateAck};

use crate::app::dto::{self, CarListQuery, CarPage};
use crate::app::errors::ApiError;
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Fields shown on listing cards.
const CARD_FIELDS: &[&str] = &[
    car::NAME,
    car::IMAGE,
    car::CATEGORY,
    car::RENTAL_PRICE,
    car::RATING,
    car::AVAILABILITY,
    car::LOCATION,
    car::CREATED_AT,
];
const HERO_FIELDS: &[&str] = &[car::NAME, car::IMAGE, car::DESCRIPTION, car::RENTAL_PRICE];
const BROWSE_HIDDEN: &[&str] = &[car::DESCRIPTION];

const HERO_LIMIT: u64 = 5;
const SHOWCASE_LIMIT: u64 = 6;

pub fn public_router() -> Router {
    Router::new()
        .route("/allCars", get(all_cars))
        .route("/heroSlider", get(hero_slider))
        .route("/newestCars", get(newest_cars))
        .route("/topRatedCars", get(top_rated_cars))
        .route("/car/:id", get(get_car))
}

pub fn protected_router() -> Router {
    Router::new()
        .route("/newCar", post(create_car))
        .route("/myListings/:email", get(my_listings))
        .route("/updateCar/:id", patch(update_car))
        .route("/deleteCar/:id", delete(delete_car))
}

pub async fn create_car(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<Value>,
) -> Result<Json<InsertAck>, ApiError> {
    let doc = dto::body_to_document(&body)?;
    let ack = services.store().insert_one(Collection::Cars, doc).await?;
    Ok(Json(ack))
}

/// Browse all cars: optional search over name/category, optional
/// availability flag, pagination. Descriptions are left out.
pub async fn all_cars(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<CarListQuery>,
) -> Result<Json<CarPage>, ApiError> {
    let filter = FilterBuilder::new()
        .search(&car::SEARCHABLE, query.search.as_deref())
        .flag(car::AVAILABILITY, query.availability.as_deref(), car::AVAILABLE_SENTINEL)
        .build();
    let options = FindOptions::default().projection(Projection::Exclude(BROWSE_HIDDEN));

    let page = common::car_page(services.store(), filter, options, query.page()).await?;
    Ok(Json(page))
}

pub async fn hero_slider(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let filter = FilterBuilder::new().eq(car::AVAILABILITY, true).build();
    let options = FindOptions::default()
        .projection(Projection::Include(HERO_FIELDS))
        .limit(HERO_LIMIT);

    let docs = services.store().find(Collection::Cars, filter, options).await?;
    Ok(Json(dto::documents_to_json(docs)))
}

pub async fn newest_cars(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<Value>>, ApiError> {
    showcase(&services, Sort::descending(car::CREATED_AT)).await
}

pub async fn top_rated_cars(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<Value>>, ApiError> {
    showcase(&services, Sort::descending(car::RATING)).await
}

async fn showcase(services: &AppServices, sort: Sort) -> Result<Json<Vec<Value>>, ApiError> {
    let options = FindOptions::default()
        .projection(Projection::Include(CARD_FIELDS))
        .sort(sort)
        .limit(SHOWCASE_LIMIT);

    let docs = services
        .store()
        .find(Collection::Cars, FilterBuilder::new().build(), options)
        .await?;
    Ok(Json(dto::documents_to_json(docs)))
}

/// Car detail. A malformed or unknown id is `null`, not an error.
pub async fn get_car(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let Some(id) = common::parse_id(&id) else {
        return Ok(Json(Value::Null));
    };

    let doc = services
        .store()
        .find_one(Collection::Cars, FilterBuilder::new().id(id).build())
        .await?;
    Ok(Json(dto::optional_document_to_json(doc)))
}

pub async fn my_listings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(email): Path<String>,
    Query(query): Query<CarListQuery>,
) -> Result<Json<CarPage>, ApiError> {
    crate::authz::ensure_owner(&principal, &email)?;

    let filter = FilterBuilder::new()
        .eq(car::PROVIDER_EMAIL, email)
        .search(&car::SEARCHABLE, query.search.as_deref())
        .flag(car::AVAILABILITY, query.availability.as_deref(), car::AVAILABLE_SENTINEL)
        .build();

    let page = common::car_page(services.store(), filter, FindOptions::default(), query.page()).await?;
    Ok(Json(page))
}

/// Partial update of a car the caller provides. A car owned by someone else
/// is indistinguishable from a missing one: zero matched.
pub async fn update_car(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<UpdateAck>, ApiError> {
    let set = dto::update_fields(&body)?;
    let Some(id) = common::parse_id(&id) else {
        return Ok(Json(UpdateAck::unmodified(0)));
    };

    let filter = FilterBuilder::new()
        .id(id)
        .eq(car::PROVIDER_EMAIL, principal.email())
        .build();

    let ack = common::apply_update(services.store(), Collection::Cars, filter, set, false).await?;
    Ok(Json(ack))
}

pub async fn delete_car(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<DeleteAck>, ApiError> {
    let Some(id) = common::parse_id(&id) else {
        return Ok(Json(DeleteAck::new(0)));
    };

    let filter = FilterBuilder::new()
        .id(id)
        .eq(car::PROVIDER_EMAIL, principal.email())
        .build();

    let ack = services.store().delete_one(Collection::Cars, filter).await?;
    Ok(Json(ack))
}
