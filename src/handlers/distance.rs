use axum::{extract::State, Json};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};

use crate::delivery::geo::GeoPoint;
use crate::delivery::resolver::{resolve_distance, PickupDescriptor, Provenance, TravelMode};
use crate::delivery::session::PriceSession;
use crate::entities::servery;
use crate::error::{AppError, AppResult};
use crate::handlers::known_coordinates;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DistanceRequest {
    pub origin: PickupDescriptor,
    pub destination: GeoPoint,
    #[serde(default)]
    pub mode: TravelMode,
}

#[derive(Debug, Serialize)]
pub struct DistanceResponse {
    pub miles: f64,
    pub provenance: Provenance,
    pub delivery_fee: f64,
    pub mode: TravelMode,
}

/// Quote the distance and delivery fee between a pickup point and a dropoff.
/// Tries the routed provider, falls back to great-circle, and answers 422
/// when neither yields a distance.
pub async fn quote(
    State(state): State<AppState>,
    Json(payload): Json<DistanceRequest>,
) -> AppResult<Json<DistanceResponse>> {
    if let PickupDescriptor::Named(name) = &payload.origin {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("origin is required".to_string()));
        }
    }
    if !payload.destination.is_valid() {
        return Err(AppError::BadRequest(
            "Invalid destination coordinates".to_string(),
        ));
    }

    let serveries = servery::Entity::find().all(&state.db).await?;
    let known = known_coordinates(&serveries);

    let mut session = PriceSession::new();
    session.set_user_location(Some(payload.destination));
    let ticket = session
        .select_pickup(Some(payload.origin.clone()))
        .ok_or_else(|| AppError::Internal("Distance resolution not armed".to_string()))?;

    let outcome = resolve_distance(
        state.distance_provider.as_ref(),
        &known,
        &payload.origin,
        session.user_location(),
        payload.mode,
    )
    .await;
    session.commit(ticket, outcome);

    match (session.current_distance(), session.current_price()) {
        (Some(distance), Some(delivery_fee)) => Ok(Json(DistanceResponse {
            miles: distance.miles,
            provenance: distance.provenance,
            delivery_fee,
            mode: payload.mode,
        })),
        _ => Err(AppError::PriceUnavailable(
            "distance could not be resolved for this pickup point".to_string(),
        )),
    }
}
