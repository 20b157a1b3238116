pub mod auth;
pub mod customer;
pub mod dasher;
pub mod distance;

use crate::delivery::geo::GeoPoint;
use crate::delivery::resolver::KnownCoordinates;
use crate::entities::servery;

/// Build the fallback coordinate table from the servery rows.
pub(crate) fn known_coordinates(serveries: &[servery::Model]) -> KnownCoordinates {
    KnownCoordinates::new(
        serveries
            .iter()
            .map(|s| (s.name.clone(), GeoPoint::new(s.lat, s.lng)))
            .collect(),
    )
}
