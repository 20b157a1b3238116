use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::delivery::geo::{haversine_miles, GeoPoint};

const METERS_PER_MILE: f64 = 1609.344;

/// Where the order is picked up from: a raw coordinate, or a servery name
/// the routed provider accepts directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PickupDescriptor {
    Point(GeoPoint),
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Walking,
    Driving,
    Bicycling,
    Transit,
}

impl Default for TravelMode {
    fn default() -> Self {
        TravelMode::Walking
    }
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Walking => "walking",
            TravelMode::Driving => "driving",
            TravelMode::Bicycling => "bicycling",
            TravelMode::Transit => "transit",
        }
    }
}

/// How a distance was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Routed,
    GreatCircleFallback,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Routed => "routed",
            Provenance::GreatCircleFallback => "great-circle-fallback",
        }
    }
}

/// A non-negative mileage tagged with how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceResult {
    pub miles: f64,
    pub provenance: Provenance,
}

/// Outcome of a resolution attempt. `Unresolved` is a valid terminal state,
/// distinct from a zero-mile result; callers must not price against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Resolved(DistanceResult),
    Unresolved,
}

impl Resolution {
    pub fn miles(&self) -> Option<f64> {
        match self {
            Resolution::Resolved(result) => Some(result.miles),
            Resolution::Unresolved => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RouteLookupError {
    #[error("distance provider API key not configured")]
    MissingApiKey,
    #[error("distance provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("distance provider returned HTTP {0}")]
    BadStatus(u16),
    #[error("distance lookup failed: {0}")]
    Lookup(String),
    #[error("distance provider returned an unusable distance")]
    InvalidDistance,
}

/// External routed-distance lookup (e.g. a directions API). Implementations
/// return the path distance in miles for the requested travel mode.
#[async_trait::async_trait]
pub trait RoutedDistanceProvider: Send + Sync {
    async fn route_miles(
        &self,
        origin: &PickupDescriptor,
        destination: GeoPoint,
        mode: TravelMode,
    ) -> Result<f64, RouteLookupError>;
}

/// Static name -> coordinate mapping used for the great-circle fallback,
/// loaded from the servery table.
#[derive(Debug, Clone, Default)]
pub struct KnownCoordinates {
    coords: HashMap<String, GeoPoint>,
}

impl KnownCoordinates {
    pub fn new(coords: HashMap<String, GeoPoint>) -> Self {
        Self { coords }
    }

    pub fn get(&self, name: &str) -> Option<GeoPoint> {
        self.coords.get(name).copied()
    }
}

/// Resolve the best-effort distance between a pickup point and the user.
///
/// Tries the routed provider first; on any lookup failure falls back to the
/// great-circle distance, which needs a coordinate for the pickup. Every
/// failure mode ends in `Unresolved` rather than an error.
pub async fn resolve_distance(
    provider: &dyn RoutedDistanceProvider,
    known: &KnownCoordinates,
    pickup: &PickupDescriptor,
    user_location: Option<GeoPoint>,
    mode: TravelMode,
) -> Resolution {
    let Some(user_location) = user_location else {
        return Resolution::Unresolved;
    };
    if !user_location.is_valid() {
        return Resolution::Unresolved;
    }

    match provider.route_miles(pickup, user_location, mode).await {
        Ok(miles) if miles.is_finite() && miles >= 0.0 => {
            return Resolution::Resolved(DistanceResult {
                miles,
                provenance: Provenance::Routed,
            });
        }
        Ok(miles) => {
            tracing::warn!(miles, "routed lookup returned unusable distance, falling back");
        }
        Err(err) => {
            tracing::warn!(error = %err, "routed lookup failed, falling back to great-circle");
        }
    }

    let pickup_point = match pickup {
        PickupDescriptor::Point(point) => Some(*point),
        PickupDescriptor::Named(name) => known.get(name),
    };

    match pickup_point {
        Some(point) if point.is_valid() => {
            let miles = haversine_miles(point, user_location);
            if miles.is_nan() {
                return Resolution::Unresolved;
            }
            Resolution::Resolved(DistanceResult {
                miles,
                provenance: Provenance::GreatCircleFallback,
            })
        }
        _ => Resolution::Unresolved,
    }
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    distance: Option<MatrixDistance>,
}

#[derive(Debug, Deserialize)]
struct MatrixDistance {
    value: f64, // meters
}

/// Routed-distance provider backed by the Google Distance Matrix API.
#[derive(Clone)]
pub struct GoogleDistanceMatrix {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl GoogleDistanceMatrix {
    const ENDPOINT: &'static str = "https://maps.googleapis.com/maps/api/distancematrix/json";

    pub fn new(api_key: Option<String>, timeout_secs: u64) -> Self {
        // The timeout bounds every routed lookup; a client without it must
        // not slip through, so fail at startup instead.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to build HTTP client for distance lookups");
        Self { client, api_key }
    }

    fn place_param(place: &PickupDescriptor) -> String {
        match place {
            PickupDescriptor::Point(p) => format!("{},{}", p.lat, p.lng),
            PickupDescriptor::Named(name) => name.clone(),
        }
    }
}

#[async_trait::async_trait]
impl RoutedDistanceProvider for GoogleDistanceMatrix {
    async fn route_miles(
        &self,
        origin: &PickupDescriptor,
        destination: GeoPoint,
        mode: TravelMode,
    ) -> Result<f64, RouteLookupError> {
        let api_key = self.api_key.as_deref().ok_or(RouteLookupError::MissingApiKey)?;

        let origins = Self::place_param(origin);
        let destinations = format!("{},{}", destination.lat, destination.lng);

        let response = self
            .client
            .get(Self::ENDPOINT)
            .query(&[
                ("key", api_key),
                ("origins", origins.as_str()),
                ("destinations", destinations.as_str()),
                ("mode", mode.as_str()),
                ("units", "imperial"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RouteLookupError::BadStatus(response.status().as_u16()));
        }

        let body: MatrixResponse = response.json().await?;
        let element = body
            .rows
            .first()
            .and_then(|row| row.elements.first())
            .ok_or_else(|| RouteLookupError::Lookup("empty matrix response".to_string()))?;

        if element.status != "OK" {
            return Err(RouteLookupError::Lookup(element.status.clone()));
        }

        let meters = element
            .distance
            .as_ref()
            .map(|d| d.value)
            .ok_or(RouteLookupError::InvalidDistance)?;
        if !meters.is_finite() || meters < 0.0 {
            return Err(RouteLookupError::InvalidDistance);
        }

        Ok(meters / METERS_PER_MILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingProvider;

    #[async_trait::async_trait]
    impl RoutedDistanceProvider for FailingProvider {
        async fn route_miles(
            &self,
            _origin: &PickupDescriptor,
            _destination: GeoPoint,
            _mode: TravelMode,
        ) -> Result<f64, RouteLookupError> {
            Err(RouteLookupError::Lookup("NOT_FOUND".to_string()))
        }
    }

    struct FixedProvider(f64);

    #[async_trait::async_trait]
    impl RoutedDistanceProvider for FixedProvider {
        async fn route_miles(
            &self,
            _origin: &PickupDescriptor,
            _destination: GeoPoint,
            _mode: TravelMode,
        ) -> Result<f64, RouteLookupError> {
            Ok(self.0)
        }
    }

    fn campus_serveries() -> KnownCoordinates {
        let mut coords = HashMap::new();
        coords.insert("Baker".to_string(), GeoPoint::new(29.7164, -95.4018));
        coords.insert("North".to_string(), GeoPoint::new(29.7184, -95.4018));
        KnownCoordinates::new(coords)
    }

    #[test]
    fn test_google_provider_builds_with_bounded_timeout() {
        // Construction must succeed with a timeout configured; the timeout
        // is what keeps slow lookups on the fallback path.
        let _ = GoogleDistanceMatrix::new(None, 8);
        let _ = GoogleDistanceMatrix::new(Some("key".to_string()), 5);
    }

    #[tokio::test]
    async fn test_routed_result_when_provider_succeeds() {
        let known = campus_serveries();
        let pickup = PickupDescriptor::Named("Baker".to_string());
        let user = Some(GeoPoint::new(29.72, -95.40));

        let outcome = resolve_distance(
            &FixedProvider(0.45),
            &known,
            &pickup,
            user,
            TravelMode::Walking,
        )
        .await;

        assert_eq!(
            outcome,
            Resolution::Resolved(DistanceResult {
                miles: 0.45,
                provenance: Provenance::Routed,
            })
        );
    }

    #[tokio::test]
    async fn test_fallback_matches_haversine_when_provider_fails() {
        let known = campus_serveries();
        let pickup = PickupDescriptor::Named("Baker".to_string());
        let user_point = GeoPoint::new(29.72, -95.40);

        let outcome = resolve_distance(
            &FailingProvider,
            &known,
            &pickup,
            Some(user_point),
            TravelMode::Walking,
        )
        .await;

        let expected = haversine_miles(GeoPoint::new(29.7164, -95.4018), user_point);
        match outcome {
            Resolution::Resolved(result) => {
                assert_eq!(result.provenance, Provenance::GreatCircleFallback);
                assert!((result.miles - expected).abs() < 1e-12);
            }
            Resolution::Unresolved => panic!("expected fallback, got unresolved"),
        }
    }

    #[tokio::test]
    async fn test_unresolved_for_unknown_pickup_and_failing_provider() {
        let known = campus_serveries();
        let pickup = PickupDescriptor::Named("Sammy's".to_string());
        let user = Some(GeoPoint::new(29.72, -95.40));

        let outcome =
            resolve_distance(&FailingProvider, &known, &pickup, user, TravelMode::Walking).await;

        assert_eq!(outcome, Resolution::Unresolved);
    }

    #[tokio::test]
    async fn test_unresolved_without_user_location() {
        let known = campus_serveries();
        let pickup = PickupDescriptor::Named("Baker".to_string());

        let outcome =
            resolve_distance(&FixedProvider(0.45), &known, &pickup, None, TravelMode::Walking)
                .await;

        assert_eq!(outcome, Resolution::Unresolved);
    }

    #[tokio::test]
    async fn test_negative_routed_distance_falls_back() {
        let known = campus_serveries();
        let pickup = PickupDescriptor::Point(GeoPoint::new(29.7164, -95.4018));
        let user = Some(GeoPoint::new(29.72, -95.40));

        let outcome =
            resolve_distance(&FixedProvider(-1.0), &known, &pickup, user, TravelMode::Walking)
                .await;

        match outcome {
            Resolution::Resolved(result) => {
                assert_eq!(result.provenance, Provenance::GreatCircleFallback)
            }
            Resolution::Unresolved => panic!("expected fallback"),
        }
    }
}
