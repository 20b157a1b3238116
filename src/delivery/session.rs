//! Session-scoped orchestration of the distance/price pipeline.
//!
//! One `PriceSession` tracks a client's pickup selection, location, and the
//! latest committed distance. Resolutions run asynchronously, so each start
//! hands out a generation token; a completion commits only if its token is
//! still the newest. A superseded lookup finishing late is dropped silently.

use crate::delivery::geo::GeoPoint;
use crate::delivery::pricing::delivery_price;
use crate::delivery::resolver::{DistanceResult, PickupDescriptor, Resolution};

/// Proof of which resolution attempt a completion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveTicket(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No pickup selected, or no user location yet.
    Idle,
    /// A resolution is in flight for the current pickup/location pair.
    Resolving,
    /// The latest resolution completed with a distance.
    Resolved(DistanceResult),
    /// The latest resolution completed with no distance and no viable
    /// fallback. Ordering stays blocked until pickup or location changes.
    Unresolved,
}

#[derive(Debug)]
pub struct PriceSession {
    pickup: Option<PickupDescriptor>,
    user_location: Option<GeoPoint>,
    generation: u64,
    state: SessionState,
}

impl Default for PriceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceSession {
    pub fn new() -> Self {
        Self {
            pickup: None,
            user_location: None,
            generation: 0,
            state: SessionState::Idle,
        }
    }

    pub fn pickup(&self) -> Option<&PickupDescriptor> {
        self.pickup.as_ref()
    }

    pub fn user_location(&self) -> Option<GeoPoint> {
        self.user_location
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Record the user's location. Returns a ticket if this re-arms a
    /// resolution (both pickup and location now known).
    pub fn set_user_location(&mut self, location: Option<GeoPoint>) -> Option<ResolveTicket> {
        self.user_location = location.filter(GeoPoint::is_valid);
        self.rearm()
    }

    /// Select a pickup point. Any in-flight resolution becomes stale.
    pub fn select_pickup(&mut self, pickup: Option<PickupDescriptor>) -> Option<ResolveTicket> {
        self.pickup = pickup;
        self.rearm()
    }

    /// Bump the generation and enter Resolving when a resolution can run,
    /// otherwise drop back to Idle. Either way, older tickets are dead.
    fn rearm(&mut self) -> Option<ResolveTicket> {
        self.generation += 1;
        if self.pickup.is_some() && self.user_location.is_some() {
            self.state = SessionState::Resolving;
            Some(ResolveTicket(self.generation))
        } else {
            self.state = SessionState::Idle;
            None
        }
    }

    /// Commit a completed resolution. Returns false (and changes nothing)
    /// when the ticket has been superseded.
    pub fn commit(&mut self, ticket: ResolveTicket, outcome: Resolution) -> bool {
        if ticket.0 != self.generation {
            tracing::debug!(
                stale = ticket.0,
                current = self.generation,
                "discarding stale distance resolution"
            );
            return false;
        }
        self.state = match outcome {
            Resolution::Resolved(result) => SessionState::Resolved(result),
            Resolution::Unresolved => SessionState::Unresolved,
        };
        true
    }

    pub fn current_distance(&self) -> Option<DistanceResult> {
        match self.state {
            SessionState::Resolved(result) => Some(result),
            _ => None,
        }
    }

    /// Fee derived from the latest committed distance; `None` while the
    /// distance is unknown, which must block order submission.
    pub fn current_price(&self) -> Option<f64> {
        delivery_price(self.current_distance().map(|r| r.miles))
    }

    pub fn is_payable(&self) -> bool {
        self.current_price().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::resolver::Provenance;

    fn resolved(miles: f64) -> Resolution {
        Resolution::Resolved(DistanceResult {
            miles,
            provenance: Provenance::Routed,
        })
    }

    fn named(name: &str) -> Option<PickupDescriptor> {
        Some(PickupDescriptor::Named(name.to_string()))
    }

    #[test]
    fn test_idle_until_both_inputs_present() {
        let mut session = PriceSession::new();
        assert_eq!(session.select_pickup(named("Baker")), None);
        assert_eq!(*session.state(), SessionState::Idle);

        let ticket = session.set_user_location(Some(GeoPoint::new(29.72, -95.40)));
        assert!(ticket.is_some());
        assert_eq!(*session.state(), SessionState::Resolving);
    }

    #[test]
    fn test_commit_sets_distance_and_price() {
        let mut session = PriceSession::new();
        session.set_user_location(Some(GeoPoint::new(29.72, -95.40)));
        let ticket = session.select_pickup(named("Baker")).unwrap();

        assert!(session.commit(ticket, resolved(1.0)));
        assert_eq!(session.current_distance().unwrap().miles, 1.0);
        assert_eq!(session.current_price(), Some(7.60));
        assert!(session.is_payable());
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut session = PriceSession::new();
        session.set_user_location(Some(GeoPoint::new(29.72, -95.40)));

        let ticket_a = session.select_pickup(named("Baker")).unwrap();
        let ticket_b = session.select_pickup(named("North")).unwrap();

        // B completes first, then the superseded A straggles in.
        assert!(session.commit(ticket_b, resolved(0.2)));
        assert!(!session.commit(ticket_a, resolved(5.0)));
        assert_eq!(session.current_distance().unwrap().miles, 0.2);
        assert_eq!(session.current_price(), Some(3.00));
    }

    #[test]
    fn test_stale_completion_discarded_even_when_it_finishes_first() {
        let mut session = PriceSession::new();
        session.set_user_location(Some(GeoPoint::new(29.72, -95.40)));

        let ticket_a = session.select_pickup(named("Baker")).unwrap();
        let ticket_b = session.select_pickup(named("North")).unwrap();

        assert!(!session.commit(ticket_a, resolved(5.0)));
        assert_eq!(*session.state(), SessionState::Resolving);
        assert!(session.commit(ticket_b, resolved(0.2)));
        assert_eq!(session.current_distance().unwrap().miles, 0.2);
    }

    #[test]
    fn test_unresolved_blocks_payment() {
        let mut session = PriceSession::new();
        session.set_user_location(Some(GeoPoint::new(29.72, -95.40)));
        let ticket = session.select_pickup(named("Sammy's")).unwrap();

        assert!(session.commit(ticket, Resolution::Unresolved));
        assert_eq!(*session.state(), SessionState::Unresolved);
        assert_eq!(session.current_price(), None);
        assert!(!session.is_payable());
    }

    #[test]
    fn test_location_change_restarts_resolution() {
        let mut session = PriceSession::new();
        session.set_user_location(Some(GeoPoint::new(29.72, -95.40)));
        let ticket = session.select_pickup(named("Baker")).unwrap();
        session.commit(ticket, resolved(0.5));

        let ticket = session.set_user_location(Some(GeoPoint::new(29.73, -95.41)));
        assert!(ticket.is_some());
        assert_eq!(*session.state(), SessionState::Resolving);
        assert_eq!(session.current_price(), None);
    }

    #[test]
    fn test_invalid_location_treated_as_absent() {
        let mut session = PriceSession::new();
        session.select_pickup(named("Baker"));
        let ticket = session.set_user_location(Some(GeoPoint::new(120.0, 0.0)));
        assert_eq!(ticket, None);
        assert_eq!(*session.state(), SessionState::Idle);
    }
}
