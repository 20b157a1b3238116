//! Distance-tiered delivery pricing.
//!
//! Orders within the base radius pay a flat fare. Past that, the fee grows
//! by a fixed amount per tenth of a mile, measured from 0.2 miles. The 0.3
//! base threshold and the 0.2 increment basis are deliberately different
//! constants; do not "fix" one to match the other.

/// Flat fare for deliveries up to [`BASE_FARE_MAX_MILES`].
const BASE_FARE: f64 = 3.00;
const BASE_FARE_MAX_MILES: f64 = 0.3;

/// Increments are counted from this distance, in steps of [`STEP_MILES`].
const STEP_START_MILES: f64 = 0.2;
const STEP_MILES: f64 = 0.1;
const STEP_PRICE: f64 = 0.70;
const STEP_BASE_PRICE: f64 = 2.00;

/// Compute the delivery fee for a resolved distance.
///
/// `None` (distance unresolved) and NaN both yield `None`: no fee can be
/// quoted and order submission must stay blocked.
pub fn delivery_price(miles: Option<f64>) -> Option<f64> {
    let miles = miles?;
    if miles.is_nan() {
        return None;
    }
    if miles <= BASE_FARE_MAX_MILES {
        return Some(BASE_FARE);
    }

    let over = miles - STEP_START_MILES;
    let increments = stable_ceil(over / STEP_MILES);
    Some(round_cents(STEP_BASE_PRICE + increments * STEP_PRICE))
}

/// Ceiling that is immune to binary-representation noise just above an
/// integer (0.4 - 0.2 divided by 0.1 lands at 2.0000000000000004, which must
/// count as 2 steps, not 3). The quotient is snapped to nine decimals first.
fn stable_ceil(x: f64) -> f64 {
    ((x * 1e9).round() / 1e9).ceil()
}

/// Round to cents, half away from zero.
pub fn round_cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_fare() {
        assert_eq!(delivery_price(Some(0.0)), Some(3.00));
        assert_eq!(delivery_price(Some(0.15)), Some(3.00));
        assert_eq!(delivery_price(Some(0.3)), Some(3.00));
    }

    #[test]
    fn test_null_and_nan_propagate() {
        assert_eq!(delivery_price(None), None);
        assert_eq!(delivery_price(Some(f64::NAN)), None);
    }

    #[test]
    fn test_first_increment_past_threshold() {
        // over = 0.11, ceil(1.1) = 2 increments
        assert_eq!(delivery_price(Some(0.31)), Some(3.40));
    }

    #[test]
    fn test_one_mile() {
        // over = 0.8, 8 increments
        assert_eq!(delivery_price(Some(1.0)), Some(7.60));
    }

    #[test]
    fn test_exact_step_boundaries_do_not_overcount() {
        // 0.4 - 0.2 = 0.2000...0001 in f64; must be 2 steps, not 3
        assert_eq!(delivery_price(Some(0.4)), Some(3.40));
        assert_eq!(delivery_price(Some(0.5)), Some(4.10));
        assert_eq!(delivery_price(Some(0.7)), Some(5.50));
    }

    #[test]
    fn test_monotone_in_distance() {
        let mut last = 0.0;
        let mut miles = 0.0;
        while miles <= 5.0 {
            let price = delivery_price(Some(miles)).unwrap();
            assert!(
                price >= last,
                "price dropped from {last} to {price} at {miles} miles"
            );
            last = price;
            miles += 0.01;
        }
    }
}
