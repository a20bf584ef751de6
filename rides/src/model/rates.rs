// Rideshare
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! The rate card and the fare estimator.

use crate::model::DistanceKm;
use rideshare_authn::model::AccountId;
use rideshare_core::model::{ModelError, ModelResult, Money};
use time::OffsetDateTime;

/// Prices used to compute fares, as configured at some point in time.
///
/// Rate cards are versioned: every update produces a new card with the next version number and
/// the current card is the one with the highest version.  Version 0 is reserved for the defaults
/// that apply before any admin has ever touched the rates.
#[derive(Clone, Debug, PartialEq)]
pub struct RateCard {
    /// Version of this card.
    pub version: u32,

    /// Fixed amount charged for every ride.
    pub base_fare: Money,

    /// Amount charged per kilometer.
    pub per_km: Money,

    /// When this card was created.
    pub updated: OffsetDateTime,

    /// The admin who created this card, or none for the defaults.
    pub updated_by: Option<AccountId>,
}

impl RateCard {
    /// Computes the fare of a ride of length `distance` under this card.
    ///
    /// The result is `base_fare + per_km * distance` rounded half away from zero to cents.
    pub fn estimate(&self, distance: DistanceKm) -> ModelResult<Money> {
        let variable = match self.per_km.as_decimal().checked_mul(distance.as_decimal()) {
            Some(variable) => variable,
            None => return Err(ModelError("Fare is too large".to_owned())),
        };
        self.base_fare.checked_add(Money::from_decimal(variable)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn card(base_cents: i64, per_km_cents: i64) -> RateCard {
        RateCard {
            version: 0,
            base_fare: Money::from_cents(base_cents).unwrap(),
            per_km: Money::from_cents(per_km_cents).unwrap(),
            updated: datetime!(2023-06-01 00:00:00 UTC),
            updated_by: None,
        }
    }

    fn estimate_cents(card: &RateCard, km: f64) -> i64 {
        card.estimate(DistanceKm::new(km).unwrap()).unwrap().cents()
    }

    #[test]
    fn test_estimate_reference_scenario() {
        let fare = card(500, 250).estimate(DistanceKm::new(5.0).unwrap()).unwrap();
        assert_eq!("17.50", fare.to_string());
    }

    #[test]
    fn test_estimate_rounds_half_away_from_zero() {
        // 0.5 cents rounds up.
        assert_eq!(1, estimate_cents(&card(0, 1), 0.5));
        assert_eq!(505, estimate_cents(&card(500, 3), 1.5));
        assert_eq!(504, estimate_cents(&card(500, 3), 1.4));
        // 1.99 * 3.3333 = 6.633267 units.
        assert_eq!(663, estimate_cents(&card(0, 199), 3.3333));
    }

    #[test]
    fn test_estimate_rounds_half_cents_that_floats_cannot_represent() {
        // 1.00 * 1.005 = 1.005 units, which is below 1.005 if computed in binary.
        assert_eq!(101, estimate_cents(&card(0, 100), 1.005));
        assert_eq!(601, estimate_cents(&card(500, 100), 1.005));
        // 2.50 * 0.403 = 1.0075 units.
        assert_eq!(101, estimate_cents(&card(0, 250), 0.403));
        // 0.10 * 0.125 = 0.0125 units.
        assert_eq!(1, estimate_cents(&card(0, 10), 0.125));
    }

    #[test]
    fn test_estimate_too_large() {
        let card = card(i64::MAX - 1, 100);
        assert!(card.estimate(DistanceKm::new(1.0).unwrap()).is_err());
    }

    #[test]
    fn test_estimate_only_base_fare() {
        assert_eq!(500, estimate_cents(&card(500, 0), 999.0));
    }

    #[test]
    fn test_estimate_is_monotonic_in_distance() {
        let card = card(300, 175);
        let mut previous = 0;
        for km in [0.1, 1.0, 2.5, 10.0, 100.0, 1000.0] {
            let cents = estimate_cents(&card, km);
            assert!(cents > previous);
            previous = cents;
        }
    }
}
