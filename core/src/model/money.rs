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

//! The `Money` data type.

use crate::model::{ModelError, ModelResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest amount we accept from external inputs, in whole currency units.
const MAX_UNITS: i64 = 1_000_000;

/// Converts a float into the exact decimal number it prints as.
///
/// Floats coming from JSON documents are the closest binary approximation of what the client
/// wrote, so `1.005` is really `1.00499999...`.  Going through the shortest representation that
/// round-trips recovers the number the client meant.
pub fn decimal_from_f64(value: f64) -> ModelResult<Decimal> {
    if !value.is_finite() {
        return Err(ModelError(format!("Number must be finite; got {}", value)));
    }
    Decimal::from_str(&value.to_string())
        .map_err(|e| ModelError(format!("Number {} is out of range: {}", value, e)))
}

/// A non-negative amount of money with cent precision.
///
/// Amounts are kept as an integer number of cents so that arithmetic is exact.  On the wire,
/// amounts travel as decimal numbers (`17.5` for 17.50) and are rounded half away from zero to
/// the nearest cent when parsed.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Money(i64);

impl Money {
    /// Creates an amount from a raw number of cents as stored in the database.
    pub fn from_cents(cents: i64) -> ModelResult<Self> {
        if cents < 0 {
            return Err(ModelError(format!("Amount cannot be negative: {} cents", cents)));
        }
        Ok(Self(cents))
    }

    /// Creates an amount from a decimal number of currency units, rounding half away from zero
    /// to the nearest cent.
    pub fn from_decimal(units: Decimal) -> ModelResult<Self> {
        if units.is_sign_negative() && !units.is_zero() {
            return Err(ModelError(format!("Amount cannot be negative: {}", units)));
        }
        let rounded = units.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        match rounded.checked_mul(Decimal::ONE_HUNDRED).and_then(|cents| cents.to_i64()) {
            Some(cents) => Ok(Self(cents)),
            None => Err(ModelError(format!("Amount is too large: {}", units))),
        }
    }

    /// Creates an amount from a number of currency units given by an external input.
    pub fn from_units(units: f64) -> ModelResult<Self> {
        Money::from_external(decimal_from_f64(units)?)
    }

    /// Validates the range of an amount given by an external input and rounds it to cents.
    fn from_external(units: Decimal) -> ModelResult<Self> {
        if units > Decimal::from(MAX_UNITS) {
            return Err(ModelError(format!("Amount is too large: {}", units)));
        }
        Money::from_decimal(units)
    }

    /// Returns the amount as a raw number of cents.
    pub fn cents(self) -> i64 {
        self.0
    }

    /// Returns the amount as an exact decimal number of currency units.
    pub fn as_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Returns the amount as a decimal number of currency units.
    pub fn as_units(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Adds two amounts, failing on overflow.
    pub fn checked_add(self, other: Money) -> ModelResult<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Ok(Money(cents)),
            None => Err(ModelError("Amount overflow".to_owned())),
        }
    }
}

impl fmt::Debug for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Money({})", self)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Money {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Decimal::from_str(s.trim()) {
            Ok(units) => Money::from_external(units),
            Err(e) => Err(ModelError(format!("Invalid amount '{}': {}", s, e))),
        }
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_f64(self.as_units())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let units = f64::deserialize(deserializer)?;
        Money::from_units(units).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{assert_de_tokens, assert_de_tokens_error, assert_ser_tokens, Token};

    #[test]
    fn test_money_from_cents() {
        assert_eq!(1750, Money::from_cents(1750).unwrap().cents());
        assert_eq!(0, Money::from_cents(0).unwrap().cents());
        assert!(Money::from_cents(-1).is_err());
    }

    #[test]
    fn test_money_from_units_rounds_to_cents() {
        assert_eq!(1750, Money::from_units(17.5).unwrap().cents());
        assert_eq!(1001, Money::from_units(10.006).unwrap().cents());
        assert_eq!(33, Money::from_units(0.334).unwrap().cents());
        assert_eq!(0, Money::from_units(0.0).unwrap().cents());
    }

    #[test]
    fn test_money_from_units_rounds_half_cents_as_written() {
        // None of these are exact in binary.
        assert_eq!(101, Money::from_units(1.005).unwrap().cents());
        assert_eq!(116, Money::from_units(1.155).unwrap().cents());
        assert_eq!(1, Money::from_units(0.005).unwrap().cents());
        assert_eq!(0, Money::from_units(0.0049).unwrap().cents());
    }

    #[test]
    fn test_money_from_decimal() {
        assert_eq!(1750, Money::from_decimal(Decimal::new(1750, 2)).unwrap().cents());
        assert_eq!(3, Money::from_decimal(Decimal::new(25, 3)).unwrap().cents());
        assert_eq!(2, Money::from_decimal(Decimal::new(249, 4)).unwrap().cents());
        assert_eq!(
            ModelError("Amount cannot be negative: -0.001".to_owned()),
            Money::from_decimal(Decimal::new(-1, 3)).unwrap_err()
        );
        assert!(Money::from_decimal(Decimal::MAX).is_err());
    }

    #[test]
    fn test_money_from_units_errors() {
        assert!(Money::from_units(-0.01).is_err());
        assert!(Money::from_units(f64::NAN).is_err());
        assert!(Money::from_units(f64::INFINITY).is_err());
        assert!(Money::from_units((MAX_UNITS + 1) as f64).is_err());
    }

    #[test]
    fn test_money_display() {
        assert_eq!("17.50", Money::from_cents(1750).unwrap().to_string());
        assert_eq!("0.05", Money::from_cents(5).unwrap().to_string());
        assert_eq!("123.00", Money::from_cents(12300).unwrap().to_string());
    }

    #[test]
    fn test_money_from_str() {
        assert_eq!(Money::from_cents(250).unwrap(), "2.50".parse::<Money>().unwrap());
        assert_eq!(Money::from_cents(500).unwrap(), " 5 ".parse::<Money>().unwrap());
        assert_eq!(Money::from_cents(101).unwrap(), "1.005".parse::<Money>().unwrap());
        assert!("five".parse::<Money>().unwrap_err().0.contains("Invalid amount 'five'"));
        assert!("-1".parse::<Money>().is_err());
    }

    #[test]
    fn test_money_checked_add() {
        let a = Money::from_cents(1750).unwrap();
        let b = Money::from_cents(250).unwrap();
        assert_eq!(Money::from_cents(2000).unwrap(), a.checked_add(b).unwrap());
        assert!(Money(i64::MAX).checked_add(b).is_err());
    }

    #[test]
    fn test_money_ser_de() {
        let money = Money::from_cents(1750).unwrap();
        assert_ser_tokens(&money, &[Token::F64(17.5)]);
        assert_de_tokens(&money, &[Token::F64(17.5)]);
        assert_de_tokens(&money, &[Token::F64(17.499)]);
        assert_de_tokens(&Money::from_cents(101).unwrap(), &[Token::F64(1.005)]);
        assert_de_tokens_error::<Money>(&[Token::F64(-1.0)], "Amount cannot be negative: -1");
    }
}
