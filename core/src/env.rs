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

//! Utilities to deal with environment variables.

use crate::model::Money;
use std::env;
use std::time::Duration;

/// Result type for environment errors.
type Result<T> = std::result::Result<T, String>;

/// Wrapper around an environment variable's value to support conversions to other types.
pub struct Value(String);

impl TryFrom<Value> for String {
    type Error = String;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        Ok(value.0)
    }
}

/// Generates a `TryFrom<Value>` for a type that can be parsed by `FromStr`.
macro_rules! tryfrom_value_for_fromstr [
    ( $t:ty ) => {
        impl TryFrom<Value> for $t {
            type Error = String;

            fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
                value.0.parse::<$t>().map_err(|e| format!("Invalid {}: {}", stringify!($t), e))
            }
        }
    }
];

tryfrom_value_for_fromstr!(u16);
tryfrom_value_for_fromstr!(u32);
tryfrom_value_for_fromstr!(u64);
tryfrom_value_for_fromstr!(usize);
tryfrom_value_for_fromstr!(Money);

impl TryFrom<Value> for Duration {
    type Error = String;

    /// Parses a duration expressed as a number followed by a unit: `s`, `m`, `h` or `d`.
    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        let s = value.0.trim();
        let (number, multiplier) = match s.char_indices().last() {
            Some((i, 's')) => (&s[..i], 1),
            Some((i, 'm')) => (&s[..i], 60),
            Some((i, 'h')) => (&s[..i], 60 * 60),
            Some((i, 'd')) => (&s[..i], 24 * 60 * 60),
            _ => return Err(format!("Invalid Duration '{}': missing unit suffix", s)),
        };
        match number.parse::<u64>() {
            Ok(n) => match n.checked_mul(multiplier) {
                Some(secs) => Ok(Duration::from_secs(secs)),
                None => Err(format!("Invalid Duration '{}': too large", s)),
            },
            Err(e) => Err(format!("Invalid Duration '{}': {}", s, e)),
        }
    }
}

/// Gets the raw value of the environment variable `name`, returning `None` if it is not set.
fn get_raw_var(name: &str) -> Result<Option<String>> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(format!("Invalid value in environment variable {}", name))
        }
    }
}

/// Converts the raw `value` of the variable `name` into the desired type `T`.
fn convert<T: TryFrom<Value, Error = String>>(name: &str, value: String) -> Result<T> {
    Value(value)
        .try_into()
        .map_err(|e| format!("Invalid type in environment variable {}: {}", name, e))
}

/// Gets a required environment variable whose name is `<prefix>_<suffix>` with a conversion to
/// a target type `T`.
pub fn get_required_var<T: TryFrom<Value, Error = String>>(
    prefix: &str,
    suffix: &str,
) -> Result<T> {
    let name = format!("{}_{}", prefix, suffix);
    match get_raw_var(&name)? {
        Some(value) => convert(&name, value),
        None => Err(format!("Required environment variable {} not present", name)),
    }
}

/// Gets an optional environment variable whose name is `<prefix>_<suffix>` with a conversion to
/// a target type `T`.
pub fn get_optional_var<T: TryFrom<Value, Error = String>>(
    prefix: &str,
    suffix: &str,
) -> Result<Option<T>> {
    let name = format!("{}_{}", prefix, suffix);
    match get_raw_var(&name)? {
        Some(value) => convert(&name, value).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    #[test]
    fn test_value_to_string() {
        assert_eq!("foo bar", &TryInto::<String>::try_into(Value("foo bar".to_owned())).unwrap());
    }

    #[test]
    fn test_value_to_fromstr() {
        assert_eq!(1234u16, TryInto::<u16>::try_into(Value("1234".to_owned())).unwrap());

        let err = TryInto::<u16>::try_into(Value("-1".to_owned())).unwrap_err();
        assert!(err.starts_with("Invalid u16:"));
    }

    #[test]
    fn test_value_to_money() {
        assert_eq!(
            Money::from_cents(250).unwrap(),
            TryInto::<Money>::try_into(Value("2.50".to_owned())).unwrap()
        );

        let err = TryInto::<Money>::try_into(Value("-3".to_owned())).unwrap_err();
        assert!(err.starts_with("Invalid Money:"));
    }

    #[test]
    fn test_value_to_duration() {
        for (exp, raw) in [
            (Duration::from_secs(30), "30s"),
            (Duration::from_secs(10 * 60), "10m"),
            (Duration::from_secs(24 * 3600), "24h"),
            (Duration::from_secs(2 * 86400), "2d"),
            (Duration::ZERO, "0s"),
        ] {
            assert_eq!(exp, TryInto::<Duration>::try_into(Value(raw.to_owned())).unwrap());
        }

        for (exp_error, raw) in [
            ("missing unit suffix", "30"),
            ("missing unit suffix", ""),
            ("invalid digit", "xm"),
            ("cannot parse integer from empty string", "h"),
            ("too large", "18446744073709551615d"),
        ] {
            let err = TryInto::<Duration>::try_into(Value(raw.to_owned())).unwrap_err();
            assert!(err.contains(exp_error), "'{}' does not contain '{}'", err, exp_error);
        }
    }

    #[test]
    fn test_get_required_var_ok() {
        temp_env::with_var("PREFIX_PRESENT", Some("1234"), || {
            assert_eq!("1234", &get_required_var::<String>("PREFIX", "PRESENT").unwrap());
        });
    }

    #[test]
    fn test_get_required_var_missing() {
        temp_env::with_var_unset("PREFIX_MISSING", || {
            assert_eq!(
                "Required environment variable PREFIX_MISSING not present",
                &get_required_var::<String>("PREFIX", "MISSING").unwrap_err()
            );
        });
    }

    #[test]
    fn test_get_required_var_not_utf8() {
        temp_env::with_var("PREFIX_INVALID", Some(OsStr::from_bytes(b"\xc3\x28")), || {
            assert_eq!(
                "Invalid value in environment variable PREFIX_INVALID",
                &get_required_var::<String>("PREFIX", "INVALID").unwrap_err()
            );
        });
    }

    #[test]
    fn test_get_required_var_bad_type() {
        temp_env::with_var("PREFIX_BAD", Some("b4d"), || {
            let err = get_required_var::<u16>("PREFIX", "BAD").unwrap_err();
            assert!(
                err.starts_with("Invalid type in environment variable PREFIX_BAD: Invalid u16")
            );
        });
    }

    #[test]
    fn test_get_optional_var_ok() {
        temp_env::with_var("PREFIX_OPTIONAL", Some("15m"), || {
            assert_eq!(
                Some(Duration::from_secs(15 * 60)),
                get_optional_var::<Duration>("PREFIX", "OPTIONAL").unwrap()
            );
        });
    }

    #[test]
    fn test_get_optional_var_missing() {
        temp_env::with_var_unset("PREFIX_OPTIONAL", || {
            assert_eq!(None, get_optional_var::<u32>("PREFIX", "OPTIONAL").unwrap());
        });
    }

    #[test]
    fn test_get_optional_var_bad_type() {
        temp_env::with_var("PREFIX_OPTIONAL", Some("15 minutes"), || {
            let err = get_optional_var::<Duration>("PREFIX", "OPTIONAL").unwrap_err();
            assert!(err.starts_with("Invalid type in environment variable PREFIX_OPTIONAL"));
        });
    }
}
