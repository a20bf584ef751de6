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

//! Business logic for accounts and authentication.

use crate::model::{Account, Role};
use derivative::Derivative;
use jsonwebtoken::{DecodingKey, EncodingKey};
use rideshare_core::clocks::Clock;
use rideshare_core::db::Db;
use rideshare_core::driver::{DriverError, DriverResult};
use rideshare_core::env::{get_optional_var, get_required_var};
use std::sync::Arc;
use std::time::Duration;
#[cfg(test)]
use time::OffsetDateTime;

mod accounts;
mod login;
mod register;
#[cfg(any(test, feature = "testutils"))]
pub mod testutils;
mod tokens;

/// Default value for the `TOKEN_MAX_AGE` setting when not specified.
const DEFAULT_TOKEN_MAX_AGE_SECONDS: u64 = 24 * 60 * 60;

/// Default value for the `TOKEN_MAX_SKEW` setting when not specified.
const DEFAULT_TOKEN_MAX_SKEW_SECONDS: u64 = 60 * 60;

/// Configuration options for the authentication driver.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct AuthnOptions {
    /// Secret used to sign and verify access tokens.
    #[derivative(Debug = "ignore")]
    pub jwt_secret: String,

    /// The amount of time we consider access tokens valid for.
    pub token_max_age: Duration,

    /// The amount of time we tolerate in clock skew when validating tokens.  We should never see
    /// this, except if we end up serving requests from different machines and their clocks aren't
    /// properly synchronized.
    pub token_max_skew: Duration,
}

impl AuthnOptions {
    /// Creates a new set of options with the given `jwt_secret` and defaults for everything else.
    pub fn new<S: Into<String>>(jwt_secret: S) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_max_age: Duration::from_secs(DEFAULT_TOKEN_MAX_AGE_SECONDS),
            token_max_skew: Duration::from_secs(DEFAULT_TOKEN_MAX_SKEW_SECONDS),
        }
    }

    /// Creates a new set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_JWT_SECRET`, `<prefix>_TOKEN_MAX_AGE` and
    /// `<prefix>_TOKEN_MAX_SKEW`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let jwt_secret = get_required_var::<String>(prefix, "JWT_SECRET")?;
        if jwt_secret.is_empty() {
            return Err(format!("{}_JWT_SECRET cannot be empty", prefix));
        }
        Ok(Self {
            jwt_secret,
            token_max_age: get_optional_var::<Duration>(prefix, "TOKEN_MAX_AGE")?
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_TOKEN_MAX_AGE_SECONDS)),
            token_max_skew: get_optional_var::<Duration>(prefix, "TOKEN_MAX_SKEW")?
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_TOKEN_MAX_SKEW_SECONDS)),
        })
    }
}

/// Ensures that `whoami` has the `role` required by an operation.
pub fn require_role(whoami: &Account, role: Role) -> DriverResult<()> {
    if whoami.role() != role {
        return Err(DriverError::Forbidden(format!("Only {}s can perform this operation", role)));
    }
    Ok(())
}

/// Runs the CPU-bound `op`, such as a bcrypt computation, on the blocking thread pool.
pub(crate) async fn run_blocking<T, F>(op: F) -> DriverResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(result) => Ok(result),
        Err(e) => Err(DriverError::BackendError(format!("Blocking task failed: {}", e))),
    }
}

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": they start and commit a
/// transaction, so it's incorrect for the caller to use two separate calls.  For this reason,
/// these operations consume the driver in an attempt to minimize the possibility of executing
/// two operations.
#[derive(Clone)]
pub struct AuthnDriver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,

    /// Clock instance to obtain the current time.
    clock: Arc<dyn Clock + Send + Sync>,

    /// Options for the authentication driver.
    opts: Arc<AuthnOptions>,

    /// Key to sign new access tokens with.
    encoding_key: EncodingKey,

    /// Key to verify incoming access tokens with.
    decoding_key: DecodingKey,
}

impl AuthnDriver {
    /// Creates a new driver backed by the given dependencies.
    pub fn new(
        db: Arc<dyn Db + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        opts: AuthnOptions,
    ) -> Self {
        let encoding_key = EncodingKey::from_secret(opts.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(opts.jwt_secret.as_bytes());
        Self { db, clock, opts: Arc::from(opts), encoding_key, decoding_key }
    }

    /// Obtains the current time from the driver.
    #[cfg(test)]
    pub(crate) fn now_utc(&self) -> OffsetDateTime {
        self.clock.now_utc()
    }
}
