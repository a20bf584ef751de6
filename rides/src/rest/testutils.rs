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

//! Test utilities for the REST API.

use crate::driver::testutils::TestContext as DriverTestContext;
use crate::rest::app;
use axum::Router;
use rideshare_authn::model::Account;

/// State of a running REST test.
pub(crate) struct TestContext {
    /// The driver-level context, which gives access to the database, the clock and the accounts.
    inner: DriverTestContext,

    /// The router serving the APIs under test.
    app: Router,
}

impl TestContext {
    /// Sets up a router backed by an in-memory database.
    pub(crate) async fn setup() -> Self {
        let inner = DriverTestContext::setup().await;
        let app = app(inner.authn().driver(), inner.driver());
        Self { inner, app }
    }

    /// Sets up a router along with a token for an arbitrary customer, for tests that only need
    /// to get past authentication.
    pub(crate) async fn setup_with_token() -> (Router, String) {
        let context = Self::setup().await;
        let customer = context.inner.authn().create_customer("any@example.com").await;
        let token = context.token(&customer);
        (context.into_app(), token)
    }

    /// Gets access to the driver-level context.
    pub(crate) fn inner(&self) -> &DriverTestContext {
        &self.inner
    }

    /// Gets a clone of the app router.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and transforms it into the app router.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    /// Issues an access token for `account`.
    pub(crate) fn token(&self, account: &Account) -> String {
        self.inner.authn().access_token(account).as_str().to_owned()
    }
}
