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

//! Rideshare backend: ride lifecycle, fare estimation and the REST service that ties them to
//! the accounts of customers, drivers and admins.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use log::{info, warn};
use rideshare_authn::driver::{AuthnDriver, AuthnOptions};
use rideshare_authn::model::{AccountName, Password};
use rideshare_core::clocks::SystemClock;
use rideshare_core::db::Db;
use rideshare_core::model::EmailAddress;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

pub mod db;
pub mod driver;
use driver::{RidesDriver, RidesOptions};
pub mod model;
mod rest;
use rest::app;

/// Credentials of the admin account to create on startup if it does not exist yet.
pub struct BootstrapAdmin {
    /// Email address of the admin.
    pub email: EmailAddress,

    /// Initial password of the admin.
    pub password: Password,
}

/// Instantiates all resources to serve the application on `bind_addr`.
///
/// The database schemas must have been initialized already.  Returns once the server has been
/// asked to shut down and the database connections have been closed.
///
/// While it'd be nice to push this responsibility to `main`, doing so would force us to expose many
/// crate-internal types to the public, which in turn would make dead code detection harder.
pub async fn serve(
    bind_addr: impl Into<SocketAddr>,
    db: Arc<dyn Db + Send + Sync>,
    authn_opts: AuthnOptions,
    rides_opts: RidesOptions,
    admin: Option<BootstrapAdmin>,
) -> Result<(), Box<dyn Error>> {
    let clock = Arc::new(SystemClock::default());
    let authn = AuthnDriver::new(db.clone(), clock.clone(), authn_opts);
    let rides = RidesDriver::new(db.clone(), clock, rides_opts);

    if let Some(admin) = admin {
        authn
            .clone()
            .bootstrap_admin(admin.email, admin.password, AccountName::new("Administrator")?)
            .await?;
    }

    let bind_addr = bind_addr.into();
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Listening on {}", bind_addr);
    axum::serve(listener, app(authn, rides))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot wait for the shutdown signal: {}", e);
            }
        })
        .await?;

    info!("Shutting down");
    db.close().await;
    Ok(())
}
