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

//! Entry point to the rideshare service.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use rideshare_authn::driver::AuthnOptions;
use rideshare_authn::model::Password;
use rideshare_core::db::postgres::{PostgresDb, PostgresOptions};
use rideshare_core::db::Db;
use rideshare_core::env::get_optional_var;
use rideshare_core::model::EmailAddress;
use rideshare_rides::driver::RidesOptions;
use rideshare_rides::{serve, BootstrapAdmin};
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Reads the credentials of the initial admin account, if configured.
fn admin_from_env(prefix: &str) -> Result<Option<BootstrapAdmin>, String> {
    let email = get_optional_var::<String>(prefix, "ADMIN_EMAIL")?;
    let password = get_optional_var::<String>(prefix, "ADMIN_PASSWORD")?;
    match (email, password) {
        (Some(email), Some(password)) => Ok(Some(BootstrapAdmin {
            email: EmailAddress::new(email).map_err(|e| e.to_string())?,
            password: Password::new(password).map_err(|e| e.to_string())?,
        })),
        (None, None) => Ok(None),
        _ => Err(format!("{0}_ADMIN_EMAIL and {0}_ADMIN_PASSWORD must be set together", prefix)),
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let port = get_optional_var::<u16>("RIDESHARE", "PORT")
        .expect("Invalid configuration")
        .unwrap_or(3000);
    let addr = (Ipv4Addr::UNSPECIFIED, port);

    let db_opts = PostgresOptions::from_env("PGSQL_PROD").unwrap();
    let db = Arc::new(PostgresDb::connect(db_opts));
    {
        let mut ex = db.ex().await.unwrap();
        rideshare_authn::db::init_schema(&mut ex).await.unwrap();
        rideshare_rides::db::init_schema(&mut ex).await.unwrap();
    }

    let authn_opts = AuthnOptions::from_env("AUTHN").unwrap();
    let rides_opts = RidesOptions::from_env("RIDES").unwrap();
    let admin = admin_from_env("RIDESHARE").unwrap();

    serve(addr, db, authn_opts, rides_opts, admin).await.unwrap()
}
