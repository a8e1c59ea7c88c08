// III-IV
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

use crate::db;
use crate::driver::Driver;
use crate::model::{Customer, CustomerId};
use crate::repository::DbCustomerRepository;
use crate::rest::app;
use axum::Router;
use customers_core::db::Db;
use std::sync::Arc;
use std::time::Duration;
use time::macros::date;

/// State of a running test.
pub(crate) struct TestContext {
    /// The database backing the app, exposed to let tests prepare and inspect its state.
    db: Arc<dyn Db + Send + Sync>,

    /// The app under test.
    app: Router,
}

impl TestContext {
    /// Initializes the app using an in-memory SQLite database.
    pub(crate) async fn setup() -> Self {
        let db: Arc<dyn Db + Send + Sync> =
            Arc::new(customers_core::db::sqlite::testutils::setup().await);
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let repo = Arc::new(DbCustomerRepository::new(db.clone()));
        let app = app(Driver::new(repo), Duration::from_secs(30));
        Self { db, app }
    }

    /// Gets a copy of the app router.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and returns the app router.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    /// Stores the seven sample customers, with identifiers 1 to 7, directly in the database.
    pub(crate) async fn seed(&self) {
        let samples = [
            ("Alan", "Smith", date!(2000 - 01 - 01)),
            ("Anne", "Green", date!(1980 - 01 - 01)),
            ("Bob", "Black", date!(1956 - 01 - 01)),
            ("William", "Hargrave", date!(1970 - 01 - 01)),
            ("Selina", "Kyle", date!(2005 - 01 - 01)),
            ("Alice", "Hill", date!(1978 - 01 - 01)),
            ("Heath", "Smith", date!(1986 - 01 - 01)),
        ];
        for (i, (first_name, last_name, date_of_birth)) in samples.into_iter().enumerate() {
            let customer = Customer::new(
                CustomerId::new(i as i32 + 1),
                first_name.to_owned(),
                last_name.to_owned(),
                date_of_birth,
            );
            db::put_customer(&mut self.db.ex().await.unwrap(), &customer).await.unwrap();
        }
    }

    /// Gets the customer with identifier `id` straight from the database, if it exists.
    pub(crate) async fn get_customer(&self, id: i32) -> Option<Customer> {
        match db::get_customer(&mut self.db.ex().await.unwrap(), CustomerId::new(id)).await {
            Ok(customer) => Some(customer),
            Err(customers_core::db::DbError::NotFound) => None,
            Err(e) => panic!("Failed to get customer {}: {}", id, e),
        }
    }

    /// Gets all customers straight from the database.
    pub(crate) async fn all_customers(&self) -> Vec<Customer> {
        db::get_customers(&mut self.db.ex().await.unwrap()).await.unwrap()
    }
}
