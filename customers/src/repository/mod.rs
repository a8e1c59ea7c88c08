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

//! Persistence of customer records and assignment of their identifiers.
//!
//! The repository sits between the driver and the database functions in `crate::db`.  Expected
//! outcomes, such as a record not existing, are represented as values; only infrastructure
//! failures are returned as errors.

use crate::db;
use crate::model::{Customer, CustomerId};
use async_trait::async_trait;
use customers_core::db::{Db, DbError, DbResult};
use std::sync::Arc;

#[cfg(test)]
pub(crate) mod testutils;

/// Operations to store and query customers.
#[async_trait]
pub trait CustomerRepository {
    /// Finds all customers whose first or last name contains `term`, ignoring case.
    ///
    /// Returns an empty list when `term` is `None`.  An empty `term` matches all customers.  The
    /// results are sorted by ascending identifier.
    async fn find_by_name_substring(&self, term: Option<&str>) -> DbResult<Vec<Customer>>;

    /// Finds the customer identified by `id`.
    async fn find_by_id(&self, id: CustomerId) -> DbResult<Option<Customer>>;

    /// Stores a new `candidate` customer, assigning it the next free identifier.
    ///
    /// Returns `None` if `candidate` already carries an identifier or if a customer with that
    /// identifier exists.
    async fn create(&self, candidate: Customer) -> DbResult<Option<Customer>>;

    /// Overwrites the fields of the existing customer identified by `customer.id`.
    ///
    /// Returns false if no such customer exists.
    async fn update(&self, customer: &Customer) -> DbResult<bool>;

    /// Deletes the customer identified by `id`.  Returns false if no such customer exists.
    async fn delete(&self, id: CustomerId) -> DbResult<bool>;
}

/// Converts the result of a lookup into an optional value.
fn found<T>(result: DbResult<T>) -> DbResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(DbError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Repository backed by a database.
#[derive(Clone)]
pub struct DbCustomerRepository {
    /// The database that holds the customer records.
    db: Arc<dyn Db + Send + Sync>,
}

impl DbCustomerRepository {
    /// Creates a new repository backed by `db`.  The schema must already be initialized.
    pub fn new(db: Arc<dyn Db + Send + Sync>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CustomerRepository for DbCustomerRepository {
    async fn find_by_name_substring(&self, term: Option<&str>) -> DbResult<Vec<Customer>> {
        let term = match term {
            Some(term) => term.to_lowercase(),
            None => return Ok(vec![]),
        };

        let customers = db::get_customers(&mut self.db.ex().await?).await?;
        Ok(customers.into_iter().filter(|c| c.name_contains(&term)).collect())
    }

    async fn find_by_id(&self, id: CustomerId) -> DbResult<Option<Customer>> {
        found(db::get_customer(&mut self.db.ex().await?, id).await)
    }

    async fn create(&self, candidate: Customer) -> DbResult<Option<Customer>> {
        if !candidate.id().is_unassigned() {
            return Ok(None);
        }

        let mut tx = self.db.begin_write().await?;
        if found(db::get_customer(tx.ex(), *candidate.id()).await)?.is_some() {
            tx.rollback().await?;
            return Ok(None);
        }
        let max_id = db::get_max_customer_id(tx.ex()).await?.unwrap_or(CustomerId::UNASSIGNED);
        let id = match max_id.next() {
            Some(id) => id,
            None => {
                return Err(DbError::BackendError("Ran out of customer identifiers".to_owned()))
            }
        };
        let customer = candidate.with_id(id);
        db::put_customer(tx.ex(), &customer).await?;
        tx.commit().await?;
        Ok(Some(customer))
    }

    async fn update(&self, customer: &Customer) -> DbResult<bool> {
        let mut tx = self.db.begin_write().await?;
        if found(db::get_customer(tx.ex(), *customer.id()).await)?.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }
        db::update_customer(tx.ex(), customer).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn delete(&self, id: CustomerId) -> DbResult<bool> {
        match db::delete_customer(&mut self.db.ex().await?, id).await {
            Ok(()) => Ok(true),
            Err(DbError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
