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

//! Database abstraction in terms of the operations needed by the server.

use crate::model::{Customer, CustomerId};
use customers_core::db::postgres;
use customers_core::db::sqlite;
use customers_core::db::{DbError, DbResult, Executor};
use futures::TryStreamExt;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use time::Date;


/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,
    }
}

impl TryFrom<PgRow> for Customer {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i32 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let first_name: String = row.try_get("first_name").map_err(postgres::map_sqlx_error)?;
        let last_name: String = row.try_get("last_name").map_err(postgres::map_sqlx_error)?;
        let date_of_birth: Date =
            row.try_get("date_of_birth").map_err(postgres::map_sqlx_error)?;

        Ok(Customer::new(CustomerId::new(id), first_name, last_name, date_of_birth))
    }
}

/// Converts an identifier read from SQLite, which always uses 64-bit integers, to a `CustomerId`.
fn sqlite_customer_id(id: i64) -> DbResult<CustomerId> {
    match i32::try_from(id) {
        Ok(id) => Ok(CustomerId::new(id)),
        Err(_) => Err(DbError::DataIntegrityError(format!("Customer id {} out of range", id))),
    }
}

impl TryFrom<SqliteRow> for Customer {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let first_name: String = row.try_get("first_name").map_err(sqlite::map_sqlx_error)?;
        let last_name: String = row.try_get("last_name").map_err(sqlite::map_sqlx_error)?;
        let date_of_birth: Date = row.try_get("date_of_birth").map_err(sqlite::map_sqlx_error)?;

        Ok(Customer::new(sqlite_customer_id(id)?, first_name, last_name, date_of_birth))
    }
}

/// Gets all customers sorted by ascending identifier.
pub async fn get_customers(ex: &mut Executor) -> DbResult<Vec<Customer>> {
    let query_str = "SELECT * FROM customers ORDER BY id";
    let mut customers = vec![];
    match ex {
        Executor::Postgres(ex) => {
            let mut rows = sqlx::query(query_str).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                customers.push(Customer::try_from(row)?);
            }
        }

        Executor::Sqlite(ex) => {
            let mut rows = sqlx::query(query_str).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                customers.push(Customer::try_from(row)?);
            }
        }
    }
    Ok(customers)
}

/// Gets the customer identified by `id`.
pub async fn get_customer(ex: &mut Executor, id: CustomerId) -> DbResult<Customer> {
    match ex {
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM customers WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i32())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            Customer::try_from(row)
        }

        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM customers WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i32())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Customer::try_from(row)
        }
    }
}

/// Gets the largest identifier assigned to any customer, or `None` if there are no customers.
pub async fn get_max_customer_id(ex: &mut Executor) -> DbResult<Option<CustomerId>> {
    let query_str = "SELECT MAX(id) AS max_id FROM customers";
    match ex {
        Executor::Postgres(ex) => {
            let row = sqlx::query(query_str)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            let max_id: Option<i32> = row.try_get("max_id").map_err(postgres::map_sqlx_error)?;
            Ok(max_id.map(CustomerId::new))
        }

        Executor::Sqlite(ex) => {
            let row = sqlx::query(query_str)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            let max_id: Option<i64> = row.try_get("max_id").map_err(sqlite::map_sqlx_error)?;
            max_id.map(sqlite_customer_id).transpose()
        }
    }
}

/// Inserts `customer` as a new record, keeping the identifier it carries.
pub async fn put_customer(ex: &mut Executor, customer: &Customer) -> DbResult<()> {
    let rows_affected = match ex {
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO customers (id, first_name, last_name, date_of_birth)
                VALUES ($1, $2, $3, $4)";
            let done = sqlx::query(query_str)
                .bind(customer.id().as_i32())
                .bind(customer.first_name().as_str())
                .bind(customer.last_name().as_str())
                .bind(*customer.date_of_birth())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO customers (id, first_name, last_name, date_of_birth)
                VALUES (?, ?, ?, ?)";
            let done = sqlx::query(query_str)
                .bind(customer.id().as_i32())
                .bind(customer.first_name().as_str())
                .bind(customer.last_name().as_str())
                .bind(*customer.date_of_birth())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }
    };

    if rows_affected != 1 {
        return Err(DbError::BackendError("Insertion affected more than one row".to_owned()));
    }
    Ok(())
}

/// Overwrites the names and date of birth of the existing customer identified by `customer.id`.
pub async fn update_customer(ex: &mut Executor, customer: &Customer) -> DbResult<()> {
    let rows_affected = match ex {
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE customers
                SET first_name = $1, last_name = $2, date_of_birth = $3
                WHERE id = $4";
            let done = sqlx::query(query_str)
                .bind(customer.first_name().as_str())
                .bind(customer.last_name().as_str())
                .bind(*customer.date_of_birth())
                .bind(customer.id().as_i32())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE customers
                SET first_name = ?, last_name = ?, date_of_birth = ?
                WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(customer.first_name().as_str())
                .bind(customer.last_name().as_str())
                .bind(*customer.date_of_birth())
                .bind(customer.id().as_i32())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Update affected more than one row".to_owned())),
    }
}

/// Deletes the customer identified by `id`.
pub async fn delete_customer(ex: &mut Executor, id: CustomerId) -> DbResult<()> {
    let rows_affected = match ex {
        Executor::Postgres(ex) => {
            let query_str = "DELETE FROM customers WHERE id = $1";
            let done = sqlx::query(query_str)
                .bind(id.as_i32())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        Executor::Sqlite(ex) => {
            let query_str = "DELETE FROM customers WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(id.as_i32())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Deletion affected more than one row".to_owned())),
    }
}
