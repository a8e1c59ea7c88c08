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

//! Shared building blocks for the customers service.
//!
//! The service is organized in the following layers, most of which have a counterpart in this
//! crate that provides their result and error types:
//!
//! 1.  `model`: High-level data types that represent concepts in the domain of the application.
//!     There should be no logic in here other than that needed to keep the types well-formed.
//!
//! 1.  `db`: The persistence layer.  Services provide free functions that take an `Executor` and
//!     issue backend-specific queries against it.
//!
//! 1.  `driver`: The business logic layer.  Services provide their own `Driver` type that
//!     validates requests and coordinates access to the persistence layer.
//!
//! 1.  `rest`: The HTTP layer.  Services provide an `axum::Router` backed by a `Driver`.
//!
//! 1.  `main`: The launcher, which gathers configuration from environment variables and calls
//!     the service's `serve` function.
//!
//! Every layer has its own result and error types, such as `DbResult` and `DbError`.  Errors float
//! to the top of the app via the `?` operator and are translated to HTTP status codes once they
//! leave the REST layer.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

pub mod db;
pub mod driver;
pub mod env;
pub mod rest;
