// SPDX-License-Identifier: MIT

//! Database layer (MySQL via sqlx).

pub mod mysql;

pub use mysql::Database;
