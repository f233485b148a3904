// SPDX-License-Identifier: MIT

//! Request middleware: authentication, telemetry, security headers.

pub mod auth;
pub mod security;
pub mod telemetry;
