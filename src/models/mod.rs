// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod learn_status;
pub mod user;

pub use learn_status::LearnStatusRecord;
pub use user::User;
