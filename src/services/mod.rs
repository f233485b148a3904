// SPDX-License-Identifier: MIT

//! External service clients.

pub mod google_oauth;

pub use google_oauth::GoogleOAuthService;
