#![deny(clippy::all)]
#![warn(clippy::nursery)]
#![warn(clippy::pedantic)]
#![warn(clippy::todo)]
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]

#[cfg(test)]
mod tests {
    pub mod common;

    mod jwt_tests;
    mod login_tests;
    mod recovery_tests;
    mod register_tests;
    mod resilience_tests;
}

pub mod cfg {
    mod app_settings;
    mod database_settings;
    mod jwt_settings;
    mod mail_settings;
    mod provisioning_settings;
    mod recovery_settings;
    mod server_settings;

    pub use app_settings::*;
    pub use database_settings::*;
    pub use jwt_settings::*;
    pub use mail_settings::*;
    pub use provisioning_settings::*;
    pub use recovery_settings::*;
    pub use server_settings::*;
}

pub mod core {
    mod context;

    pub use context::*;
}

pub mod auth {
    mod jwt;
    mod password;
    mod reset_secret;

    pub use jwt::*;
    pub use password::*;
    pub use reset_secret::*;
}

pub mod db {
    mod accounts;
    mod error;
    mod invitations;
    mod resilience;
    mod tenants;

    pub use accounts::*;
    pub use error::*;
    pub use invitations::*;
    pub use resilience::*;
    pub use tenants::*;
}

pub mod store {
    mod credentials;

    pub use credentials::*;
}

pub mod services {
    mod background;
    mod error;
    mod notifier;
    mod provisioning;
    mod recovery;
    mod session;
    mod tenant_defaults;

    pub use background::*;
    pub use error::*;
    pub use notifier::*;
    pub use provisioning::*;
    pub use recovery::*;
    pub use session::*;
    pub use tenant_defaults::*;
}

pub mod routes {
    mod body;
    mod envelope;

    pub mod auth;
    pub mod health;

    pub use body::*;
    pub use envelope::*;
}

pub mod app {
    mod cli;
    mod migrations;
    mod router;
    mod server;

    pub use cli::*;
    pub use migrations::*;
    pub use router::*;
    pub use server::*;
}
