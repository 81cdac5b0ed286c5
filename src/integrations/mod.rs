//! External service integrations.

pub mod sendgrid_client {
    pub use crate::sendgrid_client::*;
}

pub mod sendgrid_models {
    pub use crate::sendgrid_models::*;
}
