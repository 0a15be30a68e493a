//! API client module for the Voyage backend

pub mod account;
pub mod client;
mod users;

#[cfg(test)]
pub(crate) mod test_server;

pub use account::{register, RegistrationFailure};
pub use client::ApiClient;
pub use users::list_users_if_signed_in;
