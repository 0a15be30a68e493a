//! Data models for the Voyage API

mod account;

pub use account::*;
