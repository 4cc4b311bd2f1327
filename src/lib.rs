//! Library crate for vpc-inventory exposing reusable modules.
pub mod cloud;
pub mod credentials;
pub mod error;
pub mod region;
pub mod report;
pub mod scanner;
pub mod server;
pub mod store;
pub mod types;
