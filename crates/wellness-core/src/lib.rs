pub mod config;
pub mod models;
pub mod store;
pub mod time;
pub mod validation;
