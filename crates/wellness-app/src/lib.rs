pub mod admin;
pub mod app;
pub mod auth;
pub mod chat;
pub mod dashboard;
pub mod protocol;
pub mod routing;
pub mod session;
pub mod speech;

#[cfg(test)]
pub(crate) mod testing;
