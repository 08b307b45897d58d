// TUI widget modules, one per screen area.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod confirm;
pub mod form_panel;
pub mod help_bar;
pub mod nav;
pub mod patient;
pub mod status_bar;
