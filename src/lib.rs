pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod list;
pub mod session;
