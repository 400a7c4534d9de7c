pub mod app;
pub mod config;
pub mod engine;
pub mod event;
pub mod generator;
pub mod question;
pub mod session;
pub mod store;
