pub mod api;
pub mod app;
pub mod config;
pub mod fetch_error;
pub mod fetcher;
pub mod outcomes;
pub mod qm;
pub mod scheduler;
pub mod services;
