pub mod app_context;
pub mod config;
pub mod graphs;
pub mod health;
pub mod http;
pub mod mackerel;
pub mod publish;
