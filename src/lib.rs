pub mod auth;
pub mod configuration;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod startup;
pub mod telemetry;
pub mod validators;
