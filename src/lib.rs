pub mod configuration;
pub mod connectors;
pub mod helpers;
pub mod models;
pub mod policy;
pub mod routes;
pub mod services;
pub mod startup;
pub mod telemetry;
