pub mod ai;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod models;
pub mod quota;
pub mod routes;
pub mod schema;
pub mod state;
