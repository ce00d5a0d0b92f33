pub mod audit;
pub mod auth;
pub mod boa;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod storage;
pub mod templates_structs;
pub mod uploads;
