pub mod auth_handlers;
pub mod boa_handlers;
