pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod routes;
pub mod services;
pub mod state;

pub use router::build_router;
