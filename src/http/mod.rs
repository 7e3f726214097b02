//! HTTP surface: router, CORS and status endpoints

pub mod routes;

pub use routes::build_router;
