//! HTTP surface: routes, static files, health

pub mod routes;

pub use routes::build_router;
