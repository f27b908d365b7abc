//! API Module
//!
//! Admin HTTP surface over a shared [`Manager`](crate::manager::Manager).
//! See [`create_router`] for the endpoint list.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
