//! Request and Response models for the admin API

pub mod requests;
pub mod responses;

pub use requests::{validate_key, SetRequest};
pub use responses::{
    CounterResponse, DeleteResponse, ErrorResponse, GetResponse, HealthResponse,
    InvalidateResponse, SetResponse, StatsResponse,
};
