//! HTTP middleware for the checkout service.

pub mod rate_limit;

pub use rate_limit::{api_rate_limiter, checkout_rate_limiter};
