//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a JSON value in both tiers
//! - `GET /get/:key` - Read through L1 then L2
//! - `DELETE /del/:key` - Delete a key from both tiers
//! - `GET /exists/:key` - Check for a live key
//! - `GET /keys?pattern=` - List keys matching a glob
//! - `GET /stats` - Cache, rate limiter and device statistics
//! - `GET /ping` - Liveness reply
//! - `GET /health` - Health check endpoint
//! - `POST /devices/query` - Batched device polling

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use middleware::{rate_limit, ANONYMOUS_CLIENT, CLIENT_ID_HEADER};
pub use routes::create_router;
