//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                 GET /wms?SERVICE=WMS&REQUEST=...                │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │  upstream   │  │        routes           │  │
//! │  │ (requests)  │  │ (renderer)  │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;
pub mod upstream;

pub use handlers::{health_handler, wms_handler, AppState, ErrorResponse, HealthResponse};
pub use routes::{create_router, RouterConfig};
pub use upstream::{HttpMapRenderer, MapRenderer, RenderedMap};
