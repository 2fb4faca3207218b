//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → proxy.rs (token gate → target → headers → dispatch → relay)
//!         → upstream.rs (outbound request under deadline)
//!         → relay.rs + encoding.rs (size cap, gunzip)
//!     → response.rs (commit once, or error envelope)
//!     → Send to client
//! ```

pub mod encoding;
pub mod proxy;
pub mod relay;
pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use proxy::ProxyPipeline;
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
