//! HTTP/1.1 message engine.
//!
//! # Architecture
//!
//! - **`headers`**, **`version`**, **`status`**, **`cookie`**: the parts of a message
//! - **`message`**: the `Body` type and the `HttpMessage` trait shared by requests and responses
//! - **`request`** / **`response`**: message types with fluent builders
//! - **`parser`**: bytes to messages; **`chunked`**: chunked body reassembly
//! - **`transport`**: the read/write seam for code that drives the codec
//! - **`writer`**: finalizes and writes responses
//! - **`connection`**: the server-side request/response state machine
//! - **`mime`**: Content-Type by file extension
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for incoming request data
//!        └──────┬──────┘
//!               │ Request received (malformed → 400, then Closed)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Router, then static resources
//!        └──────┬───────────┘
//!               │ Response ready           Upgrade → handed off
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → Closed
//! ```

pub mod headers;
pub mod version;
pub mod status;
pub mod cookie;
pub mod message;
pub mod request;
pub mod response;
pub mod parser;
pub mod chunked;
pub mod transport;
pub mod writer;
pub mod connection;
pub mod mime;

pub use headers::HeaderMap;
pub use message::{Body, HttpMessage};
pub use parser::ParseError;
pub use request::{Method, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder};
pub use status::Status;
pub use version::Version;
