//! Porter - HTTP/1.1 message engine
//!
//! Message codec, status catalog, static resource policy, content cache
//! and router, plus a small server and client built on them.

pub mod cache;
pub mod client;
pub mod config;
pub mod http;
pub mod resources;
pub mod router;
pub mod server;
