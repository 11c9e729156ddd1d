pub mod listener;
pub mod service;

pub use service::HttpService;
