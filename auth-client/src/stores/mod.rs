//! Production collaborator implementations.

pub mod memory_cookies;
pub mod reqwest_transport;

pub use memory_cookies::MemoryCookieJar;
pub use reqwest_transport::ReqwestTransport;
