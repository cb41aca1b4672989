pub mod api_client;
pub mod config;
pub mod functions;
pub mod response;
pub mod security;
pub mod storage;
