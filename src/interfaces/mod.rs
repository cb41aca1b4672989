#[cfg(test)]
pub mod mock_server;
pub mod notifications;
