pub mod app;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

#[cfg(test)]
mod test_support;

pub use crate::app::AppContext;
pub use crate::domain::error::{AppError, Result};
