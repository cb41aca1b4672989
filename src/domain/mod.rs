pub mod ai;
pub mod dashboard;
pub mod error;
pub mod execution;
pub mod notification;
pub mod project;
pub mod session;
pub mod test_case;
pub mod validation;
