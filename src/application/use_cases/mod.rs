pub mod ai;
pub mod api_test_input;
pub mod auth;
pub mod dashboard;
pub mod lifecycle;
pub mod projects;
pub mod resource;
pub mod test_cases;
pub mod testing;
