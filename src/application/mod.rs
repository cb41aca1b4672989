pub mod use_cases;

pub use use_cases::ai::AiAssistant;
pub use use_cases::auth::AuthStore;
pub use use_cases::dashboard::DashboardUseCase;
pub use use_cases::projects::ProjectStore;
pub use use_cases::resource::{Resource, ResourceStore, Scope};
pub use use_cases::test_cases::{filter_test_cases, TestCaseFilter, TestCaseStore};
pub use use_cases::testing::TestRunner;
