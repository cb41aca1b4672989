use crate::application::use_cases::resource::{Resource, ResourceStore};
use crate::domain::project::{NewProject, Project, ProjectPatch};
use crate::infrastructure::config::ApiEndpoints;

impl Resource for Project {
    type Input = NewProject;
    type Patch = ProjectPatch;

    const SINGULAR: &'static str = "project";
    const PLURAL: &'static str = "projects";

    fn endpoint(endpoints: &ApiEndpoints) -> &str {
        &endpoints.projects
    }

    fn id(&self) -> &str {
        &self.id
    }
}

pub type ProjectStore = ResourceStore<Project>;

impl ResourceStore<Project> {
    /// Active projects, in list order.
    pub fn active(&self) -> Vec<Project> {
        self.items()
            .into_iter()
            .filter(|project| project.is_active)
            .collect()
    }
}
