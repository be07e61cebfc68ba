//! Solutions: the set of projects searched together, plus the shared symbol
//! index service for their metadata references.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::core::config::FinderConfig;
use crate::core::metadata_index::SymbolIndexService;
use crate::core::project::{Project, ProjectId};

pub struct Solution {
    projects: Vec<Arc<dyn Project>>,
    index_service: SymbolIndexService,
}

impl Solution {
    pub fn new(config: FinderConfig) -> Self {
        Self {
            projects: Vec::new(),
            index_service: SymbolIndexService::new(config),
        }
    }

    /// Solution configured from `<workspace_root>/.declaration_finder/config.json`
    pub fn for_workspace(workspace_root: &Path) -> Self {
        Self::new(FinderConfig::load_from_file(&FinderConfig::default_path(
            workspace_root,
        )))
    }

    pub fn with_project(mut self, project: Arc<dyn Project>) -> Self {
        self.add_project(project);
        self
    }

    pub fn add_project(&mut self, project: Arc<dyn Project>) {
        self.projects.push(project);
    }

    /// Projects in the order they were added
    pub fn projects(&self) -> &[Arc<dyn Project>] {
        &self.projects
    }

    pub fn project(&self, id: ProjectId) -> Option<&Arc<dyn Project>> {
        self.projects.iter().find(|p| p.id() == id)
    }

    pub fn index_service(&self) -> &SymbolIndexService {
        &self.index_service
    }

    pub fn config(&self) -> &FinderConfig {
        self.index_service.config()
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new(FinderConfig::default())
    }
}

impl fmt::Debug for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solution")
            .field("projects", &self.projects.iter().map(|p| p.id()).collect::<Vec<_>>())
            .field("config", self.config())
            .finish()
    }
}
