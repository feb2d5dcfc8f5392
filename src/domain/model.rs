use crate::config::definition::DefinitionFile;
use crate::domain::alert::AlertFileBasedProvisioning;
use crate::domain::dashboard::Dashboard;
use crate::domain::folder::Folder;
use crate::domain::variation::Variation;

/// One parsed definition file.
#[derive(Debug, Clone)]
pub struct NamedDefinition {
    /// File stem, used as the key of explicit alert provisioning files.
    pub name: String,
    pub source: String,
    pub definition: DefinitionFile,
}

/// A project directory with its parsed definitions.
#[derive(Debug, Clone)]
pub struct FolderDefinition {
    pub dir_name: String,
    pub folder: Folder,
    pub files: Vec<NamedDefinition>,
}

#[derive(Debug, Clone)]
pub struct RenderedDashboard {
    pub folder_dir: String,
    pub folder: Folder,
    pub dashboard: Dashboard,
}

#[derive(Debug, Clone)]
pub struct RenderedAlerts {
    pub uid: String,
    pub folder: Folder,
    pub provisioning: AlertFileBasedProvisioning,
}

#[derive(Debug, Clone)]
pub struct RenderResult {
    pub variation: Variation,
    pub dashboards: Vec<RenderedDashboard>,
    pub alerts: Vec<RenderedAlerts>,
}

impl RenderResult {
    pub fn rule_count(&self) -> usize {
        self.alerts.iter().map(|a| a.provisioning.rule_count()).sum()
    }
}
