use crate::config::definition::{parse_definition, parse_folder_file, FolderFile, FOLDER_FILE};
use crate::config::project_config::{ProjectConfig, PROJECT_FILE};
use crate::domain::model::{FolderDefinition, NamedDefinition};
use crate::domain::variation::Variation;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// What `grit inspect` reports about a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    pub name: String,
    pub folders: Vec<String>,
    pub variations: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
    folders: Vec<FolderSource>,
}

#[derive(Debug, Clone)]
struct FolderSource {
    dir_name: String,
    folder_file: Option<PathBuf>,
    definitions: Vec<PathBuf>,
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("toml")
}

impl Project {
    /// Reads `grit.toml` and discovers folder directories below `root`.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let config = ProjectConfig::from_file(root.join(PROJECT_FILE))?;
        config.validate()?;

        let output_dir = root.join(&config.output.path);
        let mut folders = Vec::new();
        for entry in fs::read_dir(&root)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let Some(dir_name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
            else {
                continue;
            };
            if dir_name.starts_with('.') || path == output_dir {
                continue;
            }
            if let Some(folder) = Self::scan_folder(&path, dir_name)? {
                folders.push(folder);
            }
        }
        folders.sort_by(|a, b| a.dir_name.cmp(&b.dir_name));

        tracing::debug!(
            "Opened project '{}' with {} folders",
            config.project.name,
            folders.len()
        );
        Ok(Self {
            root,
            config,
            folders,
        })
    }

    fn scan_folder(path: &Path, dir_name: String) -> Result<Option<FolderSource>> {
        let mut folder_file = None;
        let mut definitions = Vec::new();
        for entry in fs::read_dir(path)? {
            let file = entry?.path();
            if !file.is_file() || !is_toml(&file) {
                continue;
            }
            if file.file_name().and_then(|n| n.to_str()) == Some(FOLDER_FILE) {
                folder_file = Some(file);
            } else {
                definitions.push(file);
            }
        }
        if folder_file.is_none() && definitions.is_empty() {
            return Ok(None);
        }
        definitions.sort();
        Ok(Some(FolderSource {
            dir_name,
            folder_file,
            definitions,
        }))
    }

    pub fn name(&self) -> &str {
        &self.config.project.name
    }

    pub fn inspect(&self) -> ProjectInfo {
        ProjectInfo {
            name: self.config.project.name.clone(),
            folders: self.folders.iter().map(|f| f.dir_name.clone()).collect(),
            variations: self
                .config
                .variations()
                .into_iter()
                .map(|v| v.name)
                .collect(),
        }
    }

    pub fn variation(&self, name: &str) -> Result<Variation> {
        self.config.variation(name)
    }

    /// Output directory, relative paths resolved against the project root.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.config.output.path)
    }

    /// Parses every folder with the variation's variables substituted.
    pub fn load_folders(&self, variation: &Variation) -> Result<Vec<FolderDefinition>> {
        let vars = variation.substitutions();
        let mut loaded = Vec::with_capacity(self.folders.len());

        for source in &self.folders {
            let folder = match &source.folder_file {
                Some(path) => parse_folder_file(
                    &fs::read_to_string(path)?,
                    &vars,
                    &path.display().to_string(),
                )?,
                None => FolderFile::default(),
            }
            .into_folder(&source.dir_name);

            let mut files = Vec::with_capacity(source.definitions.len());
            for path in &source.definitions {
                let display = path.display().to_string();
                let definition = parse_definition(&fs::read_to_string(path)?, &vars, &display)?;
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_string();
                files.push(NamedDefinition {
                    name,
                    source: display,
                    definition,
                });
            }

            loaded.push(FolderDefinition {
                dir_name: source.dir_name.clone(),
                folder,
                files,
            });
        }

        Ok(loaded)
    }
}
