use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::utils::FileUtils;

use super::error::ConfigError;

#[derive(Serialize, Deserialize, Clone)]
pub struct ProjectConfiguration {
    pub project_name: String,
    pub author: Option<String>,
    pub version: Option<String>,

    //Root folder is simply the location of the project file.
    #[serde(skip_serializing, skip_deserializing)]
    pub location: Option<PathBuf>,

    pub data_folder: Option<PathBuf>,
}

impl ProjectConfiguration {
    pub fn new(path: Option<PathBuf>) -> Self {
        ProjectConfiguration {
            project_name: "MyProject".to_string(),
            author: None,
            version: None,
            location: path,
            data_folder: None,
        }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> ProjectConfiguration {
        self.project_name = name.into();
        self
    }

    pub fn with_author<S: Into<String>>(mut self, author: S) -> ProjectConfiguration {
        self.author = Some(author.into());
        self
    }

    pub fn with_data(mut self, path: PathBuf) -> ProjectConfiguration {
        self.data_folder = Some(path);
        self
    }
}

#[derive(Serialize, Deserialize)]
pub struct EngineConfiguration {
    pub project_file_extension: String,
    pub fixed_timestep_ms: f64,
    pub max_frame_ms: f64,
}

impl Default for EngineConfiguration {
    fn default() -> Self {
        EngineConfiguration {
            project_file_extension: "ovt".to_string(),
            fixed_timestep_ms: 1000.0 / 60.0,
            max_frame_ms: 250.0,
        }
    }
}

pub struct Config {
    engine_config: EngineConfiguration,
    project_config: ProjectConfiguration,
}

impl Config {
    pub fn new(project_config: Option<ProjectConfiguration>) -> Self {
        let engine_config = Config::load_engine_config();
        let project_config = project_config.unwrap_or(ProjectConfiguration::new(None));

        Config { engine_config, project_config }
    }

    pub fn exist_project(&self, path: &Path) -> bool {
        FileUtils::has_extension(path, self.engine_config.project_file_extension.as_str())
            || FileUtils::find_ext_in_dir(path, self.engine_config.project_file_extension.as_str())
                .is_some()
    }

    //Locate and parse a project file, either the file itself or the first one
    //found in the given directory.
    pub fn find_project(&mut self, path: &Path) -> Result<(), ConfigError> {
        let extension = self.engine_config.project_file_extension.as_str();

        let file_path = if FileUtils::has_extension(path, extension) {
            Some(path.to_path_buf())
        } else {
            FileUtils::find_ext_in_dir(path, extension)
        };

        if let Some(file_path) = file_path {
            let file = match std::fs::File::open(&file_path) {
                Err(error) => {
                    log::error!(
                        "Could not access {}. Please check if the file exists and I am permitted to open it. Message: {}",
                        file_path.display(),
                        error
                    );
                    return Err(ConfigError::Io(error));
                }
                Ok(file) => file,
            };

            let reader = BufReader::new(file);

            match serde_json::from_reader(reader) {
                Err(error) => {
                    log::error!("Failed to parse {}. Message: {}", file_path.display(), error);
                    Err(ConfigError::Json(error))
                }
                Ok(configuration) => {
                    self.project_config = configuration;
                    self.project_config.location =
                        file_path.parent().map(|parent| parent.to_path_buf());
                    Ok(())
                }
            }
        } else {
            Err(ConfigError::NotFound)
        }
    }

    //Where relative asset paths are resolved. Falls back to the working directory
    //when no project was found.
    pub fn asset_root(&self) -> PathBuf {
        let location =
            self.project_config.location.clone().unwrap_or_else(|| PathBuf::from("."));

        match &self.project_config.data_folder {
            Some(data) => location.join(data),
            None => location,
        }
    }

    pub fn engine_config(&self) -> &EngineConfiguration {
        &self.engine_config
    }

    pub fn project_config(&self) -> &ProjectConfiguration {
        &self.project_config
    }

    fn load_engine_config() -> EngineConfiguration {
        let config = Path::new("config").join("config.json");

        let file = match std::fs::File::open(&config) {
            Err(_) => {
                log::warn!("Could not access {}. Defaulting...", config.display());
                return EngineConfiguration::default();
            }
            Ok(file) => file,
        };

        let reader = BufReader::new(file);

        match serde_json::from_reader(reader) {
            Err(_) => {
                log::error!("Failed to parse {}. Defaulting...", config.display());
                EngineConfiguration::default()
            }
            Ok(configuration) => configuration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_project_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_engine_defaults() {
        let engine = EngineConfiguration::default();
        assert_eq!(engine.project_file_extension, "ovt");
        assert!(engine.fixed_timestep_ms > 16.0 && engine.fixed_timestep_ms < 17.0);
        assert_eq!(engine.max_frame_ms, 250.0);
    }

    #[test]
    fn test_find_project_in_dir() {
        let dir = temp_project_dir("overture_config_found");
        let project = ProjectConfiguration::new(None)
            .with_name("Orb")
            .with_author("someone")
            .with_data(PathBuf::from("data"));
        std::fs::write(dir.join("Orb.ovt"), serde_json::to_string(&project).unwrap()).unwrap();

        let mut config = Config::new(None);
        config.find_project(&dir).unwrap();

        assert_eq!(config.project_config().project_name, "Orb");
        assert_eq!(config.project_config().author.as_deref(), Some("someone"));
        assert_eq!(config.asset_root(), dir.join("data"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_find_project_missing() {
        let dir = temp_project_dir("overture_config_missing");

        let mut config = Config::new(None);
        assert!(matches!(config.find_project(&dir), Err(ConfigError::NotFound)));
        //No project found leaves the defaults in place.
        assert_eq!(config.project_config().project_name, "MyProject");
        assert_eq!(config.asset_root(), PathBuf::from("."));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_find_project_rejects_bad_json() {
        let dir = temp_project_dir("overture_config_bad");
        std::fs::write(dir.join("Broken.ovt"), "not json").unwrap();

        let mut config = Config::new(None);
        assert!(matches!(config.find_project(&dir), Err(ConfigError::Json(_))));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
