use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{
    fs::{read_to_string, write},
    path::PathBuf,
};

use crate::{error::NavigationError, properties::NodeType};

/// Which page the root of the navigation stands for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomePage {
    #[default]
    Site,
    Dashboard,
    MyCourses,
}

/// Site-wide navigation settings. Every field has a default, so a partial TOML table is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub home_page: HomePage,
    pub enable_dashboard: bool,
    /// Courses per category (and enrolled courses) materialized before a "more" link is used.
    pub course_limit: usize,
    /// Group non-enrolled courses under their categories.
    pub show_categories: bool,
    /// Group enrolled courses under their categories inside "My courses".
    pub show_my_course_categories: bool,
    /// Show the "Courses" branch next to "My courses" even for enrolled viewers.
    pub show_all_courses: bool,
    pub show_full_course_names: bool,
    pub show_front_page_mods: bool,
    pub show_empty_sections: bool,
    pub use_site_name_for_site_pages: bool,
    pub messaging: bool,
    /// Structural nodes below nodes of this type are hidden after the build.
    pub expansion_limit: Option<NodeType>,
    /// Compare each new node's action with the current locator as it is added.
    pub auto_find_active: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        NavigationConfig {
            home_page: HomePage::Site,
            enable_dashboard: true,
            course_limit: 20,
            show_categories: true,
            show_my_course_categories: false,
            show_all_courses: false,
            show_full_course_names: false,
            show_front_page_mods: true,
            show_empty_sections: true,
            use_site_name_for_site_pages: false,
            messaging: true,
            expansion_limit: None,
            auto_find_active: true,
        }
    }
}

impl NavigationConfig {
    pub fn from_toml(source: &str) -> Result<Self, NavigationError> {
        Ok(toml::from_str(source)?)
    }

    pub fn validate(&self) -> Result<(), NavigationError> {
        if self.course_limit == 0 {
            return Err(NavigationError::configuration(
                "course_limit must be at least 1",
            ));
        }
        Ok(())
    }
}

pub trait ConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<NavigationConfig, NavigationError>;
    fn set_config(&self, config: &NavigationConfig) -> Result<(), NavigationError>;
}

/// Reads and writes the `[navigation]` table of a TOML file.
#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<NavigationConfig, NavigationError> {
        tracing::debug!("Attempting to read navigation config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using default navigation config.");
            return Ok(NavigationConfig::default());
        }
        let content = read_to_string(&self.path)?;
        let mut config: BTreeMap<String, NavigationConfig> = toml::from_str(&content)?;
        let config = config.remove("navigation").unwrap_or_else(|| {
            tracing::debug!("No [navigation] table in {:?}, using defaults.", &self.path);
            NavigationConfig::default()
        });
        config.validate()?;
        Ok(config)
    }

    fn set_config(&self, config: &NavigationConfig) -> Result<(), NavigationError> {
        tracing::debug!("Attempting to write navigation config to: {:?}", &self.path);
        config.validate()?;
        let mut file = BTreeMap::new();
        file.insert("navigation".to_string(), config);
        let toml_string = toml::to_string(&file)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_tables_fill_in_defaults() {
        let config = NavigationConfig::from_toml(
            r#"
            course_limit = 3
            home_page = "dashboard"
            expansion_limit = "course"
            "#,
        )
        .unwrap();
        assert_eq!(config.course_limit, 3);
        assert_eq!(config.home_page, HomePage::Dashboard);
        assert_eq!(config.expansion_limit, Some(NodeType::Course));
        assert!(config.show_categories);
        assert!(config.auto_find_active);
    }

    #[test]
    fn zero_course_limit_is_rejected() {
        let config = NavigationConfig {
            course_limit: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(NavigationError::Configuration(_))
        ));
    }
}
