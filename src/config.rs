use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Runtime configuration for the OpenImmo import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Directory that is scanned for `*.zip` archives.
    pub import_folder: PathBuf,
    /// Directory the images of imported records are copied to.
    pub upload_folder: PathBuf,
    /// Optional path to an OpenImmo XSD schema. Validation is advisory:
    /// failures are logged but never block the import.
    #[serde(default)]
    pub openimmo_schema: Option<PathBuf>,
    /// Fallback recipient for notifications and replacement for invalid
    /// contact addresses. Notifications are disabled entirely when empty.
    #[serde(default)]
    pub default_email: String,
    /// Whether contact persons of the records receive notification mails.
    #[serde(default = "default_true")]
    pub notify_contact_persons: bool,
    /// Whether notification mails carry only the error log.
    #[serde(default)]
    pub only_errors: bool,
    /// Whether source ZIP archives are deleted after a successful import.
    #[serde(default)]
    pub delete_zips_after_import: bool,
    /// Semicolon-separated `regexPattern:locationId` pairs matched against
    /// the archive base name, first match wins.
    #[serde(default)]
    pub locations_by_file_name: String,
    /// Language of log and notification texts ("de" or empty for English).
    #[serde(default)]
    pub language: String,
    /// Fields a record must carry to be persisted.
    #[serde(default = "default_required_fields")]
    pub required_fields: Vec<String>,
    /// ISO-3166 alpha-3 code to internal country identifier, used by the
    /// bundled reference-data table.
    #[serde(default)]
    pub countries: BTreeMap<String, u32>,
}

fn default_true() -> bool {
    true
}

fn default_required_fields() -> Vec<String> {
    vec!["object_number".to_string(), "city".to_string()]
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            import_folder: PathBuf::new(),
            upload_folder: PathBuf::new(),
            openimmo_schema: None,
            default_email: String::new(),
            notify_contact_persons: true,
            only_errors: false,
            delete_zips_after_import: false,
            locations_by_file_name: String::new(),
            language: String::new(),
            required_fields: default_required_fields(),
            countries: BTreeMap::new(),
        }
    }
}

impl ImportConfig {
    /// Load the configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: ImportConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        Ok(config)
    }

    /// Resolve the storage location override for an archive file name.
    ///
    /// The override table has the form `pattern:id;pattern:id`. The patterns
    /// are matched against the archive base name without its `.zip` suffix;
    /// the first match wins. Returns 0 when no override applies.
    pub fn location_for_archive(&self, archive: &Path) -> u32 {
        if self.locations_by_file_name.is_empty() {
            return 0;
        }

        let base_name = archive
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        for pair in self.locations_by_file_name.split(';') {
            let Some((pattern, id)) = pair.rsplit_once(':') else {
                continue;
            };
            let Ok(id) = id.trim().parse::<u32>() else {
                continue;
            };
            match Regex::new(pattern) {
                Ok(regex) => {
                    if regex.is_match(&base_name) {
                        return id;
                    }
                }
                Err(error) => {
                    warn!("Ignoring invalid file name pattern '{}': {}", pattern, error);
                }
            }
        }

        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_overrides(table: &str) -> ImportConfig {
        ImportConfig {
            locations_by_file_name: table.to_string(),
            ..ImportConfig::default()
        }
    }

    #[test]
    fn parses_a_minimal_config_file() {
        let config: ImportConfig = toml::from_str(
            r#"
            import_folder = "/var/openimmo/incoming"
            upload_folder = "/var/openimmo/images"
            default_email = "admin@example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.import_folder, PathBuf::from("/var/openimmo/incoming"));
        assert!(config.notify_contact_persons);
        assert_eq!(config.required_fields, vec!["object_number", "city"]);
    }

    #[test]
    fn first_matching_file_name_pattern_wins() {
        let config = config_with_overrides("^vendor_a:12;^vendor:34");
        assert_eq!(config.location_for_archive(Path::new("/tmp/vendor_a_2024.zip")), 12);
        assert_eq!(config.location_for_archive(Path::new("/tmp/vendor_b.zip")), 34);
    }

    #[test]
    fn unmatched_archives_get_the_default_location() {
        let config = config_with_overrides("^vendor_a:12");
        assert_eq!(config.location_for_archive(Path::new("/tmp/other.zip")), 0);
    }

    #[test]
    fn patterns_match_the_base_name_without_zip_suffix() {
        let config = config_with_overrides("2024$:7");
        assert_eq!(config.location_for_archive(Path::new("/tmp/export_2024.zip")), 7);
    }
}
