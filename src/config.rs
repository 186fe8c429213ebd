use std::fs;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::NameColumn;
use crate::error::MetadataError;

pub const DEFAULT_CONFIG_FILE: &str = "seqrun.json";
pub const SAMPLE_SHEET_FILE: &str = "SampleSheet.csv";
pub const RUN_INFO_FILE: &str = "RunInfo.xml";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    /// Run directory holding the sheet, `RunInfo.xml` and statistics reports.
    #[serde(default)]
    pub path: Option<Utf8PathBuf>,
    #[serde(default)]
    pub custom_sample_sheet: Option<Utf8PathBuf>,
    #[serde(default)]
    pub run_info: Option<Utf8PathBuf>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub name_column: Option<NameColumn>,
}

/// Command-line values; each one wins over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub run_dir: Option<Utf8PathBuf>,
    pub sample_sheet: Option<Utf8PathBuf>,
    pub run_info: Option<Utf8PathBuf>,
    pub commit: Option<String>,
    pub name_column: Option<NameColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub run_dir: Utf8PathBuf,
    pub sample_sheet: Utf8PathBuf,
    pub run_info: Utf8PathBuf,
    pub commit: String,
    pub name_column: NameColumn,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `seqrun.json` when it exists in the working directory,
    /// and applies `overrides` on top.
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, MetadataError> {
        let config = match path {
            Some(path) => Self::read(Utf8PathBuf::from(path))?,
            None => {
                let default_path = Utf8PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.as_std_path().exists() {
                    Self::read(default_path)?
                } else {
                    Config::default()
                }
            }
        };
        Self::resolve_config(config, overrides)
    }

    fn read(config_path: Utf8PathBuf) -> Result<Config, MetadataError> {
        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| MetadataError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| MetadataError::ConfigParse(err.to_string()))
    }

    /// Merges file and command-line values, then checks that the sample sheet
    /// exists so a bad path fails before any document is read.
    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, MetadataError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let run_dir = overrides
            .run_dir
            .or(config.path)
            .unwrap_or_else(|| Utf8PathBuf::from("."));

        let sample_sheet = match overrides.sample_sheet.or(config.custom_sample_sheet) {
            Some(custom) => {
                if !custom.as_std_path().is_file() {
                    return Err(MetadataError::MissingCustomSampleSheet(custom));
                }
                custom
            }
            None => {
                let default_sheet = run_dir.join(SAMPLE_SHEET_FILE);
                if !default_sheet.as_std_path().is_file() {
                    return Err(MetadataError::MissingSampleSheet(default_sheet));
                }
                default_sheet
            }
        };

        let run_info = overrides
            .run_info
            .or(config.run_info)
            .unwrap_or_else(|| run_dir.join(RUN_INFO_FILE));

        Ok(ResolvedConfig {
            schema_version,
            sample_sheet,
            run_info,
            commit: overrides
                .commit
                .or(config.commit)
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            name_column: overrides
                .name_column
                .or(config.name_column)
                .unwrap_or_default(),
            run_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config_fields() {
        let config: Config = serde_json::from_str(
            r#"{"path": "/runs/run1", "commit": "abc123", "name_column": "sample_id"}"#,
        )
        .unwrap();
        assert_eq!(config.path, Some(Utf8PathBuf::from("/runs/run1")));
        assert_eq!(config.commit.as_deref(), Some("abc123"));
        assert_eq!(config.name_column, Some(NameColumn::SampleId));
        assert!(config.custom_sample_sheet.is_none());
    }
}
