use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::DecpError;

pub const CONFIG_FILE: &str = "decp-couverture.json";

/// Resolved settings for a run. Every field has a baked-in default; a
/// `decp-couverture.json` in the working directory (or an explicit
/// `--config` path) overrides them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_dir")]
    pub data_dir: Utf8PathBuf,
    #[serde(default)]
    pub decp: DecpSettings,
    #[serde(default)]
    pub sirene: SireneSettings,
    #[serde(default)]
    pub contours: ContoursSettings,
    #[serde(default)]
    pub coverage: CoverageSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            decp: DecpSettings::default(),
            sirene: SireneSettings::default(),
            contours: ContoursSettings::default(),
            coverage: CoverageSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecpSettings {
    #[serde(default = "default_decp_url")]
    pub url: String,
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl Default for DecpSettings {
    fn default() -> Self {
        Self {
            url: default_decp_url(),
            separator: default_separator(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SireneSettings {
    #[serde(default = "default_sirene_url")]
    pub url: String,
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl Default for SireneSettings {
    fn default() -> Self {
        Self {
            url: default_sirene_url(),
            separator: default_separator(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContoursSettings {
    #[serde(default = "default_communes_url")]
    pub communes_url: String,
    #[serde(default = "default_departements_url")]
    pub departements_url: String,
    #[serde(default = "default_regions_url")]
    pub regions_url: String,
}

impl Default for ContoursSettings {
    fn default() -> Self {
        Self {
            communes_url: default_communes_url(),
            departements_url: default_departements_url(),
            regions_url: default_regions_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageSettings {
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl Default for CoverageSettings {
    fn default() -> Self {
        Self {
            separator: default_separator(),
        }
    }
}

fn default_data_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("data")
}

fn default_separator() -> String {
    ";".to_string()
}

fn default_decp_url() -> String {
    "https://data.economie.gouv.fr/explore/dataset/decp_augmentees/download/?format=csv&use_labels_for_header=false&csv_separator=%3B".to_string()
}

fn default_sirene_url() -> String {
    "https://files.data.gouv.fr/insee-sirene/StockEtablissement_utf8.zip".to_string()
}

fn default_communes_url() -> String {
    "https://raw.githubusercontent.com/gregoiredavid/france-geojson/master/communes.geojson"
        .to_string()
}

fn default_departements_url() -> String {
    "https://raw.githubusercontent.com/gregoiredavid/france-geojson/master/departements.geojson"
        .to_string()
}

fn default_regions_url() -> String {
    "https://raw.githubusercontent.com/gregoiredavid/france-geojson/master/regions.geojson"
        .to_string()
}

/// A delimiter declared in the settings file: exactly one single-byte
/// character, anything else is a config error.
pub fn separator_byte(separator: &str) -> Result<u8, DecpError> {
    let bytes = separator.as_bytes();
    if bytes.len() != 1 {
        return Err(DecpError::ConfigParse(format!(
            "separator must be a single one-byte character, got {separator:?}"
        )));
    }
    Ok(bytes[0])
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolve settings from an explicit path, the default config file, or
    /// the baked-in defaults when no file exists.
    pub fn resolve(path: Option<&str>) -> Result<Settings, DecpError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| DecpError::ConfigRead(config_path.clone()))?;
        let settings: Settings = serde_json::from_str(&content)
            .map_err(|err| DecpError::ConfigParse(err.to_string()))?;
        Self::validate(&settings)?;
        Ok(settings)
    }

    pub fn validate(settings: &Settings) -> Result<(), DecpError> {
        separator_byte(&settings.decp.separator)?;
        separator_byte(&settings.sirene.separator)?;
        separator_byte(&settings.coverage.separator)?;
        Ok(())
    }
}
