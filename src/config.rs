//! # Configuration
//!
//! Manifest resolution reads a handful of options from INI-style
//! configuration files. Options are named `section.key`, so
//!
//! ```ini
//! [manifest]
//! path = zephyr
//! group-filter = -optional,+babblesim
//! ```
//!
//! sets `manifest.path` and `manifest.group-filter`.
//!
//! ## Layers
//!
//! Three files are consulted, lowest precedence first:
//!
//! - **system**: `/etc/westconfig`, or `$WEST_CONFIG_SYSTEM`
//! - **global**: `~/.westconfig`, or `$WEST_CONFIG_GLOBAL`
//! - **local**: `<topdir>/.west/config`, or `$WEST_CONFIG_LOCAL`
//!
//! A missing file is simply an empty layer. Files are parsed with
//! `rust-ini`, with escape and quote processing turned off so that regular
//! expressions in `manifest.project-filter` survive intact.
//!
//! ## Manifest options
//!
//! [`ManifestConfig`] gathers the options that steer resolution. The
//! location and group-filter options come from the local layer only;
//! `manifest.project-filter` may come from any layer.

use ini::{Ini, ParseOption};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::defaults::{
    default_global_config, default_system_config, local_config, ENV_CONFIG_GLOBAL,
    ENV_CONFIG_LOCAL, ENV_CONFIG_SYSTEM, MANIFEST_FILE,
};
use crate::error::{Error, Result};
use crate::group_filter::{parse_config_group_filter, GroupFilter, ProjectFilter};
use crate::validate::is_absolute_like;

/// One configuration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFile {
    System,
    Global,
    Local,
}

impl ConfigFile {
    fn env_var(self) -> &'static str {
        match self {
            ConfigFile::System => ENV_CONFIG_SYSTEM,
            ConfigFile::Global => ENV_CONFIG_GLOBAL,
            ConfigFile::Local => ENV_CONFIG_LOCAL,
        }
    }
}

type Options = BTreeMap<String, String>;

/// Configuration options from every layer.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    system: Options,
    global: Options,
    local: Options,
    local_path: Option<PathBuf>,
}

/// Returns the file backing `layer`, honoring environment overrides.
pub fn config_path(layer: ConfigFile, topdir: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(layer.env_var()) {
        return Some(PathBuf::from(path));
    }
    match layer {
        ConfigFile::System => default_system_config(),
        ConfigFile::Global => default_global_config(),
        ConfigFile::Local => topdir.map(local_config),
    }
}

fn parse_options(text: &str, origin: &str) -> Result<Options> {
    let opt = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_str_opt(text, opt).map_err(|e| Error::MalformedConfig {
        message: format!("cannot parse {}: {}", origin, e),
    })?;

    let mut options = Options::new();
    for (section, properties) in ini.iter() {
        // Keys outside any section have no dotted name and are ignored.
        let Some(section) = section else { continue };
        for (key, value) in properties.iter() {
            options.insert(format!("{}.{}", section, key), value.to_string());
        }
    }
    Ok(options)
}

fn read_layer(path: Option<&Path>) -> Result<Options> {
    let Some(path) = path else {
        return Ok(Options::new());
    };
    match std::fs::read_to_string(path) {
        Ok(text) => parse_options(&text, &path.display().to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Options::new()),
        Err(e) => Err(e.into()),
    }
}

impl Configuration {
    /// Reads every layer from disk.
    ///
    /// The local layer is only read when `topdir` is given or
    /// `WEST_CONFIG_LOCAL` is set.
    pub fn load(topdir: Option<&Path>) -> Result<Self> {
        let local_path = config_path(ConfigFile::Local, topdir);
        Ok(Configuration {
            system: read_layer(config_path(ConfigFile::System, topdir).as_deref())?,
            global: read_layer(config_path(ConfigFile::Global, topdir).as_deref())?,
            local: read_layer(local_path.as_deref())?,
            local_path,
        })
    }

    /// Builds a configuration from INI text for each layer.
    pub fn from_layers(system: &str, global: &str, local: &str) -> Result<Self> {
        Ok(Configuration {
            system: parse_options(system, "system configuration")?,
            global: parse_options(global, "global configuration")?,
            local: parse_options(local, "local configuration")?,
            local_path: None,
        })
    }

    /// Returns the value of `option` from the highest layer that sets it.
    pub fn get(&self, option: &str) -> Option<&str> {
        [ConfigFile::Local, ConfigFile::Global, ConfigFile::System]
            .into_iter()
            .find_map(|layer| self.get_from(option, layer))
    }

    /// Returns the value of `option` from one layer.
    pub fn get_from(&self, option: &str, layer: ConfigFile) -> Option<&str> {
        let options = match layer {
            ConfigFile::System => &self.system,
            ConfigFile::Global => &self.global,
            ConfigFile::Local => &self.local,
        };
        options.get(option).map(String::as_str)
    }

    /// The file the local layer was read from, if any.
    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }
}

/// The configuration options that steer manifest resolution.
#[derive(Debug, Clone, Default)]
pub struct ManifestConfig {
    /// `manifest.path`: manifest repository, relative to the top directory
    pub path: Option<String>,
    /// `manifest.file`: manifest file inside that repository
    pub file: String,
    /// `manifest.group-filter`, with invalid items already dropped
    pub group_filter: GroupFilter,
    /// `manifest.project-filter`
    pub project_filter: ProjectFilter,
}

impl ManifestConfig {
    pub fn from_config(config: &Configuration) -> Result<Self> {
        let path = config
            .get_from("manifest.path", ConfigFile::Local)
            .map(str::to_string);
        if let Some(p) = &path {
            if is_absolute_like(p) {
                log::warn!("\"manifest.path\" should not be absolute: {}", p);
            }
        }

        let file = config
            .get_from("manifest.file", ConfigFile::Local)
            .unwrap_or(MANIFEST_FILE)
            .to_string();

        let group_filter = config
            .get_from("manifest.group-filter", ConfigFile::Local)
            .map(parse_config_group_filter)
            .unwrap_or_default();

        let project_filter = match config.get("manifest.project-filter") {
            Some(raw) => ProjectFilter::parse(raw)?,
            None => ProjectFilter::default(),
        };

        Ok(ManifestConfig {
            path,
            file,
            group_filter,
            project_filter,
        })
    }
}
