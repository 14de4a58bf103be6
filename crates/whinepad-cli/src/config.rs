// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use whinepad_app::{Column, FilterScope, Schema};

const CONFIG_VERSION: i64 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub ui: Ui,
    pub schema: Option<SchemaSection>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            ui: Ui::default(),
            schema: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
    pub storage_key: Option<String>,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            db_path: None,
            storage_key: Some(whinepad_db::DEFAULT_STORAGE_KEY.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub filter_scope: Option<String>,
}

/// Replaces the built-in wine columns when present.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaSection {
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("WHINEPAD_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set WHINEPAD_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(whinepad_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and keep values under [storage], [ui], and [schema]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            whinepad_db::validate_db_path(db_path)?;
        }

        if let Some(key) = &self.storage.storage_key
            && key.trim().is_empty()
        {
            bail!("storage.storage_key in {} must not be empty", path.display());
        }

        if let Some(scope) = &self.ui.filter_scope
            && FilterScope::parse(scope).is_none()
        {
            bail!(
                "ui.filter_scope in {} must be \"all\" or \"visible\", got {scope:?}",
                path.display()
            );
        }

        self.schema()
            .with_context(|| format!("invalid [schema] in {}", path.display()))?;
        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => whinepad_db::default_db_path(),
        }
    }

    pub fn storage_key(&self) -> &str {
        self.storage
            .storage_key
            .as_deref()
            .unwrap_or(whinepad_db::DEFAULT_STORAGE_KEY)
    }

    pub fn filter_scope(&self) -> FilterScope {
        self.ui
            .filter_scope
            .as_deref()
            .and_then(FilterScope::parse)
            .unwrap_or_default()
    }

    pub fn schema(&self) -> Result<Schema> {
        match &self.schema {
            Some(section) => Schema::new(section.columns.clone()),
            None => Ok(Schema::wine()),
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# whinepad config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/whinepad/whinepad.db)\n# db_path = \"/absolute/path/to/whinepad.db\"\nstorage_key = \"{}\"\n\n[ui]\n# \"all\" searches every column, \"visible\" only the shown ones\nfilter_scope = \"all\"\n\n# Optional. Replaces the built-in wine columns.\n# [[schema.columns]]\n# key = \"name\"\n# label = \"Name\"\n# type = \"text\"\n# visible = true\n# align = \"left\"\n# samples = [\"$2 Chuck\"]\n",
            path.display(),
            whinepad_db::DEFAULT_STORAGE_KEY,
        )
    }
}
