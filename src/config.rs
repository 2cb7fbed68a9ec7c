// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path, path::PathBuf};

use crate::process::columns::DeriveConfig;

/// Tables are picked off a page when their text matches this.
pub const DEFAULT_MARKER: &str = "Date of birth";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_COMBINED_FILE: &str = "all_cabinets.csv";

/// One page to scrape and the label its rows are tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub administration: String,
    #[serde(default)]
    pub output_file: Option<String>,
}

impl Source {
    pub fn new(url: &str, administration: &str, output_file: Option<&str>) -> Self {
        Self {
            url: url.to_string(),
            administration: administration.to_string(),
            output_file: output_file.map(str::to_string),
        }
    }

    /// Human-readable page title: the last URL segment with underscores as spaces.
    pub fn cabinet_name(&self) -> String {
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .replace('_', " ")
    }

    /// Storage name for this source's dataset, derived from the page title
    /// when none is configured.
    pub fn output_name(&self) -> String {
        match &self.output_file {
            Some(name) => name.clone(),
            None => format!("{}.csv", self.cabinet_name().to_lowercase().replace(' ', "_")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            backoff_ms: 500,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub combined_file: String,
    pub marker: String,
    pub http: HttpConfig,
    pub derive: DeriveConfig,
    pub sources: Vec<Source>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            combined_file: DEFAULT_COMBINED_FILE.into(),
            marker: DEFAULT_MARKER.into(),
            http: HttpConfig::default(),
            derive: DeriveConfig::default(),
            sources: default_sources(),
        }
    }
}

pub fn default_sources() -> Vec<Source> {
    vec![
        Source::new(
            "https://en.wikipedia.org/wiki/Second_cabinet_of_Donald_Trump",
            "Trump 2nd",
            Some("trump_second_cabinet.csv"),
        ),
        Source::new(
            "https://en.wikipedia.org/wiki/First_cabinet_of_Donald_Trump",
            "Trump 1st",
            Some("trump_first_cabinet.csv"),
        ),
        Source::new(
            "https://en.wikipedia.org/wiki/Cabinet_of_Joe_Biden",
            "Biden",
            Some("biden_cabinet.csv"),
        ),
    ]
}

impl Config {
    /// Read a YAML config; fields left out keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening config {:?}", path))?;
        serde_yaml::from_reader(file).with_context(|| format!("parsing config {:?}", path))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing config")
    }

    /// Sources whose administration is in `names` (case-insensitive), or all
    /// of them when `names` is empty. Order follows the config.
    pub fn selected_sources(&self, names: &[String]) -> Vec<&Source> {
        self.sources
            .iter()
            .filter(|s| {
                names.is_empty()
                    || names
                        .iter()
                        .any(|n| n.eq_ignore_ascii_case(&s.administration))
            })
            .collect()
    }
}
