//! Harness configuration
//!
//! Every knob the pipeline uses lives here: the fixed crawl target, where the
//! crawler writes its artifact and log, the candidate paths the locator tries,
//! and the declarative sheet/column contract the workbook validator checks.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::{Candidate, Invocation};

/// Crawler flag naming the exported workbook inside its output directory
const FILENAME_FLAG: &str = "--filename";

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory the crawler runs in and the locator searches from
    pub working_dir: PathBuf,

    /// Interpreter used to start script and module candidates
    pub interpreter: String,

    /// Importable module name of the crawler
    pub module_name: String,

    /// Upper bound on the crawl subprocess
    pub timeout_secs: u64,

    /// Workbook the crawler exports (relative paths resolve against `working_dir`)
    pub artifact_path: PathBuf,

    /// Log file the crawler writes (relative paths resolve against `working_dir`)
    pub log_path: PathBuf,

    /// Directory for the JSON run report (None = don't write one)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_dir: Option<PathBuf>,

    /// Fixed crawl target
    pub target: TargetConfig,

    /// Entry point discovery
    pub locator: LocatorConfig,

    /// Sheet detection rules
    pub sheets: SheetRules,

    /// Parser name -> expected column group
    pub signatures: Vec<ParserSignature>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            interpreter: "python3".to_string(),
            module_name: "seofrog".to_string(),
            timeout_secs: 300,
            artifact_path: PathBuf::from("seofrog_output/seofrog_crawl.xlsx"),
            log_path: PathBuf::from("seofrog_output/seofrog.log"),
            report_dir: None,
            target: TargetConfig::default(),
            locator: LocatorConfig::default(),
            sheets: SheetRules::default(),
            signatures: default_signatures(),
        }
    }
}

/// Target parameters passed to the crawler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub host: String,
    pub max_urls: u32,
    pub workers: u32,
    /// Appended verbatim after the fixed arguments
    pub extra_args: Vec<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "example.com".to_string(),
            max_urls: 5,
            workers: 1,
            extra_args: Vec::new(),
        }
    }
}

/// Entry point discovery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Relative paths tried in order; earlier entries rank higher
    pub candidate_paths: Vec<String>,

    /// Case-insensitive file name substrings for the recursive search
    pub keywords: Vec<String>,

    /// Keywords that rank a search hit above a plain keyword hit
    pub preferred_keywords: Vec<String>,

    /// Accepted file extensions for search hits (empty = any)
    pub extensions: Vec<String>,

    /// Directory names the recursive search never descends into
    pub skip_dirs: Vec<String>,

    /// Stop the recursive search after this many hits
    pub max_search_results: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            candidate_paths: [
                "seofrog.py",
                "seofrog/__main__.py",
                "seofrog/cli.py",
                "seofrog/main.py",
                "main.py",
                "cli.py",
            ]
            .map(String::from)
            .to_vec(),
            keywords: ["seofrog", "cli", "main"].map(String::from).to_vec(),
            preferred_keywords: ["cli", "main"].map(String::from).to_vec(),
            extensions: vec!["py".to_string()],
            skip_dirs: [".git", "target", "node_modules", "__pycache__", ".venv", "venv"]
                .map(String::from)
                .to_vec(),
            max_search_results: 10,
        }
    }
}

/// Keyword rules for picking sheets out of the workbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetRules {
    /// First sheet whose name contains one of these is the redirect sheet
    pub redirect_keywords: Vec<String>,

    /// Preferred names for the main data sheet
    pub main_keywords: Vec<String>,
}

impl Default for SheetRules {
    fn default() -> Self {
        Self {
            redirect_keywords: vec!["redirect".to_string()],
            main_keywords: vec!["dados".to_string(), "completo".to_string()],
        }
    }
}

/// Expected column group of one crawler parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserSignature {
    pub name: String,
    pub columns: Vec<String>,
}

impl ParserSignature {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Column groups written by the crawler's extraction modules
pub fn default_signatures() -> Vec<ParserSignature> {
    vec![
        ParserSignature::new(
            "meta",
            &["title", "title_length", "meta_description", "meta_description_length"],
        ),
        ParserSignature::new(
            "technical",
            &["has_viewport", "viewport_content", "charset_value", "redirect_count"],
        ),
        ParserSignature::new("social", &["og_tags_count", "twitter_tags_count"]),
        ParserSignature::new(
            "schema",
            &["schema_total_count", "json_ld_count", "microdata_count"],
        ),
        ParserSignature::new("headings", &["h1_count", "h2_count"]),
        ParserSignature::new("content", &["word_count"]),
        ParserSignature::new("images", &["images_count"]),
    ]
}

impl HarnessConfig {
    /// Load configuration from file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        toml::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::write(path, content).map_err(|e| Error::io(path, e))
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig("timeout_secs must be positive".into()));
        }
        if self.target.host.trim().is_empty() {
            return Err(Error::InvalidConfig("target.host is empty".into()));
        }
        if self.target.max_urls == 0 {
            return Err(Error::InvalidConfig("target.max_urls must be positive".into()));
        }
        if self.target.workers == 0 {
            return Err(Error::InvalidConfig("target.workers must be positive".into()));
        }
        if !is_module_path(&self.module_name) {
            return Err(Error::InvalidConfig(format!(
                "module_name '{}' is not a dotted module path",
                self.module_name
            )));
        }
        if self.interpreter.trim().is_empty() {
            return Err(Error::InvalidConfig("interpreter is empty".into()));
        }
        if self.locator.candidate_paths.is_empty() && self.locator.keywords.is_empty() {
            return Err(Error::InvalidConfig(
                "locator needs candidate_paths or keywords".into(),
            ));
        }
        if let Some(empty) = self.signatures.iter().find(|s| s.columns.is_empty()) {
            return Err(Error::InvalidConfig(format!(
                "signature '{}' has no columns",
                empty.name
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Artifact path resolved against the working directory
    pub fn resolved_artifact_path(&self) -> PathBuf {
        self.working_dir.join(&self.artifact_path)
    }

    /// Crawl invocation for a located candidate.
    ///
    /// Without an explicit name the crawler exports a timestamped workbook, so
    /// the artifact's file name is passed along unless `extra_args` already
    /// names one.
    pub fn invocation(&self, candidate: &Candidate) -> Invocation {
        let mut invocation = Invocation::for_candidate(candidate, &self.interpreter, &self.target);
        let named = self.target.extra_args.iter().any(|arg| {
            arg == FILENAME_FLAG || arg.starts_with(&format!("{FILENAME_FLAG}="))
        });
        if let Some(file_name) = self.artifact_path.file_name().filter(|_| !named) {
            invocation.arguments.push(FILENAME_FLAG.to_string());
            invocation.arguments.push(file_name.to_string_lossy().into_owned());
        }
        invocation
    }

    /// Log path resolved against the working directory
    pub fn resolved_log_path(&self) -> PathBuf {
        self.working_dir.join(&self.log_path)
    }
}

/// Whether `name` is a dotted module path such as `seofrog` or `seofrog.cli`
pub fn is_module_path(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|first| first == '_' || first.is_alphabetic())
                && chars.all(|c| c == '_' || c.is_alphanumeric())
        })
}
