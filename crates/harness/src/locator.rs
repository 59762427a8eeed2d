//! Entry point discovery
//!
//! Three strategies, tried in order until one yields a candidate:
//! 1. Conventional relative paths (first existing one wins)
//! 2. Recursive file name search by keyword
//! 3. Import probe through the interpreter

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crawlprobe_common::{is_module_path, Candidate, CandidateKind, Confidence, LocatorConfig};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Checks whether a module can be loaded by the host runtime
pub trait ModuleProbe: Send + Sync {
    fn is_importable(&self, module: &str) -> bool;
}

/// Import check budget when none is configured
pub const DEFAULT_IMPORT_TIMEOUT: Duration = Duration::from_secs(10);

const IMPORT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Probe that asks the interpreter to import the module.
///
/// Names that are not dotted module paths are rejected without spawning, and
/// an interpreter that outlives the timeout is killed and counts as a miss.
#[derive(Debug, Clone)]
pub struct InterpreterProbe {
    interpreter: String,
    timeout: Duration,
}

impl InterpreterProbe {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout: DEFAULT_IMPORT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ModuleProbe for InterpreterProbe {
    fn is_importable(&self, module: &str) -> bool {
        if !is_module_path(module) {
            warn!("Refusing import check for '{}': not a module path", module);
            return false;
        }

        let spawned = Command::new(&self.interpreter)
            .args(["-c", &format!("import {}", module)])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                debug!("Import check via {} failed to start: {}", self.interpreter, e);
                return false;
            }
        };

        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return status.success(),
                Ok(None) if start.elapsed() < self.timeout => std::thread::sleep(IMPORT_POLL_INTERVAL),
                Ok(None) => {
                    warn!(
                        "Import check for {} via {} exceeded {:?}, killing it",
                        module, self.interpreter, self.timeout
                    );
                    let _ = child.kill();
                    let _ = child.wait();
                    return false;
                }
                Err(e) => {
                    debug!("Import check via {} could not be polled: {}", self.interpreter, e);
                    let _ = child.kill();
                    let _ = child.wait();
                    return false;
                }
            }
        }
    }
}

/// Entry point locator
pub struct Locator {
    config: LocatorConfig,
    module_name: String,
    probe: Arc<dyn ModuleProbe>,
}

impl Locator {
    pub fn new(config: LocatorConfig, module_name: impl Into<String>, probe: Arc<dyn ModuleProbe>) -> Self {
        Self {
            config,
            module_name: module_name.into(),
            probe,
        }
    }

    /// Find the best entry point under `base_dir`, or None when every strategy fails
    pub fn locate(&self, base_dir: &Path) -> Option<Candidate> {
        let candidate = self
            .conventional(base_dir)
            .or_else(|| self.search(base_dir))
            .or_else(|| self.module());

        match &candidate {
            Some(c) => info!("Located entry point {} ({}, confidence {})", c.path, c.kind, c.confidence.0),
            None => info!("No entry point found under {}", base_dir.display()),
        }
        candidate
    }

    fn conventional(&self, base_dir: &Path) -> Option<Candidate> {
        self.config
            .candidate_paths
            .iter()
            .enumerate()
            .find(|(_, rel)| {
                let exists = base_dir.join(rel).is_file();
                debug!("Conventional path {}: {}", rel, if exists { "found" } else { "absent" });
                exists
            })
            .map(|(index, rel)| Candidate {
                path: base_dir.join(rel).display().to_string(),
                kind: CandidateKind::FileScript,
                confidence: Confidence::conventional(index),
            })
    }

    fn search(&self, base_dir: &Path) -> Option<Candidate> {
        if self.config.keywords.is_empty() || self.config.max_search_results == 0 {
            return None;
        }

        let hits: Vec<DirEntry> = WalkDir::new(base_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_skipped_dir(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.matches_keyword(entry))
            .take(self.config.max_search_results)
            .collect();

        debug!("Recursive search found {} keyword hit(s)", hits.len());

        let preferred = hits.iter().find(|entry| self.is_preferred(entry));
        let (entry, confidence) = match preferred {
            Some(entry) => (entry, Confidence::SEARCH_PREFERRED),
            None => (hits.first()?, Confidence::SEARCH_KEYWORD),
        };

        Some(Candidate {
            path: entry.path().display().to_string(),
            kind: CandidateKind::FileScript,
            confidence,
        })
    }

    fn module(&self) -> Option<Candidate> {
        if self.module_name.is_empty() || !self.probe.is_importable(&self.module_name) {
            return None;
        }
        Some(Candidate {
            path: self.module_name.clone(),
            kind: CandidateKind::PackageModule,
            confidence: Confidence::MODULE,
        })
    }

    fn is_skipped_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && self
                .config
                .skip_dirs
                .iter()
                .any(|skip| entry.file_name() == skip.as_str())
    }

    fn matches_keyword(&self, entry: &DirEntry) -> bool {
        let path = entry.path();
        let extension_ok = self.config.extensions.is_empty()
            || path
                .extension()
                .map(|ext| {
                    self.config
                        .extensions
                        .iter()
                        .any(|allowed| ext.eq_ignore_ascii_case(allowed.as_str()))
                })
                .unwrap_or(false);

        extension_ok && name_contains(entry, &self.config.keywords)
    }

    fn is_preferred(&self, entry: &DirEntry) -> bool {
        name_contains(entry, &self.config.preferred_keywords)
    }
}

fn name_contains(entry: &DirEntry, keywords: &[String]) -> bool {
    let name = entry.file_name().to_string_lossy().to_lowercase();
    keywords.iter().any(|k| name.contains(&k.to_lowercase()))
}
