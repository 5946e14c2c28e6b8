//! Backend discovery and `enabled_backends` injection.

use crate::parser::{DEFAULT_SECTION, Line, keys, parse_line};
use serde::{Deserialize, Serialize};

/// Driver class suffix of the driver used when a backend names none.
pub const DEFAULT_FALLBACK_DRIVER_SUFFIX: &str = ".LVMVolumeDriver";

/// Facts collected from a single pass over a snippet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendScan {
    /// `enabled_backends` is set somewhere in the snippet
    pub has_enabled_backends: bool,
    /// Line index of the last `[DEFAULT]` header
    pub default_section_index: Option<usize>,
    /// One entry per `volume_backend_name`, in order of appearance
    pub backend_names: Vec<String>,
    /// Number of explicit `volume_driver` lines
    pub driver_count: usize,
    /// Some `volume_driver` line names the fallback driver
    pub fallback_driver_declared: bool,
}

impl BackendScan {
    /// Whether any backend runs on the fallback driver.
    ///
    /// A backend without `volume_driver` gets the fallback driver implicitly,
    /// which shows up as fewer drivers than backends.
    pub fn uses_fallback_driver(&self) -> bool {
        self.fallback_driver_declared || self.driver_count < self.backend_names.len()
    }

    /// Whether `enabled_backends` has to be injected
    pub fn needs_enabled_backends(&self) -> bool {
        !self.has_enabled_backends && !self.backend_names.is_empty()
    }
}

/// Result of augmenting a snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Augmented {
    /// A backend uses the fallback driver
    pub uses_fallback_driver: bool,
    /// Snippet with `enabled_backends` injected when needed
    pub config: String,
}

impl Augmented {
    /// Split into `(uses_fallback_driver, config)`
    pub fn into_parts(self) -> (bool, String) {
        (self.uses_fallback_driver, self.config)
    }
}

/// Scans snippets for backends and injects `enabled_backends`.
#[derive(Debug, Clone)]
pub struct Augmenter {
    fallback_driver_suffix: String,
}

impl Default for Augmenter {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_DRIVER_SUFFIX)
    }
}

impl Augmenter {
    /// Create an augmenter recognizing `fallback_driver_suffix`.
    pub fn new(fallback_driver_suffix: impl Into<String>) -> Self {
        Self {
            fallback_driver_suffix: fallback_driver_suffix.into(),
        }
    }

    /// Collect backend facts in one pass.
    ///
    /// A backend is named after the section it is declared in. A `[DEFAULT]`
    /// header does not open a new backend section.
    pub fn scan(&self, snippet: &str) -> BackendScan {
        let mut scan = BackendScan::default();
        let mut section_name = String::new();

        for (idx, raw) in snippet.split('\n').enumerate() {
            match parse_line(raw) {
                Line::Blank | Line::Comment(_) => {}
                Line::Section(name) if name == DEFAULT_SECTION => {
                    scan.default_section_index = Some(idx);
                }
                Line::Section(name) => section_name = name,
                Line::Entry { key, .. } => match key.as_str() {
                    keys::ENABLED_BACKENDS => scan.has_enabled_backends = true,
                    keys::VOLUME_BACKEND_NAME => scan.backend_names.push(section_name.clone()),
                    keys::VOLUME_DRIVER => {
                        scan.driver_count += 1;
                        if raw.trim().ends_with(&self.fallback_driver_suffix) {
                            scan.fallback_driver_declared = true;
                        }
                    }
                    _ => {}
                },
            }
        }

        scan
    }

    /// Inject `enabled_backends` if missing and report fallback driver use.
    ///
    /// - `enabled_backends` already set, or no backends: snippet unchanged
    /// - no `[DEFAULT]`: a new `[DEFAULT]` section is prepended
    /// - `[DEFAULT]` present: its header line is replaced by the header plus
    ///   the `enabled_backends` line. Other `[DEFAULT]` keys are left where
    ///   they are and not merged.
    pub fn augment(&self, snippet: &str) -> Augmented {
        let scan = self.scan(snippet);
        let uses_fallback_driver = scan.uses_fallback_driver();

        if !scan.needs_enabled_backends() {
            return Augmented {
                uses_fallback_driver,
                config: snippet.to_string(),
            };
        }

        let enabled = enabled_backends_line(&scan.backend_names);
        let config = match scan.default_section_index {
            None => format!("[{DEFAULT_SECTION}]\n{enabled}\n{snippet}"),
            Some(idx) => snippet
                .split('\n')
                .enumerate()
                .map(|(i, line)| {
                    if i == idx {
                        format!("[{DEFAULT_SECTION}]\n{enabled}")
                    } else {
                        line.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
        };

        Augmented {
            uses_fallback_driver,
            config,
        }
    }
}

/// Render `enabled_backends=<a>,<b>,...`.
pub fn enabled_backends_line(backends: &[String]) -> String {
    format!("{}={}", keys::ENABLED_BACKENDS, backends.join(","))
}
