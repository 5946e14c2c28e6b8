//! Line classifier for backend configuration snippets.
//!
//! Each line is classified on its own by the token before the first `=`:
//! ```text
//! # comment          -> Comment
//! [lvm]              -> Section("lvm")
//! volume_driver = x  -> Entry { key: "volume_driver", value: Some("x") }
//! ```

use serde::{Deserialize, Serialize};

/// Well-known keys
pub mod keys {
    /// List of backends the service enables
    pub const ENABLED_BACKENDS: &str = "enabled_backends";
    /// Declares that the current section is a backend
    pub const VOLUME_BACKEND_NAME: &str = "volume_backend_name";
    /// Driver class for the current backend
    pub const VOLUME_DRIVER: &str = "volume_driver";
}

/// Name of the section holding service-wide options.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// A classified configuration line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Line {
    /// Empty or whitespace-only line
    Blank,
    /// `#`-prefixed comment
    Comment(String),
    /// `[name]` header
    Section(String),
    /// `key=value`, or a bare key without `=`
    Entry {
        /// Trimmed key
        key: String,
        /// Trimmed value, if an `=` was present
        value: Option<String>,
    },
}

impl Line {
    /// Check if this is the `[DEFAULT]` header
    pub fn is_default_section(&self) -> bool {
        matches!(self, Self::Section(name) if name == DEFAULT_SECTION)
    }

    /// Key of an entry line
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Entry { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Classify a single line.
pub fn parse_line(raw: &str) -> Line {
    let line = raw.trim();
    let (token, value) = match line.split_once('=') {
        Some((token, value)) => (token.trim(), Some(value.trim())),
        None => (line, None),
    };

    if token.is_empty() {
        return Line::Blank;
    }

    if token.starts_with('#') {
        return Line::Comment(line.to_string());
    }

    if token.starts_with('[') && token.ends_with(']') {
        return Line::Section(token.trim_matches(|c| c == '[' || c == ']').to_string());
    }

    Line::Entry {
        key: token.to_string(),
        value: value.map(str::to_string),
    }
}

/// Classify every line of a snippet.
///
/// Lines are split on `\n` only, so indices line up with the original text.
pub fn parse_string(content: &str) -> Vec<Line> {
    content.split('\n').map(parse_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_whitespace() {
        assert_eq!(parse_line(""), Line::Blank);
        assert_eq!(parse_line("   \t"), Line::Blank);
    }

    #[test]
    fn test_comment() {
        assert_eq!(
            parse_line("  # enabled_backends=lvm"),
            Line::Comment("# enabled_backends=lvm".to_string())
        );
    }

    #[test]
    fn test_section() {
        assert_eq!(parse_line("[lvm]"), Line::Section("lvm".to_string()));
        assert_eq!(parse_line(" [DEFAULT] "), Line::Section("DEFAULT".to_string()));
        assert!(parse_line("[DEFAULT]").is_default_section());
        assert!(!parse_line("[default]").is_default_section());
    }

    #[test]
    fn test_entry() {
        assert_eq!(
            parse_line("volume_driver = cinder.volume.drivers.lvm.LVMVolumeDriver"),
            Line::Entry {
                key: "volume_driver".to_string(),
                value: Some("cinder.volume.drivers.lvm.LVMVolumeDriver".to_string()),
            }
        );
    }

    #[test]
    fn test_value_keeps_later_equals() {
        assert_eq!(
            parse_line("connection=mysql://u:p@host/db?x=y"),
            Line::Entry {
                key: "connection".to_string(),
                value: Some("mysql://u:p@host/db?x=y".to_string()),
            }
        );
    }

    #[test]
    fn test_bare_key() {
        let line = parse_line("volume_backend_name");
        assert_eq!(line.key(), Some("volume_backend_name"));
        assert_eq!(
            line,
            Line::Entry {
                key: "volume_backend_name".to_string(),
                value: None
            }
        );
    }

    #[test]
    fn test_parse_string_keeps_trailing_empty_line() {
        let lines = parse_string("[lvm]\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], Line::Blank);
    }
}
