//! Route patterns: `/students/{id}` compiled to an anchored regex.

use crate::error::ConfigError;
use regex::Regex;

/// Leading slash, no trailing slash, `/` for the root.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[derive(Debug)]
pub struct Pattern {
    source: String,
    regex: Regex,
    names: Vec<String>,
}

impl Pattern {
    /// Each `{name}` segment matches exactly one non-empty path segment; everything else is
    /// literal.
    pub fn compile(pattern: &str) -> Result<Self, ConfigError> {
        let source = normalize_path(pattern);
        let invalid = |message: &str| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message: message.to_string(),
        };

        let mut re = String::from("^");
        let mut names = Vec::new();
        for segment in source.split('/').filter(|s| !s.is_empty()) {
            re.push('/');
            if segment.starts_with('{') && segment.ends_with('}') {
                let name = &segment[1..segment.len() - 1];
                if name.is_empty() || name.contains(['{', '}']) {
                    return Err(invalid("placeholder needs a name"));
                }
                re.push_str("([^/]+)");
                names.push(name.to_string());
            } else if segment.contains(['{', '}']) {
                return Err(invalid("placeholders must span a whole segment"));
            } else {
                re.push_str(&regex::escape(segment));
            }
        }
        if source == "/" {
            re.push('/');
        }
        re.push('$');

        let regex = Regex::new(&re).map_err(|e| invalid(&e.to_string()))?;
        Ok(Pattern { source, regex, names })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Captured segments in pattern order, or `None` when the path does not match.
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(path)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_slashes() {
        assert_eq!(normalize_path("students/"), "/students");
        assert_eq!(normalize_path("//students//"), "/students");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn placeholders_capture_single_segments_in_order() {
        let p = Pattern::compile("/classes/{class}/students/{student}").unwrap();
        assert_eq!(p.names(), ["class", "student"]);
        assert_eq!(
            p.captures("/classes/7B/students/42"),
            Some(vec!["7B".to_string(), "42".to_string()])
        );
        assert_eq!(p.captures("/classes/7B/students/42/edit"), None);
        assert_eq!(p.captures("/classes/7B/x/students/42"), None);
    }

    #[test]
    fn literals_are_escaped() {
        let p = Pattern::compile("/reports/grades.csv").unwrap();
        assert!(p.captures("/reports/grades.csv").is_some());
        assert!(p.captures("/reports/gradesXcsv").is_none());
    }

    #[test]
    fn root_matches_only_root() {
        let p = Pattern::compile("/").unwrap();
        assert_eq!(p.captures("/"), Some(vec![]));
        assert!(p.captures("/students").is_none());
    }

    #[test]
    fn malformed_placeholders_are_config_errors() {
        assert!(Pattern::compile("/students/{}").is_err());
        assert!(Pattern::compile("/students/id-{id}").is_err());
    }
}
