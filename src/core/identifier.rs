//! Identity of resolved dependencies and their build schemes
//!
//! A [`ProjectIdentifier`] names one entry of the resolved dependency list
//! handed to the scheduler. The derived [`ProjectIdentifier::name`] is used
//! for checkout paths and log output.

use std::fmt;

/// A resolved source dependency
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectIdentifier {
    /// Dependency hosted in a remote repository, addressed as owner/name
    RemoteRepo { owner: String, name: String },

    /// Dependency addressed by a full repository URL
    RemoteUrl { url: String },

    /// Prebuilt binary dependency addressed by URL; carries no sources
    PrebuiltBinary { url: String },
}

impl ProjectIdentifier {
    /// Human-readable name, also the checkout folder name
    ///
    /// For URL-shaped identifiers this is the last path segment with a
    /// trailing `.git` or `.json` extension removed.
    pub fn name(&self) -> String {
        match self {
            Self::RemoteRepo { name, .. } => name.clone(),
            Self::RemoteUrl { url } | Self::PrebuiltBinary { url } => {
                let trimmed = url.trim_end_matches('/');
                let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
                let last = last.strip_suffix(".git").unwrap_or(last);
                let last = last.strip_suffix(".json").unwrap_or(last);
                last.to_string()
            }
        }
    }
}

impl fmt::Display for ProjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteRepo { owner, name } => write!(f, "{owner}/{name}"),
            Self::RemoteUrl { url } | Self::PrebuiltBinary { url } => write!(f, "{url}"),
        }
    }
}

/// A named buildable target within a located project
///
/// Schemes are discovered from the build tool at build time, never declared
/// by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scheme(String);

impl Scheme {
    /// Create a scheme from its discovered name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Scheme name as passed to the build tool
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Scheme {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_identifier_uses_repo_name() {
        let id = ProjectIdentifier::RemoteRepo {
            owner: "github".to_string(),
            name: "Archimedes".to_string(),
        };
        assert_eq!(id.name(), "Archimedes");
        assert_eq!(id.to_string(), "github/Archimedes");
    }

    #[test]
    fn url_identifier_strips_git_extension() {
        let id = ProjectIdentifier::RemoteUrl {
            url: "https://example.com/scm/ReactiveCocoa.git".to_string(),
        };
        assert_eq!(id.name(), "ReactiveCocoa");
    }

    #[test]
    fn url_identifier_ignores_trailing_slash() {
        let id = ProjectIdentifier::RemoteUrl {
            url: "https://example.com/scm/Archimedes/".to_string(),
        };
        assert_eq!(id.name(), "Archimedes");
    }

    #[test]
    fn binary_identifier_strips_json_extension() {
        let id = ProjectIdentifier::PrebuiltBinary {
            url: "https://example.com/feeds/MyFramework.json".to_string(),
        };
        assert_eq!(id.name(), "MyFramework");
    }

    #[test]
    fn scheme_round_trips_its_name() {
        let scheme = Scheme::new("ReactiveCocoaLayout");
        assert_eq!(scheme.as_str(), "ReactiveCocoaLayout");
        assert_eq!(scheme.to_string(), "ReactiveCocoaLayout");
    }
}
