//! Remote URL and owner/repository value objects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const GITHUB_HOST: &str = "github.com";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteParseError {
    #[error("invalid owner/repository '{value}': {reason}")]
    InvalidOwnerRepository { value: String, reason: &'static str },
    #[error("unrecognized remote URL '{value}'")]
    UnrecognizedUrl { value: String },
    #[error("unsupported protocol '{value}' (expected git, ssh or https)")]
    UnsupportedProtocol { value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteProtocol {
    Git,
    Ssh,
    Https,
    Other,
}

impl RemoteProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteProtocol::Git => "git",
            RemoteProtocol::Ssh => "ssh",
            RemoteProtocol::Https => "https",
            RemoteProtocol::Other => "other",
        }
    }
}

impl fmt::Display for RemoteProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemoteProtocol {
    type Err = RemoteParseError;

    /// Only the three convertible protocols parse; `other` is never a valid input.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "git" => Ok(RemoteProtocol::Git),
            "ssh" => Ok(RemoteProtocol::Ssh),
            "https" => Ok(RemoteProtocol::Https),
            _ => Err(RemoteParseError::UnsupportedProtocol {
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerRepository {
    owner: String,
    repository: String,
}

impl OwnerRepository {
    pub fn parse(value: &str) -> Result<Self, RemoteParseError> {
        let trimmed = value.trim().trim_end_matches(".git");
        let invalid = |reason| RemoteParseError::InvalidOwnerRepository {
            value: value.to_string(),
            reason,
        };

        let (owner, repository) = trimmed.split_once('/').ok_or_else(|| invalid("expected owner/repo"))?;
        if owner.is_empty() || repository.is_empty() {
            return Err(invalid("owner and repository must be non-empty"));
        }
        if repository.contains('/') {
            return Err(invalid("too many path segments"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(invalid("whitespace is not allowed"));
        }
        Ok(Self {
            owner: owner.to_string(),
            repository: repository.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn matches(&self, other: &OwnerRepository) -> bool {
        self.owner.eq_ignore_ascii_case(&other.owner) && self.repository.eq_ignore_ascii_case(&other.repository)
    }
}

impl fmt::Display for OwnerRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repository)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    pub protocol: RemoteProtocol,
    pub host: String,
    pub owner_repository: OwnerRepository,
}

impl RemoteUrl {
    pub fn parse(value: &str) -> Result<Self, RemoteParseError> {
        let trimmed = value.trim();
        let unrecognized = || RemoteParseError::UnrecognizedUrl {
            value: value.to_string(),
        };

        let (protocol, rest) = if let Some(rest) = trimmed.strip_prefix("https://") {
            (RemoteProtocol::Https, rest)
        } else if let Some(rest) = trimmed.strip_prefix("http://") {
            (RemoteProtocol::Https, rest)
        } else if let Some(rest) = trimmed.strip_prefix("git://") {
            (RemoteProtocol::Git, rest)
        } else if let Some(rest) = trimmed.strip_prefix("ssh://") {
            (RemoteProtocol::Ssh, rest)
        } else if let Some((user_host, path)) = trimmed.split_once(':') {
            // scp-like syntax: git@github.com:owner/repo.git
            if !user_host.contains('@') || user_host.contains('/') {
                return Err(unrecognized());
            }
            let host = user_host.rsplit('@').next().unwrap_or_default();
            return Ok(Self {
                protocol: RemoteProtocol::Ssh,
                host: host.to_string(),
                owner_repository: OwnerRepository::parse(path)?,
            });
        } else {
            return Err(unrecognized());
        };

        let (authority, path) = rest.split_once('/').ok_or_else(unrecognized)?;
        let host = authority.rsplit('@').next().unwrap_or_default();
        let host = host.split(':').next().unwrap_or_default();
        if host.is_empty() {
            return Err(unrecognized());
        }
        Ok(Self {
            protocol,
            host: host.to_string(),
            owner_repository: OwnerRepository::parse(path.trim_end_matches('/'))?,
        })
    }
}

/// Build the canonical GitHub remote URL for `owner_repository` in `protocol`
pub fn build_remote_url(protocol: RemoteProtocol, owner_repository: &OwnerRepository) -> Option<String> {
    match protocol {
        RemoteProtocol::Git => Some(format!("git://{GITHUB_HOST}/{owner_repository}.git")),
        RemoteProtocol::Ssh => Some(format!("git@{GITHUB_HOST}:{owner_repository}.git")),
        RemoteProtocol::Https => Some(format!("https://{GITHUB_HOST}/{owner_repository}.git")),
        RemoteProtocol::Other => None,
    }
}

/// Classify a raw origin URL; unparseable URLs are `Other`
pub fn detect_protocol(url: &str) -> RemoteProtocol {
    RemoteUrl::parse(url).map(|u| u.protocol).unwrap_or(RemoteProtocol::Other)
}
