//! Image reference parsing and normalization.
//!
//! A reference is `[domain/]path[:tag][@digest]`. Normalization qualifies
//! short names the way the engine does: `busybox` becomes
//! `docker.io/library/busybox`, `user/app` becomes `docker.io/user/app`, and
//! anything whose first component looks like a host (`localhost`, contains
//! `.` or `:`) is left alone.
//!
//! Normalization never invents a tag. `busybox` has no tag; callers decide
//! whether that means "latest".

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

pub const DEFAULT_DOMAIN: &str = "docker.io";
const LEGACY_DEFAULT_DOMAIN: &str = "index.docker.io";
const OFFICIAL_REPO_PREFIX: &str = "library/";
const NAME_TOTAL_LENGTH_MAX: usize = 255;

const ALPHANUMERIC: &str = "[a-z0-9]+";
const SEPARATOR: &str = "(?:[._]|__|[-]+)";
const DOMAIN_COMPONENT: &str = "(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])";
const TAG: &str = "[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}";
const DIGEST: &str = "[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[0-9a-fA-F]{32,}";

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let path_component = format!("{ALPHANUMERIC}(?:{SEPARATOR}{ALPHANUMERIC})*");
    let domain = format!(r"{DOMAIN_COMPONENT}(?:\.{DOMAIN_COMPONENT})*(?::[0-9]+)?");
    let name = format!("(?:{domain}/)?{path_component}(?:/{path_component})*");
    Regex::new(&format!("^({name})(?::({TAG}))?(?:@({DIGEST}))?$"))
        .expect("reference grammar compiles")
});

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-f0-9]{64}$").expect("identifier grammar compiles"));

/// Reasons a reference string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("invalid reference format")]
    InvalidFormat,

    #[error("invalid reference format: repository name ({0}) must be lowercase")]
    NameNotLowercase(String),

    #[error("repository name must not be more than 255 characters")]
    NameTooLong,

    #[error("invalid repository name ({0}), cannot specify 64-byte hexadecimal strings")]
    HexIdentifier(String),
}

/// A parsed, fully qualified image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    name: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl Reference {
    /// Parse `s` and qualify it with the default registry where needed.
    pub fn parse_normalized(s: &str) -> Result<Self, ReferenceError> {
        if IDENTIFIER_RE.is_match(s) {
            return Err(ReferenceError::HexIdentifier(s.to_string()));
        }

        let (domain, remainder) = split_domain(s);

        let remote_name = match remainder.find(':') {
            Some(sep) => &remainder[..sep],
            None => remainder.as_str(),
        };
        if remote_name.to_lowercase() != remote_name {
            return Err(ReferenceError::NameNotLowercase(remote_name.to_string()));
        }

        Self::parse(&format!("{domain}/{remainder}"))
    }

    /// Parse an already-qualified reference without applying defaults.
    fn parse(s: &str) -> Result<Self, ReferenceError> {
        let caps = REFERENCE_RE
            .captures(s)
            .ok_or(ReferenceError::InvalidFormat)?;

        let name = caps.get(1).map_or("", |m| m.as_str());
        if name.len() > NAME_TOTAL_LENGTH_MAX {
            return Err(ReferenceError::NameTooLong);
        }

        Ok(Self {
            name: name.to_string(),
            tag: caps.get(2).map(|m| m.as_str().to_string()),
            digest: caps.get(3).map(|m| m.as_str().to_string()),
        })
    }

    /// Fully qualified repository name, e.g. `docker.io/library/busybox`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Registry host portion of the name.
    pub fn domain(&self) -> &str {
        self.name.split_once('/').map_or("", |(domain, _)| domain)
    }

    /// Repository path within the registry, e.g. `library/busybox`.
    pub fn path(&self) -> &str {
        self.name.split_once('/').map_or(self.name.as_str(), |(_, path)| path)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

/// Split off the registry host, defaulting to `docker.io`.
fn split_domain(name: &str) -> (String, String) {
    let (mut domain, mut remainder) = match name.split_once('/') {
        Some((first, rest)) if looks_like_domain(first) => (first.to_string(), rest.to_string()),
        _ => (DEFAULT_DOMAIN.to_string(), name.to_string()),
    };
    if domain == LEGACY_DEFAULT_DOMAIN {
        domain = DEFAULT_DOMAIN.to_string();
    }
    if domain == DEFAULT_DOMAIN && !remainder.contains('/') {
        remainder = format!("{OFFICIAL_REPO_PREFIX}{remainder}");
    }
    (domain, remainder)
}

fn looks_like_domain(component: &str) -> bool {
    component.contains(['.', ':'])
        || component == "localhost"
        || component.to_lowercase() != component
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_gets_library_prefix() {
        let r = Reference::parse_normalized("busybox").unwrap();
        assert_eq!(r.name(), "docker.io/library/busybox");
        assert_eq!(r.tag(), None);
        assert_eq!(r.domain(), "docker.io");
        assert_eq!(r.path(), "library/busybox");
    }

    #[test]
    fn name_and_tag_are_split() {
        let r = Reference::parse_normalized("repository_name:tag").unwrap();
        assert_eq!(r.name(), "docker.io/library/repository_name");
        assert_eq!(r.tag(), Some("tag"));
        assert_eq!(r.to_string(), "docker.io/library/repository_name:tag");
    }

    #[test]
    fn user_repo_gets_default_domain_only() {
        let r = Reference::parse_normalized("someone/app:1.0").unwrap();
        assert_eq!(r.name(), "docker.io/someone/app");
        assert_eq!(r.tag(), Some("1.0"));
    }

    #[test]
    fn legacy_index_domain_is_rewritten() {
        let r = Reference::parse_normalized("index.docker.io/busybox").unwrap();
        assert_eq!(r.name(), "docker.io/library/busybox");
    }

    #[test]
    fn registry_with_port_is_kept() {
        let r = Reference::parse_normalized("localhost:5000/team/app:v2").unwrap();
        assert_eq!(r.name(), "localhost:5000/team/app");
        assert_eq!(r.domain(), "localhost:5000");
        assert_eq!(r.tag(), Some("v2"));
    }

    #[test]
    fn custom_registry_without_tag() {
        let r = Reference::parse_normalized("registry.example.com/ops/tool").unwrap();
        assert_eq!(r.name(), "registry.example.com/ops/tool");
        assert_eq!(r.tag(), None);
    }

    #[test]
    fn digest_is_captured() {
        let digest = format!("sha256:{}", "a".repeat(64));
        let r = Reference::parse_normalized(&format!("busybox@{digest}")).unwrap();
        assert_eq!(r.digest(), Some(digest.as_str()));
        assert_eq!(r.tag(), None);
    }

    #[test]
    fn uppercase_repository_is_rejected() {
        let err = Reference::parse_normalized("Busybox:latest").unwrap_err();
        assert_eq!(err, ReferenceError::NameNotLowercase("library/Busybox".to_string()));
    }

    #[test]
    fn uppercase_tag_is_allowed() {
        let r = Reference::parse_normalized("busybox:Latest").unwrap();
        assert_eq!(r.tag(), Some("Latest"));
    }

    #[test]
    fn hex_identifier_is_rejected() {
        let id = "f".repeat(64);
        assert!(matches!(
            Reference::parse_normalized(&id),
            Err(ReferenceError::HexIdentifier(_))
        ));
    }

    #[test]
    fn malformed_references_are_rejected() {
        for input in [
            "",
            ":tag",
            "foo::bar",
            "foo/",
            "-foo",
            "foo:bad tag",
            "foo@sha256:abc",
            "busybox:tägé",
            "busybox:\u{663}",
        ] {
            assert_eq!(
                Reference::parse_normalized(input),
                Err(ReferenceError::InvalidFormat),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn overly_long_name_is_rejected() {
        let long = "a".repeat(300);
        assert_eq!(
            Reference::parse_normalized(&long),
            Err(ReferenceError::NameTooLong)
        );
    }
}
