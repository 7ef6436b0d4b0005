//! Image locators and scheme classification
//!
//! A locator is the opaque string a caller hands to the loader. It doubles as
//! the cache key. Its scheme is classified once, by prefix, into [`Scheme`]
//! and the resolver dispatches on that tag.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Where the bytes behind a locator come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// `content://authority/path`, `file://path` or a bare absolute path
    ContentOrFile,
    /// `resource://package/type/name.ext`, an application-bundled image
    EmbeddedResource,
    /// `http://` or `https://`
    Network,
    /// Anything else; resolves to no stream
    Unknown,
}

impl Scheme {
    pub const CONTENT_PREFIX: &'static str = "content://";
    pub const FILE_PREFIX: &'static str = "file://";
    pub const RESOURCE_PREFIX: &'static str = "resource://";

    /// Classify a locator string by its prefix
    pub fn classify(locator: &str) -> Self {
        let trimmed = locator.trim();
        if trimmed.is_empty() {
            return Self::Unknown;
        }
        if trimmed.starts_with('/') {
            return Self::ContentOrFile;
        }

        let Some((scheme, _)) = trimmed.split_once("://") else {
            return Self::Unknown;
        };

        match scheme.to_ascii_lowercase().as_str() {
            "content" | "file" => Self::ContentOrFile,
            "resource" => Self::EmbeddedResource,
            "http" | "https" => Self::Network,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContentOrFile => "content",
            Self::EmbeddedResource => "resource",
            Self::Network => "network",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable, cheaply cloneable image locator
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator(Arc<str>);

impl Locator {
    /// Build a locator, returning `None` for absent or blank input
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let raw = raw?.trim();
        if raw.is_empty() {
            None
        } else {
            Some(Self(Arc::from(raw)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn scheme(&self) -> Scheme {
        Scheme::classify(&self.0)
    }

    /// Bundled resource name for a `resource://` locator
    pub fn resource_name(&self) -> String {
        resource_name(&self.0)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Locator {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Locator {
    fn from(value: &str) -> Self {
        Self(Arc::from(value.trim()))
    }
}

impl From<String> for Locator {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

/// Derive a bundled resource name from a locator: final path segment, file
/// extension stripped, lowercased, and every character outside `[a-z0-9_]`
/// replaced by `_`.
pub fn resource_name(locator: &str) -> String {
    let without_query = locator
        .split(['?', '#'])
        .next()
        .unwrap_or(locator)
        .trim_end_matches('/');
    let segment = without_query.rsplit('/').next().unwrap_or(without_query);
    let stem = match segment.rfind('.') {
        Some(idx) if idx > 0 => &segment[..idx],
        _ => segment,
    };

    stem.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("content://media/external/images/42", Scheme::ContentOrFile)]
    #[case("file:///sdcard/DCIM/photo.jpg", Scheme::ContentOrFile)]
    #[case("/var/lib/images/photo.jpg", Scheme::ContentOrFile)]
    #[case("resource://app/drawable/logo.png", Scheme::EmbeddedResource)]
    #[case("RESOURCE://app/drawable/logo.png", Scheme::EmbeddedResource)]
    #[case("http://example.com/a.png", Scheme::Network)]
    #[case("https://example.com/a.png", Scheme::Network)]
    #[case("ftp://example.com/a.png", Scheme::Unknown)]
    #[case("just-a-name.png", Scheme::Unknown)]
    #[case("", Scheme::Unknown)]
    fn test_classify(#[case] locator: &str, #[case] expected: Scheme) {
        assert_eq!(Scheme::classify(locator), expected);
    }

    #[rstest]
    #[case("resource://app/drawable/logo.png", "logo")]
    #[case("resource://app/drawable/Channel-Logo.PNG", "channel_logo")]
    #[case("resource://app/drawable/sport 24 hd.webp", "sport_24_hd")]
    #[case("resource://app/drawable/archive.tar.gz", "archive_tar")]
    #[case("resource://app/drawable/noext", "noext")]
    #[case("resource://app/drawable/icon.png?v=2", "icon")]
    #[case("resource://app/drawable/.hidden", "_hidden")]
    fn test_resource_name(#[case] locator: &str, #[case] expected: &str) {
        assert_eq!(resource_name(locator), expected);
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(Locator::parse(None).is_none());
        assert!(Locator::parse(Some("")).is_none());
        assert!(Locator::parse(Some("   ")).is_none());
        assert_eq!(
            Locator::parse(Some(" http://a/b.png ")).unwrap().as_str(),
            "http://a/b.png"
        );
    }
}
