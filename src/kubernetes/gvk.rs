//! apiVersion parsing and validation.

use crate::error::{Error, Result};

/// A parsed apiVersion: `"v1"` is the legacy core API (empty group),
/// `"apps/v1"` and friends are named groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupVersion {
    pub group: String,
    pub version: String,
}

impl GroupVersion {
    /// Parse an apiVersion string into group and version.
    ///
    /// A single segment means the legacy core API; two segments are
    /// `group/version`. Anything else (empty input, blank segments, more
    /// than one `/`) is a hard error rather than a silent default.
    pub fn parse(api_version: &str) -> Result<Self> {
        let trimmed = api_version.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidGroupVersion(api_version.to_string()));
        }

        let parts: Vec<&str> = trimmed.split('/').collect();
        let (group, version) = match parts.as_slice() {
            [version] => ("", version.trim()),
            [group, version] => (group.trim(), version.trim()),
            _ => return Err(Error::InvalidGroupVersion(api_version.to_string())),
        };

        // The core group is legitimately empty, but a version must always
        // be present, and "group/" or "/v1" are malformed.
        if version.is_empty() || (parts.len() == 2 && group.is_empty()) {
            return Err(Error::InvalidGroupVersion(api_version.to_string()));
        }

        Ok(Self {
            group: group.to_string(),
            version: version.to_string(),
        })
    }

    /// True for the legacy core API served under `/api/v1`
    pub fn is_core(&self) -> bool {
        self.group.is_empty()
    }

    /// Reassemble the apiVersion string (e.g. "v1", "apps/v1")
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}
