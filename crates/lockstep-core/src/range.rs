//! npm dependency range handling
//!
//! Package manifests use npm range syntax, which differs from Cargo's in a few
//! places: `||` alternatives, whitespace separated comparators, hyphen ranges
//! and bare versions meaning exact matches. [`NpmRange`] translates a range
//! into one [`semver::VersionReq`] per alternative.

use semver::{Version, VersionReq};

use crate::error::{LockstepError, Result, VersionError};

/// Prerelease tag appended to local versions before a range check
pub const SYNTHETIC_PRERELEASE: &str = "z";

/// A parsed npm dependency range
#[derive(Debug, Clone)]
pub struct NpmRange {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl NpmRange {
    /// Parse an npm range
    pub fn parse(range: &str) -> Result<Self> {
        let alternatives = range
            .split("||")
            .map(|alt| translate_alternative(alt.trim()))
            .map(|req| {
                VersionReq::parse(&req).map_err(|e| {
                    LockstepError::from(VersionError::RangeParseFailed(
                        range.to_string(),
                        e.to_string(),
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw: range.to_string(),
            alternatives,
        })
    }

    /// The range as written in the manifest
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check whether a version satisfies any alternative
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// Highest version out of `candidates` that satisfies the range
    pub fn max_satisfying<'a, I>(&self, candidates: I) -> Option<Version>
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates
            .into_iter()
            .filter_map(|v| Version::parse(v).ok())
            .filter(|v| self.matches(v))
            .max()
    }

    /// Whether any comparator carries a prerelease tag (`^1.2.0-0`)
    pub fn has_prerelease(&self) -> bool {
        self.alternatives
            .iter()
            .flat_map(|req| req.comparators.iter())
            .any(|c| !c.pre.is_empty())
    }

    /// Versions named by prerelease comparators, without their prerelease tag
    pub fn prerelease_bases(&self) -> Vec<Version> {
        self.alternatives
            .iter()
            .flat_map(|req| req.comparators.iter())
            .filter(|c| !c.pre.is_empty())
            .map(|c| Version::new(c.major, c.minor.unwrap_or(0), c.patch.unwrap_or(0)))
            .collect()
    }
}

impl std::fmt::Display for NpmRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Check whether a local version satisfies `range` once a synthetic
/// prerelease tag is appended.
///
/// `1.2.0` becomes `1.2.0-z`, which matches `^1.2.0-0` but not `^1.2.0`: a
/// prerelease candidate only matches a comparator on the same
/// `major.minor.patch` that carries a prerelease itself. Local versions that
/// already carry a prerelease are tested as they are.
pub fn satisfies_prerelease_tolerant(version: &str, range: &str) -> Result<bool> {
    let mut candidate = Version::parse(version)
        .map_err(|e| VersionError::ParseFailed(version.to_string(), e.to_string()))?;
    if candidate.pre.is_empty() {
        candidate.pre = semver::Prerelease::new(SYNTHETIC_PRERELEASE)
            .map_err(|e| VersionError::ParseFailed(version.to_string(), e.to_string()))?;
    }
    Ok(NpmRange::parse(range)?.matches(&candidate))
}

fn translate_alternative(alt: &str) -> String {
    if alt.is_empty() || matches!(alt, "*" | "x" | "X" | "latest") {
        return "*".to_string();
    }

    if let Some((low, high)) = alt.split_once(" - ") {
        return format!(">={}, <={}", strip_v(low.trim()), strip_v(high.trim()));
    }

    let mut comparators = Vec::new();
    let mut pending_op = String::new();
    for token in alt.split_whitespace() {
        if token.chars().all(is_op_char) {
            pending_op.push_str(token);
            continue;
        }
        let token = format!("{}{}", std::mem::take(&mut pending_op), token);
        comparators.push(translate_comparator(&token));
    }

    comparators.join(", ")
}

fn translate_comparator(token: &str) -> String {
    let split = token.find(|c: char| !is_op_char(c)).unwrap_or(token.len());
    let (op, version) = token.split_at(split);
    let version = strip_v(version);

    if !op.is_empty() {
        return format!("{}{}", op, version);
    }

    let core = version.split(['-', '+']).next().unwrap_or(version);
    let parts: Vec<&str> = core.split('.').collect();
    let is_wildcard = parts.iter().any(|p| matches!(*p, "x" | "X" | "*"));

    match parts.len() {
        3 if !is_wildcard => format!("={}", version),
        1 | 2 if !is_wildcard => format!("{}.*", core),
        _ => version.to_string(),
    }
}

fn is_op_char(c: char) -> bool {
    matches!(c, '<' | '>' | '=' | '~' | '^')
}

fn strip_v(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('='))
        .unwrap_or(version)
}
