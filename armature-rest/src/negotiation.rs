//! Content negotiation for REST controllers.
//!
//! A controller is configured with accept criteria mapping media type
//! patterns to a [`Representation`]. The client's `Accept` header is matched
//! against those patterns in preference order.
//!
//! ```
//! use armature_rest::negotiation::{Accept, AcceptCriteria, Representation};
//!
//! let criteria = AcceptCriteria::default();
//!
//! let accept = Accept::parse("text/html;q=0.9, application/hal+json");
//! assert_eq!(criteria.negotiate(&accept), Some(Representation::Hal));
//!
//! assert_eq!(criteria.negotiate(&Accept::parse("text/html")), None);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Content type of HAL documents.
pub const HAL_CONTENT_TYPE: &str = "application/hal+json";

/// Content type of plain JSON documents.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Represents a media type (MIME type) with optional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub type_: String,
    pub subtype: String,
    pub params: HashMap<String, String>,
}

impl MediaType {
    pub fn new(type_: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            subtype: subtype.into(),
            params: HashMap::new(),
        }
    }

    /// Create `*/*` wildcard media type.
    pub fn any() -> Self {
        Self::new("*", "*")
    }

    /// Parse a media type from a string (without quality value).
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split(';');

        let (type_, subtype) = parts.next()?.trim().split_once('/')?;
        let type_ = type_.trim().to_lowercase();
        let subtype = subtype.trim().to_lowercase();
        if type_.is_empty() || subtype.is_empty() {
            return None;
        }

        let mut params = HashMap::new();
        for param in parts {
            if let Some((key, value)) = param.trim().split_once('=') {
                let key = key.trim().to_lowercase();
                if key != "q" {
                    params.insert(key, value.trim().trim_matches('"').to_string());
                }
            }
        }

        Some(Self {
            type_,
            subtype,
            params,
        })
    }

    /// Check if this media type matches another, honouring wildcards and
    /// structured syntax suffixes (`*+json` matches `hal+json`).
    pub fn matches(&self, other: &MediaType) -> bool {
        let type_matches = self.type_ == "*" || other.type_ == "*" || self.type_ == other.type_;
        type_matches && subtype_matches(&self.subtype, &other.subtype)
    }

    pub fn is_any(&self) -> bool {
        self.type_ == "*" && self.subtype == "*"
    }

    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }

    fn specificity(&self) -> u8 {
        let mut score = 0u8;
        if self.type_ != "*" {
            score += 2;
        }
        if self.subtype != "*" {
            score += 1;
        }
        score
    }
}

fn subtype_matches(a: &str, b: &str) -> bool {
    if a == "*" || b == "*" || a == b {
        return true;
    }
    suffix_matches(a, b) || suffix_matches(b, a)
}

fn suffix_matches(pattern: &str, subtype: &str) -> bool {
    match pattern.strip_prefix('*') {
        Some(suffix) if suffix.starts_with('+') => subtype.ends_with(suffix),
        _ => false,
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mime_type())
    }
}

/// Represents a parsed `Accept` header with quality values.
#[derive(Debug, Clone)]
pub struct Accept {
    /// Media ranges with their quality values, most preferred first.
    pub media_types: Vec<(MediaType, f32)>,
}

impl Accept {
    /// An Accept header that accepts anything.
    pub fn any() -> Self {
        Self {
            media_types: vec![(MediaType::any(), 1.0)],
        }
    }

    /// Parse an Accept header string. A blank header accepts anything.
    pub fn parse(header: &str) -> Self {
        let mut media_types: Vec<(MediaType, f32)> = header
            .split(',')
            .filter_map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    return None;
                }
                let (media_part, quality) = Self::extract_quality(part);
                MediaType::parse(media_part).map(|mt| (mt, quality))
            })
            .collect();

        if media_types.is_empty() && header.trim().is_empty() {
            return Self::any();
        }

        // Sort by quality (highest first), then by specificity
        media_types.sort_by(|a, b| match b.1.partial_cmp(&a.1) {
            Some(Ordering::Equal) | None => b.0.specificity().cmp(&a.0.specificity()),
            Some(ord) => ord,
        });

        Self { media_types }
    }

    /// Parse an optional header; a missing header accepts anything.
    pub fn from_header(header: Option<&str>) -> Self {
        header.map(Self::parse).unwrap_or_else(Self::any)
    }

    fn extract_quality(s: &str) -> (&str, f32) {
        if let Some(q_pos) = s.to_lowercase().find(";q=") {
            let quality = s[q_pos + 3..]
                .split(';')
                .next()
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0)
                .clamp(0.0, 1.0);
            (&s[..q_pos], quality)
        } else {
            (s, 1.0)
        }
    }

    /// Acceptable media ranges, most preferred first.
    pub fn acceptable(&self) -> impl Iterator<Item = &MediaType> {
        self.media_types
            .iter()
            .filter(|(_, quality)| *quality > 0.0)
            .map(|(mt, _)| mt)
    }
}

impl Default for Accept {
    fn default() -> Self {
        Self::any()
    }
}

/// How a controller renders its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    /// HAL documents with `_links` and `_embedded`.
    Hal,
    /// Plain JSON without hypermedia.
    Json,
}

impl Representation {
    pub fn content_type(&self) -> &'static str {
        match self {
            Representation::Hal => HAL_CONTENT_TYPE,
            Representation::Json => JSON_CONTENT_TYPE,
        }
    }
}

/// Media type patterns served with one representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptCriterion {
    pub representation: Representation,
    pub media_types: Vec<String>,
}

impl AcceptCriterion {
    pub fn new<I, S>(representation: Representation, media_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            representation,
            media_types: media_types.into_iter().map(Into::into).collect(),
        }
    }

    fn patterns(&self) -> impl Iterator<Item = MediaType> + '_ {
        self.media_types.iter().filter_map(|s| MediaType::parse(s))
    }
}

/// Ordered accept criteria of a controller.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptCriteria {
    criteria: Vec<AcceptCriterion>,
}

impl AcceptCriteria {
    pub fn new(criteria: Vec<AcceptCriterion>) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &[AcceptCriterion] {
        &self.criteria
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Pick the representation for the client's most preferred acceptable
    /// media range; `None` means nothing offered is acceptable.
    pub fn negotiate(&self, accept: &Accept) -> Option<Representation> {
        accept.acceptable().find_map(|range| {
            self.criteria
                .iter()
                .find(|criterion| criterion.patterns().any(|pattern| range.matches(&pattern)))
                .map(|criterion| criterion.representation)
        })
    }
}

impl Default for AcceptCriteria {
    fn default() -> Self {
        Self::new(default_criteria())
    }
}

/// HAL for any JSON media type.
pub fn default_criteria() -> Vec<AcceptCriterion> {
    vec![AcceptCriterion::new(
        Representation::Hal,
        ["*/json", "*/*+json"],
    )]
}
