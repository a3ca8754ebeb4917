//! Raw membership observations produced by detectors.
//!
//! A `Candidate` is an unverified, possibly duplicated observation that the
//! subject belongs to some community. Candidates live for exactly one scan
//! cycle: they are clustered into canonical communities and then discarded.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::errors::ValidationError;

/// Authority a subject holds inside a community.
///
/// Variants are declared in ascending authority so the derived `Ord`
/// matches the merge rule: `Creator > Admin > Moderator > Member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Plain membership.
    Member,
    /// Moderation rights.
    Moderator,
    /// Administrative rights.
    Admin,
    /// Founded the community.
    Creator,
}

impl Default for Role {
    fn default() -> Self {
        Self::Member
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
            Self::Creator => "creator",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "member" | "participant" => Some(Self::Member),
            "moderator" | "mod" => Some(Self::Moderator),
            "admin" | "administrator" => Some(Self::Admin),
            "creator" | "owner" | "founder" => Some(Self::Creator),
            _ => None,
        }
    }

    /// Parse a role, falling back to `Member` for anything unrecognized.
    pub fn parse_lenient(s: &str) -> Self {
        Self::from_str(s).unwrap_or_default()
    }

    /// Whether joining with this role counts as creating the community.
    pub fn implies_creation(&self) -> bool {
        matches!(self, Self::Admin | Self::Creator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn deserialize_role_lenient<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().map(Role::parse_lenient).unwrap_or_default())
}

/// Technique a detector used to produce a candidate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DetectionMethod {
    /// A community element found directly in the rendered page.
    DirectDomElement,
    /// A community URL or id found verbatim.
    DirectIdUrl,
    /// A direct platform API lookup.
    GraphqlDirect,
    /// Text patterns such as "I created ...".
    CreationTextPattern,
    /// Text patterns such as "just joined ...".
    JoiningTextPattern,
    /// Hashtag mentions.
    HashtagPattern,
    /// Account mentions.
    MentionPattern,
    /// Inferred from who the subject follows or interacts with.
    SocialGraphInference,
    /// Any other detector-specific tag.
    Custom(String),
}

impl DetectionMethod {
    pub fn as_str(&self) -> &str {
        match self {
            Self::DirectDomElement => "direct_dom_element",
            Self::DirectIdUrl => "direct_id_url",
            Self::GraphqlDirect => "graphql_direct",
            Self::CreationTextPattern => "creation_text_pattern",
            Self::JoiningTextPattern => "joining_text_pattern",
            Self::HashtagPattern => "hashtag_pattern",
            Self::MentionPattern => "mention_pattern",
            Self::SocialGraphInference => "social_graph_inference",
            Self::Custom(tag) => tag,
        }
    }
}

impl From<String> for DetectionMethod {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "direct_dom_element" | "dom" => Self::DirectDomElement,
            "direct_id_url" | "url" => Self::DirectIdUrl,
            "graphql_direct" | "graphql" => Self::GraphqlDirect,
            "creation_text_pattern" => Self::CreationTextPattern,
            "joining_text_pattern" => Self::JoiningTextPattern,
            "hashtag_pattern" | "hashtag" => Self::HashtagPattern,
            "mention_pattern" | "mention" => Self::MentionPattern,
            "social_graph_inference" | "social_graph" => Self::SocialGraphInference,
            _ => Self::Custom(s),
        }
    }
}

impl From<&str> for DetectionMethod {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<DetectionMethod> for String {
    fn from(method: DetectionMethod) -> Self {
        method.as_str().to_string()
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detector observation for one subject in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Candidate {
    /// Detector-specific identifier of the community.
    pub source_id: String,

    /// Community name as the detector saw it.
    pub raw_name: String,

    /// Observed role; unknown strings become `Member`.
    #[serde(default, deserialize_with = "deserialize_role_lenient")]
    pub role: Role,

    /// How the observation was made.
    pub method: DetectionMethod,

    /// Detector's self-reported confidence in [0, 1].
    pub confidence: f64,

    /// When the observation was made.
    pub observed_at: DateTime<Utc>,

    /// Free-form supporting evidence (URL, snippet, selector).
    #[serde(default)]
    pub evidence: String,
}

impl Candidate {
    pub fn new(
        source_id: impl Into<String>,
        raw_name: impl Into<String>,
        role: Role,
        method: impl Into<DetectionMethod>,
        confidence: f64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            raw_name: raw_name.into(),
            role,
            method: method.into(),
            confidence,
            observed_at,
            evidence: String::new(),
        }
    }

    /// Attach evidence text.
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = evidence.into();
        self
    }

    /// Reject structurally malformed candidates.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.source_id.trim().is_empty() {
            return Err(ValidationError::EmptySourceId {
                raw_name: self.raw_name.clone(),
            });
        }
        if self.raw_name.trim().is_empty() {
            return Err(ValidationError::EmptyName {
                source_id: self.source_id.clone(),
            });
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(ValidationError::ConfidenceOutOfRange {
                source_id: self.source_id.clone(),
                value: self.confidence,
            });
        }
        Ok(())
    }
}
