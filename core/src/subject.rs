//! Subject intake — the individual or entity being screened.
//!
//! RULE: A Subject only exists after intake validation succeeded.
//! It is immutable for the lifetime of one check.

use crate::error::{CheckError, CheckResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Raw intake payload, as received from a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectRequest {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

impl SubjectRequest {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_jurisdiction(mut self, jurisdiction: impl Into<String>) -> Self {
        self.jurisdiction = Some(jurisdiction.into());
        self
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }
}

/// Serialised in intake form, so deserialising runs the same validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SubjectRequest", into = "SubjectRequest")]
pub struct Subject {
    primary_name: String,
    aliases: BTreeSet<String>,
    jurisdiction: Option<String>,
    industry: Option<String>,
}

impl Subject {
    /// Validate an intake request. Rejects empty or whitespace-only names
    /// before any source is consulted.
    pub fn from_request(request: SubjectRequest) -> CheckResult<Self> {
        let primary_name = request.name.trim().to_string();
        if primary_name.is_empty() {
            return Err(CheckError::Validation(
                "subject name must not be empty".into(),
            ));
        }

        let aliases = request
            .aliases
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty() && *a != primary_name)
            .map(str::to_string)
            .collect();

        Ok(Self {
            primary_name,
            aliases,
            jurisdiction: non_blank(request.jurisdiction).map(|j| j.to_uppercase()),
            industry: non_blank(request.industry).map(|i| i.to_lowercase()),
        })
    }

    pub fn primary_name(&self) -> &str {
        &self.primary_name
    }

    pub fn aliases(&self) -> &BTreeSet<String> {
        &self.aliases
    }

    pub fn jurisdiction(&self) -> Option<&str> {
        self.jurisdiction.as_deref()
    }

    pub fn industry(&self) -> Option<&str> {
        self.industry.as_deref()
    }

    /// Primary name followed by every alias.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

impl TryFrom<SubjectRequest> for Subject {
    type Error = CheckError;

    fn try_from(request: SubjectRequest) -> CheckResult<Self> {
        Self::from_request(request)
    }
}

impl From<Subject> for SubjectRequest {
    fn from(subject: Subject) -> Self {
        Self {
            name: subject.primary_name,
            aliases: subject.aliases.into_iter().collect(),
            jurisdiction: subject.jurisdiction,
            industry: subject.industry,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
