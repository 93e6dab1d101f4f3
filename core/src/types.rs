//! Shared primitive types used across the entire engine.

/// Stable identifier a source adapter registers under.
pub type SourceId = String;

/// Correlation identifier for a single check (a v4 UUID string).
pub type CheckId = String;

/// Stable ids of the built-in sources.
pub mod source_ids {
    pub const SANCTIONS: &str = "sanctions";
    pub const AML_PEP: &str = "aml_pep";
    pub const CRIMINAL_FRAUD_SITE: &str = "criminal_fraud_site";
    pub const COMMUNITY_FRAUD_DB: &str = "community_fraud_db";
}
