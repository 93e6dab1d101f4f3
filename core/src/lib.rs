//! Due-diligence risk engine.
//!
//! Screens a named subject against independent signal sources (sanctions
//! lists, AML/PEP databases, fraud-report sites, a community fraud
//! database) and folds the results into one explainable verdict.
//!
//! Leaves first:
//!   name_matcher → adapters (sanctions, aml_pep, fraud_report)
//!   → aggregator → report → pipeline

pub mod adapter;
pub mod aggregator;
pub mod aml_pep_source;
pub mod config;
pub mod data_source;
pub mod error;
pub mod event;
pub mod finding;
pub mod fraud_report_source;
pub mod name_matcher;
pub mod pipeline;
pub mod report;
pub mod rng;
pub mod sanctions_source;
pub mod store;
pub mod subject;
pub mod types;
