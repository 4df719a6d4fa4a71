//! Local, deterministic article extraction.
//!
//! Two tiers run in order: a site rule for known publishers, then generic
//! Readability-style scoring. Neither touches the network, so both are safe to
//! run on a blocking thread.

pub mod generic;
pub mod site_rules;

pub use generic::{GENERIC_SELECTORS, GenericConfig};
pub use site_rules::{SITE_RULES, SiteRule, apply_rule, rule_for_host};

use crate::article::{ArticleRecord, PageContext};

/// Tier one: the site rule for the page host, if one exists and finds enough text.
pub fn extract_site_specific(page: &PageContext, min_length: usize) -> Option<ArticleRecord> {
    let host = page.host()?;
    let rule = rule_for_host(&host)?;
    tracing::debug!(rule = rule.name, %host, "applying site rule");

    apply_rule(rule, page).filter(|record| !record.is_empty_for(min_length))
}

/// Tier two: generic scoring with default weights.
pub fn extract_generic(page: &PageContext, min_length: usize) -> Option<ArticleRecord> {
    generic::extract_generic(page, min_length, &GenericConfig::default())
}

/// Site rule first, generic scoring second.
pub fn extract_heuristic(page: &PageContext, min_length: usize) -> Option<ArticleRecord> {
    extract_site_specific(page, min_length).or_else(|| extract_generic(page, min_length))
}
