//! Permission set for external-provider tools.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Mapping from provider id to the tool names the request may use.
///
/// This is the security boundary for remote tools: a tool is usable only
/// when both its provider id and its name are listed. A request without a
/// set gets no external-provider tools at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowedProviderSet {
    providers: BTreeMap<String, BTreeSet<String>>,
}

impl AllowedProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Permit one tool of one provider (builder pattern)
    pub fn allow(mut self, provider_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        self.providers
            .entry(provider_id.into())
            .or_default()
            .insert(tool_name.into());
        self
    }

    /// Permit several tools of one provider (builder pattern)
    pub fn allow_all<I, S>(mut self, provider_id: impl Into<String>, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.providers.entry(provider_id.into()).or_default();
        entry.extend(tools.into_iter().map(Into::into));
        self
    }

    pub fn permits(&self, provider_id: &str, tool_name: &str) -> bool {
        self.providers
            .get(provider_id)
            .is_some_and(|tools| tools.contains(tool_name))
    }

    pub fn provider_ids(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.providers.values().all(|tools| tools.is_empty())
    }
}
