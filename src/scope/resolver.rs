//! Resource Group Scope Resolver
//!
//! Turns a connection's `resource_group` / `resource_groups` settings into the
//! concrete set of resource groups a per-group collector should iterate.

use super::glob::{has_wildcard, GlobPattern};
use super::resource_id::resource_group_from_id;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::future::Future;
use tokio::sync::OnceCell;

/// Pattern meaning "every resource group"
const ALL_GROUPS: &str = "*";

/// Resource group filter as configured on a connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroupFilterConfig {
    #[serde(default)]
    pub resource_group: Option<String>,
    /// Glob patterns; takes precedence over `resource_group` when non-empty
    #[serde(default)]
    pub resource_groups: Vec<String>,
}

impl ResourceGroupFilterConfig {
    /// Configured patterns with blanks dropped
    fn patterns(&self) -> Vec<&str> {
        self.resource_groups
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// Lower-cased, de-duplicated resource group names.
///
/// Empty means no resource-group filtering at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedScope {
    groups: BTreeSet<String>,
}

impl ResolvedScope {
    fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let groups = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        Self { groups }
    }

    /// True when every resource group is implicitly in scope
    pub fn is_unrestricted(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains(&name.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|s| s.as_str())
    }

    /// Whether a row with this resource ID belongs in the query's output
    pub fn admits_resource_id(&self, id: &str) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        resource_group_from_id(id).is_some_and(|rg| self.groups.contains(&rg))
    }

    pub fn into_vec(self) -> Vec<String> {
        self.groups.into_iter().collect()
    }
}

/// Resolve the effective resource groups for a connection.
///
/// `list_all_groups` is only invoked when a pattern contains a wildcard, and
/// then exactly once no matter how many patterns there are. Its error is
/// returned unchanged.
pub async fn resolve<F, Fut, E>(
    config: &ResourceGroupFilterConfig,
    list_all_groups: F,
) -> Result<ResolvedScope, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<String>, E>>,
{
    let patterns = config.patterns();

    if patterns.is_empty() {
        let scope = match config.resource_group.as_deref() {
            Some(rg) => ResolvedScope::from_names([rg]),
            None => ResolvedScope::default(),
        };
        tracing::debug!("Resource group scope from single filter: {:?}", scope);
        return Ok(scope);
    }

    if !patterns.iter().any(|p| has_wildcard(p)) {
        tracing::debug!("Resource group scope from literal names: {:?}", patterns);
        return Ok(ResolvedScope::from_names(patterns));
    }

    let all = ResolvedScope::from_names(list_all_groups().await?);
    tracing::debug!(
        "Listed {} resource groups for {} patterns",
        all.len(),
        patterns.len()
    );

    let mut matched = BTreeSet::new();
    for pattern in patterns {
        if pattern == ALL_GROUPS {
            return Ok(all);
        }

        if !has_wildcard(pattern) {
            let name = pattern.to_lowercase();
            if all.groups.contains(&name) {
                matched.insert(name);
            }
            continue;
        }

        let glob = match GlobPattern::new(pattern) {
            Ok(glob) => glob,
            Err(e) => {
                tracing::warn!("Ignoring unusable resource group pattern {:?}: {}", pattern, e);
                continue;
            }
        };
        matched.extend(all.iter().filter(|g| glob.matches(g)).map(String::from));
    }

    Ok(ResolvedScope { groups: matched })
}

/// Per-query memo of a connection's resolved scope.
///
/// Every collector in one query shares this, so the group listing happens at
/// most once however many collectors ask concurrently. A failed resolution is
/// not cached.
#[derive(Debug, Default)]
pub struct QueryScope {
    cell: OnceCell<ResolvedScope>,
}

impl QueryScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve on first call; later and concurrent callers get the same scope
    pub async fn resolve<F, Fut, E>(
        &self,
        config: &ResourceGroupFilterConfig,
        list_all_groups: F,
    ) -> Result<&ResolvedScope, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>, E>>,
    {
        self.cell
            .get_or_try_init(|| resolve(config, list_all_groups))
            .await
    }

    pub fn get(&self) -> Option<&ResolvedScope> {
        self.cell.get()
    }
}
