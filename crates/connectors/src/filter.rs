//! Table selection for multi-table sources

use std::collections::{BTreeSet, HashSet};

use arrival_config::SalesforceSourceConfig;

/// Salesforce objects that fail to load even when reported queryable
///
/// They need filters on every query, are event streams, or require
/// permissions a replication user does not have.
pub const RECOMMENDED_EXCLUDED_TABLES: &[&str] = &[
    "AppTabMember",
    "ColorDefinition",
    "ContentDocumentLink",
    "ContentFolderItem",
    "ContentFolderMember",
    "DataStatistics",
    "DataType",
    "DatacloudAddress",
    "DatacloudCompany",
    "DatacloudContact",
    "DatacloudDandBCompany",
    "EntityParticle",
    "FieldDefinition",
    "FlexQueueItem",
    "FlowVariableView",
    "FlowVersionView",
    "IconDefinition",
    "IdeaComment",
    "ListViewChartInstance",
    "OutgoingEmail",
    "OutgoingEmailRelation",
    "OwnerChangeOptionInfo",
    "PicklistValueInfo",
    "PlatformAction",
    "RelationshipDomain",
    "RelationshipInfo",
    "SearchLayout",
    "SiteDetail",
    "UserEntityAccess",
    "UserFieldAccess",
    "UserRecordAccess",
    "Vote",
];

/// Allowlist, denylist and recommended exclusions
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    allowlist: Option<HashSet<String>>,
    denylist: HashSet<String>,
    exclude_recommended: bool,
}

impl TableFilter {
    /// Filter that keeps every table
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SalesforceSourceConfig) -> Self {
        Self {
            allowlist: config
                .table_allowlist
                .as_ref()
                .map(|tables| tables.iter().cloned().collect()),
            denylist: config.table_denylist.iter().cloned().collect(),
            exclude_recommended: !config.ignore_recommended_excluded_tables,
        }
    }

    pub fn with_allowlist<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowlist = Some(tables.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_denylist<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denylist = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_recommended_exclusions(mut self, exclude: bool) -> Self {
        self.exclude_recommended = exclude;
        self
    }

    /// Whether a single table passes
    pub fn allows(&self, table: &str) -> bool {
        if let Some(allow) = &self.allowlist
            && !allow.contains(table)
        {
            return false;
        }
        if self.denylist.contains(table) {
            return false;
        }
        !(self.exclude_recommended && RECOMMENDED_EXCLUDED_TABLES.contains(&table))
    }

    /// Passing tables, sorted and deduplicated
    pub fn apply<I>(&self, tables: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        tables
            .into_iter()
            .filter(|t| self.allows(t))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_recommended_exclusions_by_default_from_config() {
        let filter = TableFilter::from_config(&SalesforceSourceConfig::default());
        let kept = filter.apply(tables(&["Contact", "Vote", "Account", "FieldDefinition"]));
        assert_eq!(kept, vec!["Account", "Contact"]);
    }

    #[test]
    fn test_ignore_recommended_exclusions() {
        let config = SalesforceSourceConfig {
            ignore_recommended_excluded_tables: true,
            ..Default::default()
        };
        let kept = TableFilter::from_config(&config).apply(tables(&["Vote", "Account"]));
        assert_eq!(kept, vec!["Account", "Vote"]);
    }

    #[test]
    fn test_allowlist_then_denylist() {
        let filter = TableFilter::new()
            .with_allowlist(["Account", "Contact", "Lead"])
            .with_denylist(["Lead"]);
        let kept = filter.apply(tables(&["Lead", "Opportunity", "Contact", "Account"]));
        assert_eq!(kept, vec!["Account", "Contact"]);
    }

    #[test]
    fn test_output_sorted_and_deduplicated() {
        let kept = TableFilter::new().apply(tables(&["b", "a", "b"]));
        assert_eq!(kept, vec!["a", "b"]);
    }

    #[test]
    fn test_exclusion_list_is_sorted() {
        let mut sorted = RECOMMENDED_EXCLUDED_TABLES.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, RECOMMENDED_EXCLUDED_TABLES);
    }
}
