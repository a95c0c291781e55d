//! Per-table outcomes of a replication run

use std::fmt;

use crate::extract::ExtractSummary;

/// Result of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    /// Every row was written and the destination marked complete
    Loaded(ExtractSummary),
    /// The source refuses queries on this table
    NotQueryable,
    /// Reading failed; the message names the cause
    Failed(String),
}

impl TableOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

impl fmt::Display for TableOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded(summary) => write!(f, "loaded {} rows in {} batches", summary.rows, summary.batches),
            Self::NotQueryable => f.write_str("not queryable"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Outcomes in the order tables were attempted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicationReport {
    outcomes: Vec<(String, TableOutcome)>,
}

impl ReplicationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, table: impl Into<String>, outcome: TableOutcome) {
        self.outcomes.push((table.into(), outcome));
    }

    pub fn outcomes(&self) -> &[(String, TableOutcome)] {
        &self.outcomes
    }

    pub fn outcome(&self, table: &str) -> Option<&TableOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, outcome)| outcome)
    }

    pub fn loaded(&self) -> Vec<&str> {
        self.tables_where(|o| o.is_loaded())
    }

    pub fn not_queryable(&self) -> Vec<&str> {
        self.tables_where(|o| matches!(o, TableOutcome::NotQueryable))
    }

    pub fn failed(&self) -> Vec<&str> {
        self.tables_where(|o| matches!(o, TableOutcome::Failed(_)))
    }

    /// Mandatory tables whose read failed, in attempt order
    ///
    /// A table the source refuses to query is recorded, never escalated.
    pub fn failed_mandatory<S: AsRef<str>>(&self, mandatory: &[S]) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|(name, outcome)| {
                matches!(outcome, TableOutcome::Failed(_))
                    && mandatory.iter().any(|m| m.as_ref() == name.as_str())
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    fn tables_where(&self, pred: impl Fn(&TableOutcome) -> bool) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| pred(outcome))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ReplicationReport {
        let mut report = ReplicationReport::new();
        report.record("Account", TableOutcome::Loaded(ExtractSummary { rows: 3, batches: 1 }));
        report.record("Contact", TableOutcome::Failed("timeout".into()));
        report.record("Vote", TableOutcome::NotQueryable);
        report
    }

    #[test]
    fn test_partitions() {
        let report = report();
        assert_eq!(report.len(), 3);
        assert_eq!(report.loaded(), vec!["Account"]);
        assert_eq!(report.failed(), vec!["Contact"]);
        assert_eq!(report.not_queryable(), vec!["Vote"]);
        assert_eq!(report.outcome("Contact"), Some(&TableOutcome::Failed("timeout".into())));
        assert_eq!(report.outcome("Lead"), None);
    }

    #[test]
    fn test_failed_mandatory() {
        let report = report();
        assert!(report.failed_mandatory(&["Account"]).is_empty());
        assert_eq!(report.failed_mandatory(&["Account", "Contact"]), vec!["Contact"]);
        assert!(report.failed_mandatory(&["Vote"]).is_empty());
        assert_eq!(report.failed_mandatory(&["Vote", "Contact"]), vec!["Contact"]);
        assert!(report.failed_mandatory::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(
            TableOutcome::Loaded(ExtractSummary { rows: 10, batches: 2 }).to_string(),
            "loaded 10 rows in 2 batches"
        );
        assert_eq!(TableOutcome::Failed("x".into()).to_string(), "failed: x");
    }
}
