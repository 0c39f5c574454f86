//! Named constraints of the summary store schema.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Constraint of the summary store schema rejected a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(into = "String", try_from = "String")]
pub enum ConstraintViolation {
    #[strum(serialize = "pipeline_build_summaries_pkey")]
    SummaryPrimaryKey,
    #[strum(serialize = "pipeline_build_summaries_pipeline_id_not_empty")]
    SummaryPipelineIdNotEmpty,
    #[strum(serialize = "pipeline_build_summaries_counters_non_negative")]
    SummaryCountersNonNegative,
}

/// Kind of rule a constraint enforces.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintCategory {
    /// Format or range checks.
    Validation,
    /// Primary keys and unique indexes.
    Uniqueness,
}

impl ConstraintViolation {
    /// Parses a constraint name reported by the database.
    pub fn new(constraint: &str) -> Option<Self> {
        constraint.parse().ok()
    }

    /// Returns the table the constraint belongs to.
    pub fn table_name(&self) -> &'static str {
        "pipeline_build_summaries"
    }

    /// Returns the kind of rule the constraint enforces.
    pub fn categorize(&self) -> ConstraintCategory {
        match self {
            Self::SummaryPrimaryKey => ConstraintCategory::Uniqueness,
            Self::SummaryPipelineIdNotEmpty | Self::SummaryCountersNonNegative => {
                ConstraintCategory::Validation
            }
        }
    }
}

impl From<ConstraintViolation> for String {
    #[inline]
    fn from(val: ConstraintViolation) -> Self {
        val.to_string()
    }
}

impl TryFrom<String> for ConstraintViolation {
    type Error = strum::ParseError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn parses_known_constraints() {
        for violation in ConstraintViolation::iter() {
            assert_eq!(ConstraintViolation::new(&violation.to_string()), Some(violation));
            assert_eq!(violation.table_name(), "pipeline_build_summaries");
        }
        assert_eq!(ConstraintViolation::new("other_pkey"), None);
    }

    #[test]
    fn categories() {
        assert_eq!(
            ConstraintViolation::SummaryPrimaryKey.categorize(),
            ConstraintCategory::Uniqueness
        );
        assert_eq!(
            ConstraintViolation::SummaryCountersNonNegative.categorize(),
            ConstraintCategory::Validation
        );
    }
}
