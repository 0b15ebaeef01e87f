use serde::{Deserialize, Serialize};

use crate::idea::IdeaRecord;
use crate::types::{Axis, DieId, Side};

// ---------------------------------------------------------------------------
// LabelCatalog
// ---------------------------------------------------------------------------

/// The bounded label vocabulary: six labels per axis, one axis per die.
/// Side `n` on a die selects the `n`-th label of that die's axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelCatalog {
    #[serde(default)]
    pub focus_group: Vec<String>,
    #[serde(default)]
    pub topic: Vec<String>,
    #[serde(default)]
    pub medium: Vec<String>,
}

impl LabelCatalog {
    pub fn axis(&self, axis: Axis) -> &[String] {
        match axis {
            Axis::FocusGroup => &self.focus_group,
            Axis::Topic => &self.topic,
            Axis::Medium => &self.medium,
        }
    }

    /// The label a given side selects on a given die, if configured.
    pub fn label_for(&self, die: DieId, side: Side) -> Option<&str> {
        self.axis(die.axis()).get(side.index()).map(String::as_str)
    }

    /// Acceptable labels for a die's axis given its current side: a single
    /// label when the side is known, the whole axis vocabulary when it is
    /// not (the pipeline must never block on an unresolved die).
    pub fn candidates(&self, die: DieId, side: Option<Side>) -> Vec<String> {
        match side.and_then(|s| self.label_for(die, s)) {
            Some(label) => vec![label.to_string()],
            None => self.axis(die.axis()).to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// ParameterQuery / ParameterChoice
// ---------------------------------------------------------------------------

/// Per-axis candidate sets used as the pool query key: a row matches when
/// each of its labels is a member of the corresponding set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterQuery {
    pub focus_groups: Vec<String>,
    pub topics: Vec<String>,
    pub mediums: Vec<String>,
}

impl ParameterQuery {
    pub fn matches(&self, record: &IdeaRecord) -> bool {
        self.focus_groups.contains(&record.focus_group)
            && self.topics.contains(&record.topic)
            && self.mediums.contains(&record.medium)
    }
}

/// One concrete label per axis: the input shape of a generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterChoice {
    pub focus_group: String,
    pub topic: String,
    pub medium: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> LabelCatalog {
        LabelCatalog {
            focus_group: (1..=6).map(|n| format!("group-{n}")).collect(),
            topic: (1..=6).map(|n| format!("topic-{n}")).collect(),
            medium: (1..=6).map(|n| format!("medium-{n}")).collect(),
        }
    }

    #[test]
    fn label_for_maps_side_to_axis_entry() {
        let c = catalog();
        let side = Side::new(3).unwrap();
        assert_eq!(c.label_for(DieId::A, side), Some("group-3"));
        assert_eq!(c.label_for(DieId::B, side), Some("topic-3"));
        assert_eq!(c.label_for(DieId::C, side), Some("medium-3"));
    }

    #[test]
    fn candidates_with_known_side_is_single_label() {
        let c = catalog();
        let got = c.candidates(DieId::A, Side::new(1));
        assert_eq!(got, vec!["group-1".to_string()]);
    }

    #[test]
    fn candidates_without_side_is_whole_axis() {
        let c = catalog();
        let got = c.candidates(DieId::B, None);
        assert_eq!(got.len(), 6);
        assert_eq!(got[0], "topic-1");
    }

    #[test]
    fn candidates_with_unconfigured_side_falls_back_to_axis() {
        let mut c = catalog();
        c.medium.truncate(2);
        // side 5 has no label on a 2-entry axis
        let got = c.candidates(DieId::C, Side::new(5));
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn query_matches_per_axis_membership() {
        let query = ParameterQuery {
            focus_groups: vec!["a".into(), "b".into()],
            topics: vec!["t".into()],
            mediums: vec!["m".into()],
        };
        let record = IdeaRecord {
            idea: "x".into(),
            focus_group: "b".into(),
            topic: "t".into(),
            medium: "m".into(),
            illustration_url: None,
            postcard_url: None,
        };
        assert!(query.matches(&record));

        let other = IdeaRecord {
            focus_group: "c".into(),
            ..record
        };
        assert!(!query.matches(&other));
    }
}
