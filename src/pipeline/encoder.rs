//! One-hot and multi-hot encoding of the categorical attributes.

use super::assembler::FeatureSchema;
use std::collections::BTreeSet;
use tracing::debug;

/// Value that studios outside the Top-N allowlist collapse into.
pub const OTHER_STUDIO: &str = "Other";

/// How categorical variables are turned into indicator columns.
///
/// With `drop_first` a variable whose value is the reference level produces
/// no indicator. The reference level is the one sorting before every level
/// the schema knows for that variable, which is the level training-time
/// dummy encoding dropped. Either way the assembled vector is the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OneHotPolicy {
    pub drop_first: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoricalVariable {
    Type,
    Source,
    Studios,
}

impl CategoricalVariable {
    pub const ALL: [CategoricalVariable; 3] = [
        CategoricalVariable::Type,
        CategoricalVariable::Source,
        CategoricalVariable::Studios,
    ];

    /// Column prefix used by the trained model.
    pub fn prefix(&self) -> &'static str {
        match self {
            CategoricalVariable::Type => "Type",
            CategoricalVariable::Source => "Source",
            CategoricalVariable::Studios => "Studios",
        }
    }

    pub fn column(&self, value: &str) -> String {
        format!("{}_{}", self.prefix(), value)
    }

    fn index(&self) -> usize {
        match self {
            CategoricalVariable::Type => 0,
            CategoricalVariable::Source => 1,
            CategoricalVariable::Studios => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    pub columns: Vec<(String, f64)>,
    /// Whether the studio was replaced by [`OTHER_STUDIO`].
    pub studio_collapsed: bool,
}

#[derive(Debug, Clone)]
pub struct CategoricalEncoder {
    top_studios: BTreeSet<String>,
    genre_classes: Vec<String>,
    policy: OneHotPolicy,
    // Lowest level the schema knows, per variable.
    first_known_levels: [Option<String>; 3],
}

impl CategoricalEncoder {
    pub fn new(
        top_studios: BTreeSet<String>,
        genre_classes: Vec<String>,
        schema: &FeatureSchema,
        policy: OneHotPolicy,
    ) -> Self {
        let first_known_levels =
            CategoricalVariable::ALL.map(|v| schema.levels(v.prefix()).min().map(String::from));
        CategoricalEncoder {
            top_studios,
            genre_classes,
            policy,
            first_known_levels,
        }
    }

    pub fn policy(&self) -> OneHotPolicy {
        self.policy
    }

    pub fn genre_classes(&self) -> &[String] {
        &self.genre_classes
    }

    /// Replaces studios outside the allowlist with [`OTHER_STUDIO`].
    pub fn collapse_studio<'a>(&self, studio: &'a str) -> &'a str {
        if self.top_studios.contains(studio) {
            studio
        } else {
            OTHER_STUDIO
        }
    }

    fn is_reference_level(&self, variable: CategoricalVariable, value: &str) -> bool {
        match &self.first_known_levels[variable.index()] {
            Some(first) => value < first.as_str(),
            None => true,
        }
    }

    /// One indicator column per variable, unless dropped by the policy.
    pub fn one_hot(&self, kind: &str, source: &str, studio: &str) -> Vec<(String, f64)> {
        let values = [kind, source, studio];
        CategoricalVariable::ALL
            .into_iter()
            .zip(values)
            .filter(|(variable, value)| {
                !(self.policy.drop_first && self.is_reference_level(*variable, value))
            })
            .map(|(variable, value)| (variable.column(value), 1.0))
            .collect()
    }

    /// One column per genre class, 1 for every class present in `genres`.
    pub fn multi_hot(&self, genres: &[String]) -> Vec<(String, f64)> {
        for genre in genres {
            if !self.genre_classes.contains(genre) {
                debug!("Ignoring genre \"{}\" unknown to the genre encoder", genre);
            }
        }
        self.genre_classes
            .iter()
            .map(|class| {
                let present = genres.iter().any(|g| g == class);
                (class.clone(), if present { 1.0 } else { 0.0 })
            })
            .collect()
    }

    /// Encodes the categorical attributes and the already bucketized genres.
    pub fn encode(&self, kind: &str, source: &str, studio: &str, genres: &[String]) -> EncodedRow {
        let collapsed = self.collapse_studio(studio);
        let mut columns = self.one_hot(kind, source, collapsed);
        columns.extend(self.multi_hot(genres));
        EncodedRow {
            columns,
            studio_collapsed: collapsed != studio,
        }
    }
}
