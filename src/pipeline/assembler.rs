//! Feature vector assembly against the trained model's column schema.

use anyhow::{bail, Result};
use std::collections::HashMap;

pub const EPISODES_COLUMN: &str = "Episodes";
pub const DURATION_COLUMN: &str = "duration_per_episode_sec";
pub const STUDIO_AVG_SCORE_COLUMN: &str = "studio_avg_score";
pub const SOURCE_AVG_SCORE_COLUMN: &str = "source_avg_score";

/// Ordered column names the trained model expects.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Result<FeatureSchema> {
        if columns.is_empty() {
            bail!("Feature schema has no columns.");
        }
        let mut positions = HashMap::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            if positions.insert(column.clone(), index).is_some() {
                bail!("Feature schema has duplicate column \"{column}\".");
            }
        }
        Ok(FeatureSchema { columns, positions })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    /// Values of the one-hot columns named `<prefix>_<value>`.
    pub fn levels<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.columns.iter().filter_map(move |column| {
            column
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('_'))
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssembledRow {
    /// One value per schema column, in schema order.
    pub values: Vec<f64>,
    /// Produced columns the schema does not know.
    pub dropped: Vec<String>,
}

/// Reindexes `produced` onto `schema`.
///
/// Schema columns that were not produced are zero, produced columns missing
/// from the schema are dropped. When a column is produced more than once the
/// last value wins.
pub fn assemble(schema: &FeatureSchema, produced: &[(String, f64)]) -> AssembledRow {
    let mut values = vec![0.0; schema.len()];
    let mut dropped = Vec::new();
    for (column, value) in produced {
        match schema.position(column) {
            Some(index) => values[index] = *value,
            None => dropped.push(column.clone()),
        }
    }
    AssembledRow { values, dropped }
}
