//! Class-name to class-index table.

use std::collections::HashSet;

use crate::error::PrepError;

/// Road damage classes used by the RDD2022 dataset, in index order.
pub const ROAD_DAMAGE_CLASSES: [&str; 4] = ["D00", "D10", "D20", "D40"];

/// An immutable, ordered mapping from class name to class index.
///
/// The index of a class is its position in the table. Objects whose class
/// name is not in the table are dropped by the transcoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassTable {
    names: Vec<String>,
}

impl ClassTable {
    /// Build a table from class names in index order.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::InvalidConfiguration`] for an empty list, a blank
    /// name or a duplicated name.
    pub fn new<I, S>(names: I) -> Result<Self, PrepError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(|name| name.into().trim().to_string())
            .collect();

        if names.is_empty() {
            return Err(PrepError::InvalidConfiguration {
                message: "class table must contain at least one class".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for name in &names {
            if name.is_empty() {
                return Err(PrepError::InvalidConfiguration {
                    message: "class names must not be blank".to_string(),
                });
            }
            if !seen.insert(name.as_str()) {
                return Err(PrepError::InvalidConfiguration {
                    message: format!("class '{name}' is listed more than once"),
                });
            }
        }

        Ok(Self { names })
    }

    /// The four RDD damage classes: longitudinal crack (`D00`), transverse
    /// crack (`D10`), alligator crack (`D20`) and pothole (`D40`).
    pub fn road_damage() -> Self {
        Self {
            names: ROAD_DAMAGE_CLASSES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|known| known == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::road_damage()
    }
}
