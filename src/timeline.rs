//! Timeline index for the temporal axis of a geo-array.

use hashbrown::HashMap;
use serde::ser::{Serialize, Serializer};

use crate::error::GeosliceError;
use crate::models::Dimension;

/// Ordered set of time point labels indexing a temporal dimension.
///
/// Labels are strings that sort chronologically (e.g. `2001-01-01`), so interval lookup
/// can binary-search the label vector directly. All indices returned by lookups are in
/// dimension index-space (`position + min_index`), not raw vector positions.
#[derive(Clone, Debug)]
pub struct Timeline {
    /// Time point labels in chronological order
    labels: Vec<String>,
    /// Label to vector position map
    positions: HashMap<String, usize>,
    /// The temporal dimension this timeline indexes
    dimension: Dimension,
}

impl PartialEq for Timeline {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels && self.dimension == other.dimension
    }
}

impl Serialize for Timeline {
    /// Serialise as the plain label list.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.labels.serialize(serializer)
    }
}

impl Timeline {
    /// Return a new Timeline.
    ///
    /// Fails if the number of labels does not match the size of the temporal dimension.
    ///
    /// # Arguments
    ///
    /// * `labels`: Time point labels in chronological order
    /// * `dimension`: The temporal dimension the labels index
    pub fn new(labels: Vec<String>, dimension: Dimension) -> Result<Self, GeosliceError> {
        if labels.len() as i64 != dimension.size() {
            return Err(GeosliceError::TimelineLengthMismatch {
                labels: labels.len(),
                size: dimension.size(),
            });
        }
        let positions = labels
            .iter()
            .enumerate()
            .map(|(position, label)| (label.clone(), position))
            .collect();
        Ok(Timeline {
            labels,
            positions,
            dimension,
        })
    }

    /// Number of time points.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if the timeline has no time points.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The temporal dimension this timeline indexes.
    pub fn dimension(&self) -> &Dimension {
        &self.dimension
    }

    /// All time point labels in chronological order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Return the label at a vector position.
    ///
    /// Fails if `position` is past the end of the timeline.
    pub fn get(&self, position: usize) -> Result<&str, GeosliceError> {
        self.labels
            .get(position)
            .map(String::as_str)
            .ok_or(GeosliceError::TimePositionOutOfRange {
                position,
                length: self.labels.len(),
            })
    }

    /// Return the vector position of a label.
    ///
    /// Fails if the label is not present.
    pub fn position_of(&self, label: &str) -> Result<usize, GeosliceError> {
        self.positions
            .get(label)
            .copied()
            .ok_or_else(|| GeosliceError::TimeNotFound {
                label: label.to_string(),
            })
    }

    /// Return the dimension index of a label.
    pub fn index_of(&self, label: &str) -> Result<i64, GeosliceError> {
        Ok(self.position_of(label)? as i64 + self.dimension.min_index)
    }

    /// Resolve a possibly open time interval to a pair of dimension indices.
    ///
    /// An empty `begin` defaults to the first label and an empty `end` to the last. A
    /// `begin` missing from the timeline resolves to the first label at or after it
    /// (ceiling); an `end` resolves to the last label at or before it (floor). Fails if
    /// the defaulted `begin` exceeds `end`, if either bound cannot be satisfied, or if
    /// the resolved interval is empty.
    ///
    /// # Arguments
    ///
    /// * `begin`: Lower interval endpoint, possibly empty
    /// * `end`: Upper interval endpoint, possibly empty
    pub fn find_interval(&self, begin: &str, end: &str) -> Result<(i64, i64), GeosliceError> {
        let begin = if begin.is_empty() {
            self.labels.first().map(String::as_str).unwrap_or_default()
        } else {
            begin
        };
        let end = if end.is_empty() {
            self.labels.last().map(String::as_str).unwrap_or_default()
        } else {
            end
        };
        if begin > end {
            return Err(GeosliceError::TimeIntervalEmpty {
                begin: begin.to_string(),
                end: end.to_string(),
            });
        }
        let begin_position = match self.position_of(begin) {
            Ok(position) => position,
            // Ceiling: first label >= begin.
            Err(_) => {
                let position = self.labels.partition_point(|label| label.as_str() < begin);
                if position == self.labels.len() {
                    return Err(GeosliceError::TimeNotFound {
                        label: begin.to_string(),
                    });
                }
                position
            }
        };
        let end_position = match self.position_of(end) {
            Ok(position) => position,
            // Floor: last label <= end.
            Err(_) => {
                let position = self.labels.partition_point(|label| label.as_str() <= end);
                if position == 0 {
                    return Err(GeosliceError::TimeNotFound {
                        label: end.to_string(),
                    });
                }
                position - 1
            }
        };
        if begin_position > end_position {
            return Err(GeosliceError::TimeIntervalEmpty {
                begin: begin.to_string(),
                end: end.to_string(),
            });
        }
        Ok((
            begin_position as i64 + self.dimension.min_index,
            end_position as i64 + self.dimension.min_index,
        ))
    }
}
