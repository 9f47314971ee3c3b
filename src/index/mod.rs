// Vector index module
// In-memory exact nearest-neighbour search over pre-computed document embeddings

pub mod loader;


pub use loader::{IndexFile, load_index};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use thiserror::Error;

use crate::topics::TopicRecord;

/// Distance function the index vectors were built for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Squared euclidean distance, smaller is closer
    #[default]
    L2,
    /// Dot product, larger is closer
    InnerProduct,
    /// Cosine similarity, larger is closer
    Cosine,
}

impl DistanceMetric {
    /// Distance between two equal-length vectors where smaller always means closer
    #[inline]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::L2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = x - y;
                    d * d
                })
                .sum(),
            Self::InnerProduct => -dot(a, b),
            Self::Cosine => {
                let norms = norm(a) * norm(b);
                if norms == 0.0 { 0.0 } else { -dot(a, b) / norms }
            }
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f32]) -> f32 {
    dot(a, a).sqrt()
}

/// One metadata entry: a structured record (normally a [`TopicRecord`]) or raw text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentRecord {
    Text(String),
    Object(Map<String, Value>),
}

impl DocumentRecord {
    /// The text to answer with.
    ///
    /// Objects yield their `content` field; `None` when it is absent or null.
    #[inline]
    pub fn content(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Text(text) => Some(Cow::Borrowed(text)),
            Self::Object(fields) => match fields.get("content") {
                None | Some(Value::Null) => None,
                Some(Value::String(text)) => Some(Cow::Borrowed(text)),
                Some(other) => Some(Cow::Owned(other.to_string())),
            },
        }
    }
}

impl From<TopicRecord> for DocumentRecord {
    #[inline]
    fn from(topic: TopicRecord) -> Self {
        let links = topic
            .links
            .into_iter()
            .map(|link| {
                let mut fields = Map::new();
                fields.insert("url".to_string(), Value::String(link.url));
                fields.insert("text".to_string(), Value::String(link.text));
                Value::Object(fields)
            })
            .collect();

        let mut fields = Map::new();
        fields.insert("title".to_string(), Value::String(topic.title));
        fields.insert("content".to_string(), Value::String(topic.content));
        fields.insert("url".to_string(), Value::String(topic.url));
        fields.insert("links".to_string(), Value::Array(links));
        fields.insert(
            "images".to_string(),
            Value::Array(topic.images.into_iter().map(Value::String).collect()),
        );
        Self::Object(fields)
    }
}

impl From<String> for DocumentRecord {
    #[inline]
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// An embedding paired with the record it was computed from
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub record: DocumentRecord,
}

#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    #[error("index contains no documents")]
    Empty,
    #[error("index has {vectors} vectors but metadata has {records} records")]
    CountMismatch { vectors: usize, records: usize },
    #[error("vector {position} has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },
    #[error("vector {position} contains a non-finite component")]
    NonFinite { position: usize },
    #[error("query has {actual} dimensions but the index expects {expected}")]
    QueryDimension { expected: usize, actual: usize },
}

/// Closest entry for a query
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a> {
    /// Position of the entry in index order
    pub position: usize,
    pub entry: &'a IndexEntry,
    /// Metric distance to the query, smaller is closer
    pub distance: f32,
}

/// Read-only flat index. Entry order is fixed at construction.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    metric: DistanceMetric,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Build an index from paired entries; all vectors must share one dimension
    #[inline]
    pub fn new(metric: DistanceMetric, entries: Vec<IndexEntry>) -> Result<Self, IndexError> {
        let dimension = entries.first().ok_or(IndexError::Empty)?.vector.len();
        if dimension == 0 {
            return Err(IndexError::DimensionMismatch {
                position: 0,
                expected: 1,
                actual: 0,
            });
        }

        for (position, entry) in entries.iter().enumerate() {
            if entry.vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    position,
                    expected: dimension,
                    actual: entry.vector.len(),
                });
            }
            if entry.vector.iter().any(|v| !v.is_finite()) {
                return Err(IndexError::NonFinite { position });
            }
        }

        Ok(Self {
            metric,
            dimension,
            entries,
        })
    }

    /// Pair parallel vector and record arrays, position by position
    #[inline]
    pub fn from_parts(
        metric: DistanceMetric,
        vectors: Vec<Vec<f32>>,
        records: Vec<DocumentRecord>,
    ) -> Result<Self, IndexError> {
        if vectors.len() != records.len() {
            return Err(IndexError::CountMismatch {
                vectors: vectors.len(),
                records: records.len(),
            });
        }

        let entries = vectors
            .into_iter()
            .zip(records)
            .map(|(vector, record)| IndexEntry { vector, record })
            .collect();
        Self::new(metric, entries)
    }

    /// Exact k=1 search. Ties go to the earliest entry.
    #[inline]
    pub fn nearest(&self, query: &[f32]) -> Result<Neighbor<'_>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::QueryDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut best: Option<Neighbor<'_>> = None;
        for (position, entry) in self.entries.iter().enumerate() {
            let mut distance = self.metric.distance(query, &entry.vector);
            if distance.is_nan() {
                distance = f32::INFINITY;
            }
            if best.is_none_or(|b| distance < b.distance) {
                best = Some(Neighbor {
                    position,
                    entry,
                    distance,
                });
            }
        }

        best.ok_or(IndexError::Empty)
    }

    #[inline]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}
