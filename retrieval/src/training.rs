//! Labeled training examples.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::category::Category;
use crate::error::{Result, RetrievalError};

/// A task description with its known quadrant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub label: Category,
}

impl TrainingExample {
    pub fn new(text: impl Into<String>, label: Category) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// A record as it appears on disk. Fields are optional so one bad record
/// can be skipped without rejecting the whole file.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    label: Option<i64>,
    #[serde(default)]
    quadrant: Option<i64>,
}

/// The immutable set of labeled examples.
///
/// Keeps a `text → position` map of each text's first occurrence so a
/// retrieved text resolves to its label in constant time.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    examples: Vec<TrainingExample>,
    first_by_text: HashMap<String, usize>,
}

impl TrainingSet {
    /// Build a set from examples, in order.
    pub fn new(examples: Vec<TrainingExample>) -> Self {
        let mut first_by_text = HashMap::with_capacity(examples.len());
        for (i, example) in examples.iter().enumerate() {
            first_by_text.entry(example.text.clone()).or_insert(i);
        }
        Self {
            examples,
            first_by_text,
        }
    }

    /// An empty set. Classification then always returns the baseline.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Seed examples in English and Polish.
    pub fn builtin() -> Self {
        use Category::{Delegate, Delete, DoNow, Schedule};

        let seed = [
            ("urgent deadline tomorrow", DoNow),
            ("critical issue fix now", DoNow),
            ("pilny termin jutro", DoNow),
            ("krytyczny błąd do naprawienia zaraz", DoNow),
            ("emergency meeting", DoNow),
            ("schedule call later", Schedule),
            ("check emails tomorrow", Schedule),
            ("zobacz maile jutro", Schedule),
            ("zaplanuj spotkanie", Schedule),
            ("review documents", Schedule),
            ("prepare report", Delegate),
            ("strategize project", Delegate),
            ("przygotuj raport", Delegate),
            ("rozważ strategię projektu", Delegate),
            ("plan future goals", Delegate),
            ("delete old files", Delete),
            ("clean up cache", Delete),
            ("usuń stare pliki", Delete),
            ("wyczyść pamięć", Delete),
            ("ignore spam", Delete),
        ];

        Self::new(
            seed.into_iter()
                .map(|(text, label)| TrainingExample::new(text, label))
                .collect(),
        )
    }

    /// Parse a JSON array of `{"text", "label"}` records.
    ///
    /// `"quadrant"` is accepted in place of `"label"`; `"label"` wins when
    /// both are present. Records with a blank text or a label outside the
    /// four quadrants are skipped.
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<RawRecord> = serde_json::from_str(json)?;
        let total = records.len();

        let examples: Vec<TrainingExample> = records
            .into_iter()
            .enumerate()
            .filter_map(|(i, record)| {
                let text = record.text.filter(|t| !t.trim().is_empty());
                let label = record.label.or(record.quadrant).and_then(Category::from_id);
                match (text, label) {
                    (Some(text), Some(label)) => Some(TrainingExample::new(text, label)),
                    _ => {
                        warn!("Skipping training record {i}: missing text or invalid label");
                        None
                    }
                }
            })
            .collect();

        if examples.len() < total {
            warn!("Kept {} of {total} training records", examples.len());
        }
        Ok(Self::new(examples))
    }

    /// Load training data from a JSON file.
    ///
    /// A missing file is not an error: the set comes back empty and the
    /// classifier runs in reduced-capability mode.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !fs::try_exists(path).await.unwrap_or(false) {
            warn!("Training data file {} not found", path.display());
            return Ok(Self::empty());
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|source| RetrievalError::TrainingRead {
                path: path.to_path_buf(),
                source,
            })?;

        let set = Self::from_json(&content)?;
        info!("Loaded {} training examples from {}", set.len(), path.display());
        Ok(set)
    }

    /// Get the number of examples.
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// All examples, in load order.
    pub fn examples(&self) -> &[TrainingExample] {
        &self.examples
    }

    /// Example texts, in load order.
    pub fn texts(&self) -> Vec<String> {
        self.examples.iter().map(|e| e.text.clone()).collect()
    }

    /// Position of the first example whose text equals `text` exactly.
    fn position(&self, text: &str) -> Option<usize> {
        self.first_by_text.get(text).copied()
    }

    /// Label of the first example whose text equals `text` exactly.
    pub fn label_for(&self, text: &str) -> Option<Category> {
        self.position(text).map(|i| self.examples[i].label)
    }
}
