//! Task partitioning
//!
//! Splits one bulk generation request into an ordered list of independently
//! schedulable units. Partitioning is a pure function of the request and the
//! limits: the same input always yields the same units in the same order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What kind of study content to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Flashcards,
    Quiz,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Flashcards => "flashcards",
            ContentKind::Quiz => "quiz",
        }
    }
}

fn default_difficulty() -> String {
    "medium".to_string()
}

/// A bulk generation request as submitted by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub kind: ContentKind,
    pub topic: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    /// Total number of items requested across all units
    pub count: usize,
    /// Source material; when present each unit works from one fragment of it
    #[serde(default)]
    pub source_text: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl GenerationRequest {
    pub fn topic(kind: ContentKind, topic: impl Into<String>, count: usize) -> Self {
        Self {
            kind,
            topic: topic.into(),
            subject: None,
            difficulty: default_difficulty(),
            count,
            source_text: None,
            user_id: None,
        }
    }

    pub fn with_source_text(mut self, text: impl Into<String>) -> Self {
        self.source_text = Some(text.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = difficulty.into();
        self
    }
}

/// Input handed to one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInput {
    /// Label for this slice of the topic
    pub subtopic: String,
    /// Number of items this unit should produce
    pub item_count: usize,
    /// Contiguous slice of the source text, for text-based requests
    pub fragment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationUnit {
    pub unit_index: usize,
    pub input: UnitInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionLimits {
    /// Upper bound on units per operation
    pub max_units: usize,
    /// Upper bound on items per request, with or without source text
    pub max_items: usize,
    /// Items requested from a single provider call
    pub items_per_unit: usize,
    /// Target fragment length in characters
    pub fragment_chars: usize,
    /// Sources shorter than this are never split; shorter trailing fragments merge backwards
    pub min_fragment_chars: usize,
}

impl Default for PartitionLimits {
    fn default() -> Self {
        Self {
            max_units: 16,
            max_items: 50,
            items_per_unit: 5,
            fragment_chars: 1200,
            min_fragment_chars: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitionError {
    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("item count must be at least 1")]
    ZeroCount,

    #[error("requested {requested} items but at most {max} are allowed")]
    TooManyItems { requested: usize, max: usize },

    #[error("source text must not be empty")]
    EmptySource,

    #[error("request needs {required} units but at most {max} are allowed")]
    TooManyUnits { required: usize, max: usize },
}

impl PartitionError {
    pub fn kind(&self) -> &'static str {
        "invalid_input"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Partitioner {
    limits: PartitionLimits,
}

impl Partitioner {
    pub fn new(limits: PartitionLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &PartitionLimits {
        &self.limits
    }

    /// Split a request into ordered, contiguous units
    pub fn partition(&self, request: &GenerationRequest) -> Result<Vec<GenerationUnit>, PartitionError> {
        let topic = request.topic.trim();
        if topic.is_empty() {
            return Err(PartitionError::EmptyTopic);
        }
        if request.count == 0 {
            return Err(PartitionError::ZeroCount);
        }
        if request.count > self.limits.max_items {
            return Err(PartitionError::TooManyItems {
                requested: request.count,
                max: self.limits.max_items,
            });
        }

        let fragments = match &request.source_text {
            Some(text) => {
                if text.trim().is_empty() {
                    return Err(PartitionError::EmptySource);
                }
                Some(self.fragment_text(text, request.count))
            }
            None => None,
        };

        let unit_count = match &fragments {
            Some(fragments) => fragments.len(),
            None => request.count.div_ceil(self.limits.items_per_unit.max(1)),
        };
        if unit_count > self.limits.max_units {
            return Err(PartitionError::TooManyUnits {
                required: unit_count,
                max: self.limits.max_units,
            });
        }

        let counts = distribute(request.count, unit_count);
        let mut fragments = fragments.map(Vec::into_iter);

        let units = counts
            .into_iter()
            .enumerate()
            .map(|(unit_index, item_count)| {
                let subtopic = if unit_count == 1 {
                    topic.to_string()
                } else {
                    format!("{} - Part {}", topic, unit_index + 1)
                };
                GenerationUnit {
                    unit_index,
                    input: UnitInput {
                        subtopic,
                        item_count,
                        fragment: fragments.as_mut().and_then(|iter| iter.next()),
                    },
                }
            })
            .collect();

        Ok(units)
    }

    /// Split source text into at most `max_groups` contiguous fragments
    fn fragment_text(&self, text: &str, max_groups: usize) -> Vec<String> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.chars().count() < self.limits.min_fragment_chars {
            return vec![normalized];
        }

        let mut fragments: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0;
        for word in normalized.split(' ') {
            let word_chars = word.chars().count();
            if current_chars > 0 && current_chars + 1 + word_chars > self.limits.fragment_chars {
                fragments.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            if current_chars > 0 {
                current.push(' ');
                current_chars += 1;
            }
            current.push_str(word);
            current_chars += word_chars;
        }
        if !current.is_empty() {
            match fragments.last_mut() {
                Some(previous) if current_chars < self.limits.min_fragment_chars => {
                    previous.push(' ');
                    previous.push_str(&current);
                }
                _ => fragments.push(current),
            }
        }

        if fragments.len() <= max_groups {
            return fragments;
        }

        // More fragments than items: group neighbours so each unit asks for one item.
        let sizes = distribute(fragments.len(), max_groups);
        let mut iter = fragments.into_iter();
        sizes
            .into_iter()
            .map(|size| iter.by_ref().take(size).collect::<Vec<_>>().join(" "))
            .collect()
    }
}

/// Split `total` into `parts` near-equal shares, larger shares first
fn distribute(total: usize, parts: usize) -> Vec<usize> {
    if parts == 0 {
        return Vec::new();
    }
    let base = total / parts;
    let extra = total % parts;
    (0..parts).map(|i| base + usize::from(i < extra)).collect()
}
