// Retrieval core
// Embeds a question (plus an optional image stand-in) and answers with the nearest indexed document

pub mod extractor;


pub use extractor::{IMAGE_PLACEHOLDER, PlaceholderExtractor, TextExtractor, describe_image};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::embeddings::Embedder;
use crate::index::VectorIndex;
use crate::{QaError, Result};

pub const ANSWER_PREFIX: &str = "Based on Discourse content: ";
pub const MISSING_CONTENT_PLACEHOLDER: &str = "[no 'content' field found]";

/// Incoming question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub question: String,
    /// Base64-encoded image attachment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Query {
    #[inline]
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            image: None,
        }
    }

    #[inline]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
}

/// Text that gets embedded: the question alone, or the question and a line describing the image.
/// A blank image payload counts as no image.
#[inline]
pub fn combine_query(question: &str, image: Option<&str>, extractor: &dyn TextExtractor) -> String {
    match image {
        Some(payload) if !payload.trim().is_empty() => {
            format!("{}\n{}", question, describe_image(extractor, payload))
        }
        _ => question.to_string(),
    }
}

/// Answers queries from an immutable index. Construct once and share behind an `Arc`.
pub struct Retriever {
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn TextExtractor>,
}

impl Retriever {
    #[inline]
    pub fn new(
        index: VectorIndex,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        Self {
            index,
            embedder,
            extractor,
        }
    }

    #[inline]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Answer with the content of the single nearest document.
    ///
    /// Image and record problems degrade to placeholder text; only embedding and
    /// search failures are errors.
    #[inline]
    pub fn answer(&self, query: &Query) -> Result<Answer> {
        let full_query = combine_query(
            &query.question,
            query.image.as_deref(),
            self.extractor.as_ref(),
        );

        let embedding = self
            .embedder
            .embed(&full_query)
            .map_err(|e| QaError::Embedding(format!("{:#}", e)))?;

        let neighbor = self
            .index
            .nearest(&embedding)
            .map_err(|e| QaError::Embedding(e.to_string()))?;

        debug!(
            "Nearest document is #{} (distance {})",
            neighbor.position, neighbor.distance
        );

        let content = match neighbor.entry.record.content() {
            Some(content) => content,
            None => {
                warn!(
                    "Document #{} has no content field, answering with placeholder",
                    neighbor.position
                );
                MISSING_CONTENT_PLACEHOLDER.into()
            }
        };

        Ok(Answer {
            answer: format!("{}{}", ANSWER_PREFIX, content),
        })
    }
}
