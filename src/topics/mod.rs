// Topic records produced by the collector and the JSON file they are persisted to


use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// One scraped forum discussion thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRecord {
    /// Topic title as shown in the thread header
    pub title: String,
    /// Text of the opening post
    pub content: String,
    /// Absolute URL of the topic page
    pub url: String,
    /// Outgoing links found in the opening post, in document order
    pub links: Vec<TopicLink>,
    /// Absolute image URLs found in the opening post, in document order
    pub images: Vec<String>,
}

/// A hyperlink inside a topic body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicLink {
    pub url: String,
    pub text: String,
}

/// Write `records` as a pretty-printed JSON array, creating parent directories as needed
#[inline]
pub fn save_topics(path: &Path, records: &[TopicRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create topics file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)
        .with_context(|| format!("Failed to serialize topics to {}", path.display()))?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    debug!("Wrote {} topics to {}", records.len(), path.display());
    Ok(())
}

/// Read a topics file written by [`save_topics`]
#[inline]
pub fn load_topics(path: &Path) -> Result<Vec<TopicRecord>> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open topics file {}", path.display()))?;
    let records: Vec<TopicRecord> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse topics file {}", path.display()))?;

    debug!("Read {} topics from {}", records.len(), path.display());
    Ok(records)
}
