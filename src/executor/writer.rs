//! Outcome persistence
//!
//! Writes sanitized result data to a caller-chosen file as indented JSON.

use std::path::Path;

use serde::Serialize;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::error::{ExecutionError, Result};

/// Indentation used for persisted files
pub const PERSIST_INDENT: usize = 4;

/// Serialize `value` to `path` with [`PERSIST_INDENT`]-space indentation.
///
/// # Arguments
/// * `path` - Output file; its parent directory must exist
/// * `value` - Data to write
///
/// # Returns
/// * `Result<u64>` - Number of bytes written
pub async fn persist_json<T: Serialize>(path: &Path, value: &T) -> Result<u64> {
    validate_path(path)?;

    let bytes = to_indented_json(value, PERSIST_INDENT)?;
    let file = File::create(path).await.map_err(|e| {
        ExecutionError::Failed(format!("Failed to create {}: {}", path.display(), e))
    })?;

    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes).await?;
    writer.flush().await?;

    debug!("Persisted {} bytes to {}", bytes.len(), path.display());
    Ok(bytes.len() as u64)
}

/// Serialize with a custom indent width
pub fn to_indented_json<T: Serialize>(value: &T, indent: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let indent = " ".repeat(indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

/// Check that the parent directory exists
fn validate_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(ExecutionError::Failed(format!(
                "Directory does not exist: {}",
                parent.display()
            ))
            .into());
        }
    }

    Ok(())
}
