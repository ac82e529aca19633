//! Batch splitting

use trialscout_error::{Error, Result};

/// A fixed-size group of system names researched in one agent request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Zero-based position in the run
    pub index: usize,
    pub names: Vec<String>,
}

impl Batch {
    pub fn new(index: usize, names: Vec<String>) -> Self {
        Self { index, names }
    }

    /// Names joined with ", ", used as the batch identifier in reports
    pub fn label(&self) -> String {
        self.names.join(", ")
    }
}

/// Split `items` into contiguous chunks of `size`; the last chunk holds the remainder.
pub fn chunk<T: Clone>(items: &[T], size: usize) -> Result<Vec<Vec<T>>> {
    if size == 0 {
        return Err(Error::invalid_argument("chunk size must be at least 1")
            .with_operation("batch::chunk"));
    }
    Ok(items.chunks(size).map(|c| c.to_vec()).collect())
}

/// Split system names into indexed batches
pub fn split_batches(names: &[String], size: usize) -> Result<Vec<Batch>> {
    let batches = chunk(names, size)?
        .into_iter()
        .enumerate()
        .map(|(index, names)| Batch::new(index, names))
        .collect();
    Ok(batches)
}

/// Trim names and drop blank entries, keeping input order
pub fn clean_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|n| n.as_ref().trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}
