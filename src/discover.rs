//! Find R1 FASTQ files on disk and derive their R2 mates.

use std::path::{Path, PathBuf};

use anyhow::Result;
use glob::glob;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("no fastqs found under {inputs:?} matching {pattern:?}")]
    NoFastqsFound { inputs: Vec<String>, pattern: String },
}

/// Expand `{input}{read_pattern}` for each input prefix and concatenate the
/// matches. Each input is treated as a directory-plus-prefix, so a trailing
/// `/` selects a whole directory. An empty combined result is an error; it
/// is raised before any per-file work happens.
pub fn find_fastqs(inputs: &[String], read_pattern: &str) -> Result<Vec<PathBuf>> {
    let mut fastqs = Vec::new();
    for input in inputs {
        let pattern = format!("{input}{read_pattern}");
        for entry in glob(&pattern)? {
            fastqs.push(entry?);
        }
    }
    if fastqs.is_empty() {
        return Err(DiscoverError::NoFastqsFound {
            inputs: inputs.to_vec(),
            pattern: read_pattern.to_string(),
        }
        .into());
    }
    Ok(fastqs)
}

/// Derive the R2 path from an R1 path by replacing only the last occurrence
/// of `R1`. Sample names may legitimately contain the substring `R1`, so a
/// global replace would corrupt the prefix.
pub fn r2_path(r1: &Path) -> PathBuf {
    let s = r1.to_string_lossy();
    match s.rfind("R1") {
        Some(idx) => PathBuf::from(format!("{}R2{}", &s[..idx], &s[idx + 2..])),
        None => r1.to_path_buf(),
    }
}
