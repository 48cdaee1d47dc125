//! Resolution of ambiguous per-file metadata fields.
//!
//! Every field goes through the same precedence chain, evaluated
//! independently per field: explicit value, then positional extraction from
//! the filename, then a glob pattern table, then a field-specific default.
//! Fields with none of those and no default are simply absent.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use glob::Pattern;
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use regex::Regex;

/// An ordered `value=glob` lookup table, parsed from a single delimited
/// string like `K1ID2="*_ID2_*",KHWGS="*_WGS_*"`. Patterns are evaluated in
/// table order against the full file path and the first match wins.
#[derive(Debug, Clone)]
pub struct PatternTable {
    entries: Vec<(Pattern, String)>,
}

impl PatternTable {
    pub fn parse(spec: &str) -> Result<PatternTable> {
        let mut entries = Vec::new();
        for part in spec.trim().split(',').filter(|p| !p.is_empty()) {
            let (value, pat) = part
                .split_once('=')
                .ok_or_else(|| anyhow!("pattern table entry {part:?} is missing '='"))?;
            let pat = pat.trim_matches(|c| c == '"' || c == '\'');
            let pattern = Pattern::new(pat)
                .with_context(|| format!("invalid glob {pat:?} in pattern table"))?;
            entries.push((pattern, value.to_string()));
        }
        Ok(PatternTable { entries })
    }

    /// First value (in table order) whose pattern matches `path`.
    pub fn lookup(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .map(|(_, value)| value.as_str())
    }
}

/// A set of 1-based filename field indices, parsed from selectors like
/// `"1,2"` or `"1-5,8"`. Ranges are inclusive and fields are extracted in
/// the order written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    indices: Vec<usize>,
}

impl FieldSelector {
    pub fn parse(spec: &str) -> Result<FieldSelector> {
        let mut indices = Vec::new();
        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if let Some((start, end)) = part.split_once('-') {
                let start: usize = start
                    .parse()
                    .with_context(|| format!("bad field range {part:?}"))?;
                let end: usize = end
                    .parse()
                    .with_context(|| format!("bad field range {part:?}"))?;
                if start == 0 || end < start {
                    bail!("bad field range {part:?}: fields are numbered from 1");
                }
                indices.extend(start - 1..end);
            } else {
                let idx: usize = part
                    .parse()
                    .with_context(|| format!("bad field index {part:?}"))?;
                if idx == 0 {
                    bail!("bad field index {part:?}: fields are numbered from 1");
                }
                indices.push(idx - 1);
            }
        }
        if indices.is_empty() {
            bail!("empty field selector");
        }
        Ok(FieldSelector { indices })
    }

    /// Split `name` on the delimiter regex and join the selected fields
    /// with `_`.
    pub fn extract(&self, name: &str, splitter: &Regex) -> Result<String> {
        let tokens: Vec<&str> = splitter.split(name).collect();
        let mut selected = Vec::with_capacity(self.indices.len());
        for &idx in &self.indices {
            let token = tokens.get(idx).ok_or_else(|| {
                anyhow!(
                    "field {} is out of range for {name:?} ({} fields)",
                    idx + 1,
                    tokens.len()
                )
            })?;
            selected.push(*token);
        }
        Ok(selected.join("_"))
    }
}

/// The three user-configurable sources for one metadata field. `resolve`
/// applies the fixed precedence chain; the explicit value always wins.
#[derive(Debug, Clone, Default)]
pub struct FieldRule {
    pub value: Option<String>,
    pub selector: Option<FieldSelector>,
    pub patterns: Option<PatternTable>,
}

impl FieldRule {
    pub fn resolve(
        &self,
        path: &Path,
        basename: &str,
        splitter: &Regex,
        default: Option<&str>,
    ) -> Result<Option<String>> {
        if let Some(value) = &self.value {
            return Ok(Some(value.clone()));
        }
        if let Some(selector) = &self.selector {
            return selector.extract(basename, splitter).map(Some);
        }
        if let Some(table) = &self.patterns {
            if let Some(value) = table.lookup(&path.to_string_lossy()) {
                return Ok(Some(value.to_string()));
            }
        }
        Ok(default.map(str::to_string))
    }

    /// `resolve` for fields that always carry a default.
    pub fn resolve_or(
        &self,
        path: &Path,
        basename: &str,
        splitter: &Regex,
        default: &str,
    ) -> Result<String> {
        Ok(self
            .resolve(path, basename, splitter, Some(default))?
            .unwrap_or_else(|| default.to_string()))
    }
}

/// Longest common prefix across basenames, cut back to the last complete
/// `_` delimited token. A partially shared token (`..._F1` vs `..._F2`
/// share `..._F`) carries no sample identity, so it is dropped along with
/// the trailing delimiter. When the shared prefix holds no delimiter at
/// all (`SAMPLEA` vs `SAMPLEB`) the whole prefix is the identity, so it
/// is kept rather than trimmed away. Used to infer the shared sample
/// identity of a file set.
pub fn longest_common_prefix(names: &[String]) -> String {
    let Some(first) = names.first() else {
        return String::new();
    };
    let mut len = first.len();
    for name in &names[1..] {
        let common = first
            .bytes()
            .zip(name.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        len = len.min(common);
    }
    while !first.is_char_boundary(len) {
        len -= 1;
    }
    let prefix = first[..len].trim_end_matches('_');
    let token_aligned = prefix
        .trim_end_matches(|c| c != '_')
        .trim_end_matches('_');
    if token_aligned.is_empty() {
        prefix.to_string()
    } else {
        token_aligned.to_string()
    }
}

const DUMMY_BARCODE_LEN: usize = 8;
const BASES: &[u8; 4] = b"ATGC";

/// Reproducible stand-in barcode for dummy mode. The generator is seeded
/// from the file's first header line, so repeated runs over the same file
/// emit the same barcode.
pub fn dummy_barcode(first_line: &str) -> String {
    let mut seed = [0u8; 16];
    for (i, b) in first_line.bytes().enumerate() {
        seed[i % 16] = seed[i % 16].wrapping_add(b).rotate_left((i % 7) as u32);
    }
    // XorShiftRng remaps an all-zero seed; pin a bit so the mapping from
    // header line to seed stays injective enough for our purposes.
    seed[0] |= 1;
    let mut rng = XorShiftRng::from_seed(seed);
    (0..DUMMY_BARCODE_LEN)
        .map(|_| BASES[rng.gen_range(0..BASES.len())] as char)
        .collect()
}
