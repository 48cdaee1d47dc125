//! The run manifest data model and its JSON serialization.

use std::path::Path;

use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row per physical FASTQ file. Every R1 record is duplicated into an
/// R2 record that differs only in `fastq_code` and `fastq_path`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DataFile {
    pub assay_code: String,
    /// Read designator, `R1` or `R2`.
    pub fastq_code: String,
    pub fastq_path: String,
    /// Always `fastq`.
    pub file_type: String,
    pub gl_prep: String,
    pub gl_type: String,
    pub flowcell: String,
    pub lane: String,
    /// Decompressed newline count / 2. Omitted when the full-file scan is
    /// skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_reads: Option<u64>,
    pub read1_length: u64,
    pub read2_length: u64,
    /// Sequencing center.
    pub rgcn: String,
    /// Platform, always `ILLUMINA`.
    pub rgpl: String,
    /// Platform model.
    pub rgpm: String,
    /// Index barcode, dual indexes joined with `-`.
    pub rgbc: String,
    /// `{flowcell}_{lane}`
    pub rgpu: String,
    /// `{rgpu}_{rgbc}`
    pub rgid: String,
    pub rgsm: String,
    pub rglb: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dna_rna_merge_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_merge_key: Option<String>,
    pub sample_name: String,
    pub sub_group: String,
}

impl DataFile {
    /// The paired R2 record: identical except for the read designator and
    /// the path.
    pub fn paired_r2(&self, r2_path: &Path) -> DataFile {
        DataFile {
            fastq_code: "R2".to_string(),
            fastq_path: r2_path.to_string_lossy().into_owned(),
            ..self.clone()
        }
    }
}

/// The run-level document submitted to the orchestration service.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub cram: bool,
    pub data_files: Vec<DataFile>,
    pub email: String,
    /// Always `Unknown`.
    pub ethnicity: String,
    pub hpc_account: String,
    pub isilon_path: String,
    pub pipeline: String,
    pub project: String,
    pub sex: String,
    pub study: String,
    /// Always empty.
    pub study_disease: String,
    /// Task list copied from the template, or the empty string when no
    /// template was given. The consuming service expects the string form,
    /// so no template does not become an empty array here.
    pub tasks: Value,
}

/// Load the `tasks` array from a template json. A missing template file
/// degrades to the empty string with a warning; an unreadable or malformed
/// template is an error.
pub fn template_tasks(template: Option<&Path>) -> Result<Value> {
    let Some(path) = template else {
        return Ok(Value::String(String::new()));
    };
    if !path.exists() {
        warn!(
            "{} does not appear to exist, using empty task list",
            path.display()
        );
        return Ok(Value::String(String::new()));
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read template {}", path.display()))?;
    let template: Value = serde_json::from_str(&text)
        .with_context(|| format!("template {} is not valid json", path.display()))?;
    match template.get("tasks") {
        Some(tasks) => Ok(tasks.clone()),
        None => bail!("template {} has no \"tasks\" key", path.display()),
    }
}

/// Write the manifest as pretty-printed (2-space indented) json.
pub fn write_manifest(manifest: &Manifest, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(manifest)
        .context("failed to serialize the run manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn data_file() -> DataFile {
        DataFile {
            assay_code: "KHWGS".to_string(),
            fastq_code: "R1".to_string(),
            fastq_path: "/data/STUDY_P1_R1_001.fastq.gz".to_string(),
            file_type: "fastq".to_string(),
            gl_prep: "Genome".to_string(),
            gl_type: "Genome".to_string(),
            flowcell: "HNOFFDSXY".to_string(),
            lane: "1".to_string(),
            number_of_reads: Some(1000),
            read1_length: 151,
            read2_length: 151,
            rgcn: "TGen".to_string(),
            rgpl: "ILLUMINA".to_string(),
            rgpm: "NovaSeq6000".to_string(),
            rgbc: "GATTACA-TTGCAACT".to_string(),
            rgpu: "HNOFFDSXY_1".to_string(),
            rgid: "HNOFFDSXY_1_GATTACA-TTGCAACT".to_string(),
            rgsm: "STUDY_P1".to_string(),
            rglb: "STUDY_P1".to_string(),
            dna_rna_merge_key: None,
            sample_merge_key: None,
            sample_name: "STUDY_P1".to_string(),
            sub_group: "Constitutional".to_string(),
        }
    }

    fn manifest() -> Manifest {
        Manifest {
            cram: false,
            data_files: vec![data_file()],
            email: "someone@tgen.org".to_string(),
            ethnicity: "Unknown".to_string(),
            hpc_account: "acct".to_string(),
            isilon_path: "/scratch/someone/".to_string(),
            pipeline: "tempe@latest".to_string(),
            project: "TESTPROJ".to_string(),
            sex: "Unknown".to_string(),
            study: "STUDY".to_string(),
            study_disease: String::new(),
            tasks: Value::String(String::new()),
        }
    }

    #[test]
    fn test_round_trip_preserves_values_and_types() {
        let manifest = manifest();
        let json = serde_json::to_string_pretty(&manifest).unwrap();
        let back: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, manifest);

        // Numbers stay numbers and booleans stay booleans on the wire.
        let value: Value = serde_json::from_str(&json).unwrap();
        assert!(value["cram"].is_boolean());
        assert!(value["dataFiles"][0]["numberOfReads"].is_u64());
        assert!(value["dataFiles"][0]["read1Length"].is_u64());
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let json = serde_json::to_string(&manifest()).unwrap();
        for key in [
            "assayCode",
            "fastqCode",
            "fastqPath",
            "fileType",
            "glPrep",
            "glType",
            "numberOfReads",
            "read1Length",
            "read2Length",
            "sampleName",
            "subGroup",
            "dataFiles",
            "hpcAccount",
            "isilonPath",
            "studyDisease",
        ] {
            assert!(json.contains(&format!("\"{key}\"")), "missing key {key}");
        }
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let mut df = data_file();
        df.number_of_reads = None;
        let json = serde_json::to_string(&df).unwrap();
        assert!(!json.contains("numberOfReads"));
        assert!(!json.contains("dnaRnaMergeKey"));
        assert!(!json.contains("sampleMergeKey"));

        df.dna_rna_merge_key = Some("STUDY_P1_V1".to_string());
        let json = serde_json::to_string(&df).unwrap();
        assert!(json.contains("dnaRnaMergeKey"));
    }

    #[test]
    fn test_paired_r2() {
        let r1 = data_file();
        let r2 = r1.paired_r2(Path::new("/data/STUDY_P1_R2_001.fastq.gz"));
        assert_eq!(r2.fastq_code, "R2");
        assert_eq!(r2.fastq_path, "/data/STUDY_P1_R2_001.fastq.gz");
        // Everything else is byte-identical.
        let mut r2_as_r1 = r2;
        r2_as_r1.fastq_code = r1.fastq_code.clone();
        r2_as_r1.fastq_path = r1.fastq_path.clone();
        assert_eq!(r2_as_r1, r1);
    }

    #[test]
    fn test_template_tasks_missing_file_degrades() {
        let tasks = template_tasks(Some(Path::new("/nonexistent/template.json"))).unwrap();
        assert_eq!(tasks, Value::String(String::new()));
    }

    #[test]
    fn test_template_tasks_copied_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.json");
        std::fs::write(
            &path,
            r#"{"tasks": [{"name": "align", "enabled": true}], "other": 1}"#,
        )
        .unwrap();
        let tasks = template_tasks(Some(&path)).unwrap();
        assert_eq!(tasks, serde_json::json!([{"name": "align", "enabled": true}]));
    }

    #[test]
    fn test_template_without_tasks_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.json");
        std::fs::write(&path, r#"{"other": 1}"#).unwrap();
        assert!(template_tasks(Some(&path)).is_err());
    }

    #[test]
    fn test_write_manifest_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("TESTPROJ.json");
        write_manifest(&manifest(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"cram\""));
    }
}
