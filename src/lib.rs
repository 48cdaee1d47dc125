//! Build a run manifest from a directory of paired-end gzipped FASTQs.
//!
//! The pipeline is a single sequential pass: discover R1 files by glob,
//! inspect each file's gzip content for the instrument header, record count
//! and read length, resolve the ambiguous metadata fields through one fixed
//! precedence chain, then assemble, write and optionally submit the
//! manifest.

pub mod cli;
pub mod discover;
pub mod inspect;
pub mod manifest;
pub mod resolve;
pub mod submit;

use std::path::PathBuf;

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{error, info};
use regex::Regex;

use crate::cli::Args;
use crate::manifest::{DataFile, Manifest};
use crate::resolve::{FieldRule, FieldSelector, PatternTable};

/// One `FieldRule` per configurable data-file field, parsed up front so a
/// bad selector or pattern table fails before any file is touched.
struct RuleSet {
    assay: FieldRule,
    glprep: FieldRule,
    gltype: FieldRule,
    subgroup: FieldRule,
    rgsm: FieldRule,
    rglb: FieldRule,
    sample_name: FieldRule,
    sample_merge_key: FieldRule,
    dna_rna_merge_key: FieldRule,
}

fn rule(
    value: &Option<String>,
    selector: &Option<String>,
    patterns: &Option<String>,
    flag: &str,
) -> Result<FieldRule> {
    Ok(FieldRule {
        value: value.clone(),
        selector: selector
            .as_deref()
            .map(FieldSelector::parse)
            .transpose()
            .with_context(|| format!("invalid --{flag}-field"))?,
        patterns: patterns
            .as_deref()
            .map(PatternTable::parse)
            .transpose()
            .with_context(|| format!("invalid --{flag}-pattern"))?,
    })
}

impl RuleSet {
    fn from_args(args: &Args) -> Result<RuleSet> {
        Ok(RuleSet {
            assay: rule(&args.assay, &args.assay_field, &args.assay_pattern, "assay")?,
            glprep: rule(&args.glprep, &None, &args.glprep_pattern, "glprep")?,
            gltype: rule(&args.gltype, &None, &args.gltype_pattern, "gltype")?,
            subgroup: rule(&args.subgroup, &None, &args.subgroup_pattern, "subgroup")?,
            rgsm: rule(&args.rgsm, &args.rgsm_field, &None, "rgsm")?,
            rglb: rule(&args.rglb, &args.rglb_field, &None, "rglb")?,
            sample_name: rule(&args.sample_name, &args.sample_name_field, &None, "sample-name")?,
            sample_merge_key: rule(
                &args.sample_merge_key,
                &args.sample_merge_key_field,
                &None,
                "sample-merge-key",
            )?,
            dna_rna_merge_key: rule(
                &args.dna_rna_merge_key,
                &args.dna_rna_merge_key_field,
                &None,
                "dna-rna-merge-key",
            )?,
        })
    }
}

/// Run the whole pipeline for one invocation. Returns an error on the
/// fatal conditions (no files found, unreadable fastq, bad configuration);
/// a failed submission is reported but does not fail the run, since the
/// manifest has already been written.
pub fn run(args: Args) -> Result<()> {
    let args = args.normalized();
    let splitter = Regex::new(&args.resplit)
        .with_context(|| format!("invalid --resplit regex {:?}", args.resplit))?;
    let rules = RuleSet::from_args(&args)?;

    let fastqs = discover::find_fastqs(&args.input, &args.read_pattern)?;
    let basenames = fastqs
        .iter()
        .map(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect_vec();

    // With a single file there is no shared prefix worth inferring, so the
    // project name stands in as the sample identity.
    let inferred_sample = if fastqs.len() > 1 {
        resolve::longest_common_prefix(&basenames)
    } else {
        args.name.clone()
    };

    let mut data_files = Vec::with_capacity(fastqs.len() * 2);
    for (fastq, basename) in fastqs.iter().zip(&basenames) {
        info!("parsing fastq: {}", fastq.display());
        let first = inspect::first_line(fastq)?;

        let number_of_reads = if args.no_compute {
            None
        } else {
            info!(
                "counting records in {}; interrupt and rerun with --no-compute to skip this scan",
                fastq.display()
            );
            Some(inspect::line_count(fastq)? / 2)
        };
        let read_length = inspect::max_line_len(fastq, inspect::READ_LENGTH_SCAN_LINES)?;

        let (flowcell, lane, rgbc) = if args.dummy {
            (
                "FLOWCELL".to_string(),
                "1".to_string(),
                resolve::dummy_barcode(&first),
            )
        } else {
            let header = inspect::HeaderFields::parse(&first, fastq)?;
            (header.flowcell, header.lane, header.barcode)
        };
        let rgpu = format!("{flowcell}_{lane}");
        let rgid = format!("{rgpu}_{rgbc}");

        let r1 = DataFile {
            assay_code: rules.assay.resolve_or(fastq, basename, &splitter, "KHWGS")?,
            fastq_code: "R1".to_string(),
            fastq_path: fastq.to_string_lossy().into_owned(),
            file_type: "fastq".to_string(),
            gl_prep: rules.glprep.resolve_or(fastq, basename, &splitter, "Genome")?,
            gl_type: rules.gltype.resolve_or(fastq, basename, &splitter, "Genome")?,
            flowcell,
            lane,
            number_of_reads,
            read1_length: read_length,
            read2_length: read_length,
            rgcn: args.center.clone().unwrap_or_else(|| "TGen".to_string()),
            rgpl: "ILLUMINA".to_string(),
            rgpm: args.model.clone().unwrap_or_else(|| "NovaSeq6000".to_string()),
            rgbc,
            rgpu,
            rgid,
            rgsm: rules.rgsm.resolve_or(fastq, basename, &splitter, &inferred_sample)?,
            rglb: rules.rglb.resolve_or(fastq, basename, &splitter, &inferred_sample)?,
            dna_rna_merge_key: rules
                .dna_rna_merge_key
                .resolve(fastq, basename, &splitter, None)?,
            sample_merge_key: rules
                .sample_merge_key
                .resolve(fastq, basename, &splitter, None)?,
            sample_name: rules
                .sample_name
                .resolve_or(fastq, basename, &splitter, &inferred_sample)?,
            sub_group: rules
                .subgroup
                .resolve_or(fastq, basename, &splitter, "Constitutional")?,
        };
        let r2 = r1.paired_r2(&discover::r2_path(fastq));
        data_files.push(r1);
        data_files.push(r2);
    }

    let tasks = manifest::template_tasks(args.template.as_deref())?;
    let manifest = Manifest {
        cram: args.cram,
        data_files,
        email: args.email.clone().unwrap_or_default(),
        ethnicity: "Unknown".to_string(),
        hpc_account: args.account.clone().unwrap_or_default(),
        isilon_path: args.isilon_path.clone().unwrap_or_default(),
        pipeline: args.pipeline.clone(),
        project: args.name.clone(),
        sex: args.sex.clone(),
        study: args.study.clone(),
        study_disease: String::new(),
        tasks,
    };

    let output_dir = args.output.clone().unwrap_or_else(|| PathBuf::from("."));
    let output_json = output_dir.join(format!("{}.json", args.name));
    manifest::write_manifest(&manifest, &output_json)?;
    info!("wrote {}", output_json.display());

    if args.submit {
        if args.dry_run {
            info!("dry run enabled, command to submit the json is:");
            println!(
                "{}",
                submit::curl_command(args.netrc.as_deref(), &output_json, &args.centro)
            );
        } else {
            match submit::submit(&output_json, &args.centro, args.netrc.as_deref()) {
                Ok(()) => info!(
                    "success! {} has been submitted to {}",
                    output_json.display(),
                    args.centro
                ),
                Err(err) => error!(
                    "{} was not accepted by {}: {err:#}",
                    output_json.display(),
                    args.centro
                ),
            }
        }
    }

    Ok(())
}
