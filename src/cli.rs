//! Command-line surface for `fastq2json`.

use std::path::PathBuf;

use clap::Parser;

/// Default submission endpoint for the run-orchestration service.
pub const DEFAULT_CENTRO_URL: &str = "http://jetstream-centro.ad.tgen.org:9000/api/v1/new-run/";

/// Arguments controlling manifest generation. Field-resolution flags come in
/// up to three forms: an explicit value applied to every file, a `*-field`
/// selector extracting tokens from the filename, and a `*-pattern` table
/// mapping glob patterns to values. An explicit value always wins.
#[derive(Parser, Debug, Clone)]
#[command(name = "fastq2json", version, arg_required_else_help = true)]
pub struct Args {
    /// Name of the json to generate, also becomes the name of the project
    /// when submitted
    #[arg(short = 'n', long, default_value = "EXAMPLE")]
    pub name: String,

    /// Input directory and prefix of the fastqs to process; may be given
    /// multiple times. Defaults to the current directory.
    #[arg(short = 'i', long, num_args = 1.., value_name = "/path/to/input_fastqs")]
    pub input: Vec<String>,

    /// Glob pattern for R1 fastqs. The R2 path is derived by replacing the
    /// last occurrence of R1 with R2.
    #[arg(
        long,
        visible_alias = "readPattern",
        default_value = "*R1*.fastq.gz",
        value_name = "readPattern"
    )]
    pub read_pattern: String,

    /// Output directory to place the {name}.json. Defaults to the current
    /// directory.
    #[arg(short = 'o', long, value_name = "/path/to/output/directory")]
    pub output: Option<PathBuf>,

    /// Path to a template json to copy task configuration from
    #[arg(short = 't', long, value_name = "/path/to/template.json")]
    pub template: Option<PathBuf>,

    /// Name of the study, e.g. MMRF, C4RCD, TCL, etc
    #[arg(short = 's', long, default_value = "STUDY", value_name = "STUDY")]
    pub study: String,

    /// Center the data originates from, defaults to TGen
    #[arg(short = 'c', long, value_name = "Center")]
    pub center: Option<String>,

    /// Platform model the data is from, defaults to NovaSeq6000
    #[arg(short = 'm', long, value_name = "PlatformModel")]
    pub model: Option<String>,

    /// If defined, this assayCode will be used for all data files
    #[arg(short = 'a', long, value_name = "ASSAY")]
    pub assay: Option<String>,

    /// Glob pattern table for assigning an assayCode, entries split on "=",
    /// e.g.: K1ID2="*_ID2_*",KHWGS="*_WGS_*"
    #[arg(long, value_name = "assayPattern")]
    pub assay_pattern: Option<String>,

    /// Filename field(s) used for the assayCode, assuming a uniform naming
    /// scheme. To extract ASSAY from
    /// STUDY_PATIENT_VISIT_SOURCE_FRACTION_SubgroupIncrement_ASSAY_LIBRARY.fastq.gz
    /// use: 7
    #[arg(long, value_name = "assayField")]
    pub assay_field: Option<String>,

    /// If defined, glPrep of all data files; Genome, Capture, or RNA in most
    /// cases
    #[arg(long, value_name = "glPrep")]
    pub glprep: Option<String>,

    /// Glob pattern table for assigning glPrep, e.g.: Genome="*WGS*",Capture="*WES*"
    #[arg(long, value_name = "glprepPattern")]
    pub glprep_pattern: Option<String>,

    /// If defined, glType of all data files; Genome, Exome, or RNA in most
    /// cases
    #[arg(long, value_name = "glType")]
    pub gltype: Option<String>,

    /// Glob pattern table for assigning glType, e.g.: Genome="*WGS*",Exome="*WES*"
    #[arg(long, value_name = "gltypePattern")]
    pub gltype_pattern: Option<String>,

    /// Sample type, Tumor or Constitutional
    #[arg(long, value_name = "subGroup")]
    pub subgroup: Option<String>,

    /// Glob pattern table for assigning subGroup, e.g.: Tumor="*_T1_*"
    #[arg(long, value_name = "subgroupPattern")]
    pub subgroup_pattern: Option<String>,

    /// If defined, dnaRnaMergeKey of all data files
    #[arg(long, value_name = "dnaRnaMergeKey")]
    pub dna_rna_merge_key: Option<String>,

    /// Filename field(s) used for the dnaRnaMergeKey, e.g.: 1,2,3,4,5 or 1-5
    #[arg(long, value_name = "dnaRnaMergeKeyField")]
    pub dna_rna_merge_key_field: Option<String>,

    /// If defined, sampleMergeKey of all data files
    #[arg(long, value_name = "sampleMergeKey")]
    pub sample_merge_key: Option<String>,

    /// Filename field(s) used for the sampleMergeKey, e.g.: 1-7
    #[arg(long, value_name = "sampleMergeKeyField")]
    pub sample_merge_key_field: Option<String>,

    /// If defined, sampleName of all data files
    #[arg(long, value_name = "sampleName")]
    pub sample_name: Option<String>,

    /// Filename field(s) used for the sampleName, e.g.: 1,2 or 1-2
    #[arg(long, value_name = "sampleNameField")]
    pub sample_name_field: Option<String>,

    /// If defined, rgsm of all data files
    #[arg(long, value_name = "rgsm")]
    pub rgsm: Option<String>,

    /// Filename field(s) used for the rgsm, e.g.: 1-5
    #[arg(long, value_name = "rgsmField")]
    pub rgsm_field: Option<String>,

    /// If defined, rglb of all data files
    #[arg(long, value_name = "rglb")]
    pub rglb: Option<String>,

    /// Filename field(s) used for the rglb, e.g.: 8
    #[arg(long, value_name = "rglbField")]
    pub rglb_field: Option<String>,

    /// Path to the results archive
    #[arg(short = 'P', long, value_name = "/path/to/project/results")]
    pub isilon_path: Option<String>,

    /// Name of the pipeline to run
    #[arg(short = 'p', long, default_value = "tempe@latest", value_name = "pipeline@version")]
    pub pipeline: String,

    /// Slurm account to bill to, defaults to $SBATCH_ACCOUNT
    #[arg(short = 'A', long, value_name = "hpcAccount")]
    pub account: Option<String>,

    /// Set the pipeline alignment output to cram instead of bam
    #[arg(short = 'C', long)]
    pub cram: bool,

    /// Sex of the sample, Male or Female
    #[arg(short = 'S', long, default_value = "Unknown")]
    pub sex: String,

    /// Use dummy values for the flowcell, lane and barcode fields
    #[arg(short = 'd', long)]
    pub dummy: bool,

    /// Your email; can also be a comma separated list
    #[arg(short = 'e', long)]
    pub email: Option<String>,

    /// Skip calculation heavy extractions from the fastq (record counts)
    #[arg(long, visible_alias = "noCompute")]
    pub no_compute: bool,

    /// Regex used for splitting the fastq name into fields. By default we
    /// split on "_" and "-".
    #[arg(long, default_value = "_|-", value_name = "'_|-'")]
    pub resplit: String,

    /// Submit the generated json to the run-orchestration service
    #[arg(long)]
    pub submit: bool,

    /// URL to submit the json to when --submit is enabled
    #[arg(long, default_value = DEFAULT_CENTRO_URL, value_name = "centro_url")]
    pub centro: String,

    /// Path to a netrc formatted file for authentication with the service
    #[arg(long, value_name = "/path/to/netrc")]
    pub netrc: Option<PathBuf>,

    /// Mock the submission, but generate the complete json
    #[arg(long, visible_alias = "dryRun")]
    pub dry_run: bool,
}

impl Args {
    /// Fill in the defaults that depend on the environment: current working
    /// directory for input/output, `$USER` for the email and results path,
    /// `$SBATCH_ACCOUNT` for the billing account.
    pub fn normalized(mut self) -> Self {
        let user = std::env::var("USER").unwrap_or_else(|_| String::from("nobody"));
        if self.input.is_empty() {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            self.input.push(format!("{}/", cwd.display()));
        }
        if self.output.is_none() {
            self.output = Some(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        }
        if self.account.is_none() {
            self.account = Some(std::env::var("SBATCH_ACCOUNT").unwrap_or_default());
        }
        if self.email.is_none() {
            self.email = Some(format!("{user}@tgen.org"));
        }
        if self.isilon_path.is_none() {
            self.isilon_path = Some(format!("/scratch/{user}/"));
        }
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["fastq2json", "--name", "TESTPROJ"]);
        assert_eq!(args.name, "TESTPROJ");
        assert_eq!(args.read_pattern, "*R1*.fastq.gz");
        assert_eq!(args.pipeline, "tempe@latest");
        assert_eq!(args.study, "STUDY");
        assert_eq!(args.sex, "Unknown");
        assert_eq!(args.resplit, "_|-");
        assert_eq!(args.centro, DEFAULT_CENTRO_URL);
        assert!(!args.cram);
        assert!(!args.submit);
    }

    #[test]
    fn test_original_flag_spellings_still_parse() {
        let args = Args::parse_from([
            "fastq2json",
            "--name",
            "P",
            "--readPattern",
            "*_1.fq.gz",
            "--noCompute",
            "--dryRun",
        ]);
        assert_eq!(args.read_pattern, "*_1.fq.gz");
        assert!(args.no_compute);
        assert!(args.dry_run);
    }

    #[test]
    fn test_normalized_fills_environment_defaults() {
        let args = Args::parse_from(["fastq2json", "--name", "TESTPROJ"]).normalized();
        assert!(!args.input.is_empty());
        assert!(args.output.is_some());
        assert!(args.account.is_some());
        assert!(args.email.as_ref().is_some_and(|e| e.contains('@')));
        assert!(args.isilon_path.as_ref().is_some_and(|p| p.starts_with("/scratch/")));
    }

    #[test]
    fn test_explicit_values_override_normalize() {
        let args = Args::parse_from([
            "fastq2json",
            "-n",
            "P",
            "-A",
            "rust_acct",
            "-e",
            "a@b.org,c@d.org",
        ])
        .normalized();
        assert_eq!(args.account.as_deref(), Some("rust_acct"));
        assert_eq!(args.email.as_deref(), Some("a@b.org,c@d.org"));
    }
}
