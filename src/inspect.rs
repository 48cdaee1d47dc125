//! Pull sequencing metadata out of gzipped FASTQ content: the instrument
//! header line, the record count, and the read length.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use flate2::read::MultiGzDecoder;

const GZ_CHUNK_SIZE: usize = 1 << 16;

/// Number of decompressed lines scanned when measuring the read length.
pub const READ_LENGTH_SCAN_LINES: usize = 1000;

fn open_gz(path: &Path) -> Result<MultiGzDecoder<File>> {
    let f = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(MultiGzDecoder::new(f))
}

/// First decompressed line of the file, stripped of the line terminator.
pub fn first_line(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(open_gz(path)?);
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

/// Count newlines across the whole decompressed stream, reading in fixed
/// size chunks so the file is never materialized in memory.
pub fn line_count(path: &Path) -> Result<u64> {
    let mut reader = open_gz(path)?;
    let mut buf = [0u8; GZ_CHUNK_SIZE];
    let mut count = 0u64;
    loop {
        let n = reader
            .read(&mut buf)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        if n == 0 {
            break;
        }
        count += buf[..n].iter().filter(|&&b| b == b'\n').count() as u64;
    }
    Ok(count)
}

/// Longest line (in bytes, excluding the terminator) among the first
/// `limit` decompressed lines. On FASTQ input the sequence lines dominate,
/// so this measures the read length.
pub fn max_line_len(path: &Path, limit: usize) -> Result<u64> {
    let reader = BufReader::new(open_gz(path)?);
    let mut max = 0u64;
    for line in reader.lines().take(limit) {
        let line = line.with_context(|| format!("failed to decode {}", path.display()))?;
        max = max.max(line.len() as u64);
    }
    Ok(max)
}

/// Fields of interest from an Illumina instrument header, e.g.
/// `@A00422:424:HNOFFDSXY:1:2101:2320:1000 1:N:0:GATTACA+TTGCAACT`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderFields {
    pub flowcell: String,
    pub lane: String,
    /// Index sequence; dual indexes are joined with `-` instead of the
    /// instrument's `+`.
    pub barcode: String,
}

impl HeaderFields {
    pub fn parse(line: &str, path: &Path) -> Result<HeaderFields> {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() < 10 {
            bail!(
                "malformed header in {}: expected at least 10 ':' delimited fields, got {}",
                path.display(),
                fields.len()
            );
        }
        Ok(HeaderFields {
            flowcell: fields[2].to_string(),
            lane: fields[3].to_string(),
            barcode: fields[9].replace('+', "-"),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::path::PathBuf;

    const HEADER: &str = "@A00422:424:HNOFFDSXY:1:2101:2320:1000 1:N:0:GATTACA+TTGCAACT";

    fn write_fastq_gz(dir: &Path, name: &str, records: usize, read_len: usize) -> PathBuf {
        let path = dir.join(name);
        let f = File::create(&path).unwrap();
        let mut gz = GzEncoder::new(f, Compression::default());
        for _ in 0..records {
            writeln!(gz, "{HEADER}").unwrap();
            writeln!(gz, "{}", "A".repeat(read_len)).unwrap();
            writeln!(gz, "+").unwrap();
            writeln!(gz, "{}", "F".repeat(read_len)).unwrap();
        }
        gz.finish().unwrap();
        path
    }

    #[test]
    fn test_first_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fastq_gz(dir.path(), "a_R1.fastq.gz", 2, 10);
        assert_eq!(first_line(&path).unwrap(), HEADER);
    }

    #[test]
    fn test_line_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fastq_gz(dir.path(), "a_R1.fastq.gz", 25, 10);
        assert_eq!(line_count(&path).unwrap(), 100);
    }

    #[test]
    fn test_max_line_len() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fastq_gz(dir.path(), "a_R1.fastq.gz", 3, 151);
        assert_eq!(max_line_len(&path, READ_LENGTH_SCAN_LINES).unwrap(), 151);
        // A bounded scan only sees the prefix
        assert_eq!(max_line_len(&path, 1).unwrap(), HEADER.len() as u64);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = first_line(Path::new("/nonexistent/a_R1.fastq.gz")).unwrap_err();
        assert!(err.to_string().contains("failed to open"));
    }

    #[test]
    fn test_parse_header_fields() {
        let fields = HeaderFields::parse(HEADER, Path::new("a_R1.fastq.gz")).unwrap();
        assert_eq!(
            fields,
            HeaderFields {
                flowcell: "HNOFFDSXY".to_string(),
                lane: "1".to_string(),
                barcode: "GATTACA-TTGCAACT".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_header_single_index() {
        let line = "@A00422:424:HNOFFDSXY:3:2101:2320:1000 1:N:0:GATTACA";
        let fields = HeaderFields::parse(line, Path::new("a_R1.fastq.gz")).unwrap();
        assert_eq!(fields.lane, "3");
        assert_eq!(fields.barcode, "GATTACA");
    }

    #[test]
    fn test_parse_header_too_few_fields() {
        let err = HeaderFields::parse("@SRR000001.1 1", Path::new("a_R1.fastq.gz")).unwrap_err();
        assert!(err.to_string().contains("malformed header"));
    }
}
