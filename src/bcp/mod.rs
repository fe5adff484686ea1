// src/bcp/mod.rs
//
// Decoder for the Charity Commission (England & Wales) data extract: a ZIP of
// `<table>.bcp` flat files using `@**@` between fields and `*@@*` between
// records. Each known table found in the archive is rewritten as
// `<dest>/<table>.csv` with its fixed header row.

pub mod pipeline;
pub mod schema;

use std::{
    fs::{self, File},
    io::{self, Cursor, Read, Seek, Write},
    path::{Path, PathBuf},
    time::Instant,
};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use zip::{result::ZipError, ZipArchive};

pub use schema::{TableSchema, TABLES};

#[derive(Debug, Error)]
pub enum BcpError {
    /// The archive could not be opened at all. Fatal for the whole pass.
    #[error("cannot read extract archive {origin}: {source}")]
    ArchiveUnreadable {
        origin: String,
        #[source]
        source: ZipError,
    },

    /// A known table has no member in the archive. Recoverable.
    #[error("did not find {member} in extract archive")]
    MemberMissing { member: String },

    /// The member exists but its compressed data could not be read.
    #[error("failed to read {member}: {source}")]
    MemberRead {
        member: String,
        #[source]
        source: io::Error,
    },

    /// The CSV could not be written. Fatal for this table only.
    #[error("failed to write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One table successfully written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedTable {
    pub table: &'static str,
    pub path: PathBuf,
    pub bytes_written: u64,
    /// Invalid UTF-8 in the member was replaced with U+FFFD.
    pub lossy: bool,
}

/// Outcome of one decode pass over an archive.
#[derive(Debug, Default)]
pub struct ConversionReport {
    pub converted: Vec<ConvertedTable>,
    pub missing: Vec<&'static str>,
    pub failed: Vec<(&'static str, BcpError)>,
}

impl ConversionReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.failed.is_empty()
    }
}

/// Decode the extract at `zip_path` into `dest_dir`.
#[instrument(level = "info", skip(zip_path, dest_dir), fields(zip = %zip_path.as_ref().display()))]
pub fn import_zip<P: AsRef<Path>, Q: AsRef<Path>>(
    zip_path: P,
    dest_dir: Q,
) -> Result<ConversionReport, BcpError> {
    let origin = zip_path.as_ref().display().to_string();
    let file = File::open(zip_path.as_ref()).map_err(|e| BcpError::ArchiveUnreadable {
        origin: origin.clone(),
        source: ZipError::Io(e),
    })?;
    import_archive(file, &origin, dest_dir)
}

/// Decode an extract already held in memory.
pub fn import_zip_bytes<Q: AsRef<Path>>(
    bytes: &[u8],
    dest_dir: Q,
) -> Result<ConversionReport, BcpError> {
    import_archive(Cursor::new(bytes), "<memory>", dest_dir)
}

/// Decode every known table present in `reader`, in registry order.
/// Only an unreadable archive is returned as an error; per-table problems
/// end up in the report.
pub fn import_archive<R: Read + Seek, Q: AsRef<Path>>(
    reader: R,
    origin: &str,
    dest_dir: Q,
) -> Result<ConversionReport, BcpError> {
    let start = Instant::now();
    let mut archive = ZipArchive::new(reader).map_err(|e| BcpError::ArchiveUnreadable {
        origin: origin.to_string(),
        source: e,
    })?;
    debug!(members = archive.len(), "opened extract archive");

    let dest_dir = dest_dir.as_ref();
    let mut report = ConversionReport::default();

    if let Err(e) = fs::create_dir_all(dest_dir) {
        // each table write will fail and be reported on its own
        error!(dir = %dest_dir.display(), error = %e, "cannot create destination");
    }

    for table in TABLES {
        match convert_table(&mut archive, table, dest_dir) {
            Ok(done) => {
                info!(table = table.name, bytes = done.bytes_written, lossy = done.lossy, "converted");
                report.converted.push(done);
            }
            Err(BcpError::MemberMissing { member }) => {
                warn!(%member, "did not find member in zip file");
                report.missing.push(table.name);
            }
            Err(e) => {
                error!(table = table.name, error = %e, "conversion failed");
                report.failed.push((table.name, e));
            }
        }
    }

    info!(
        converted = report.converted.len(),
        missing = report.missing.len(),
        failed = report.failed.len(),
        elapsed = ?start.elapsed(),
        "extract decoded"
    );
    Ok(report)
}

fn convert_table<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    table: &'static TableSchema,
    dest_dir: &Path,
) -> Result<ConvertedTable, BcpError> {
    let member = table.member_name();
    let mut buf = Vec::new();
    {
        let mut entry = match archive.by_name(&member) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Err(BcpError::MemberMissing { member }),
            Err(e) => {
                return Err(BcpError::MemberRead {
                    member,
                    source: io::Error::new(io::ErrorKind::InvalidData, e),
                })
            }
        };
        entry
            .read_to_end(&mut buf)
            .map_err(|source| BcpError::MemberRead {
                member: member.clone(),
                source,
            })?;
    }

    let (text, lossy) = pipeline::decode_lossy(&buf);
    if lossy {
        debug!(%member, "replaced invalid UTF-8 sequences");
    }
    let blob = pipeline::transcode(&text);

    let path = dest_dir.join(table.csv_name());
    let bytes_written = write_table(&path, table.columns, &blob)
        .map_err(|source| BcpError::OutputWrite {
            path: path.clone(),
            source,
        })?;

    Ok(ConvertedTable {
        table: table.name,
        path,
        bytes_written,
        lossy,
    })
}

/// Header as standard CSV followed by the transcoded blob, written in one
/// create-or-truncate.
fn write_table(path: &Path, columns: &[&str], blob: &str) -> io::Result<u64> {
    let mut header = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    header.write_record(columns).map_err(io::Error::from)?;
    let mut out = header
        .into_inner()
        .map_err(|e| io::Error::other(e.to_string()))?;
    out.extend_from_slice(blob.as_bytes());

    let mut file = File::create(path)?;
    file.write_all(&out)?;
    file.flush()?;
    Ok(out.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    fn build_zip(members: &[(&str, &[u8])]) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);
            for (name, data) in members {
                zip.start_file(*name, options)?;
                zip.write_all(data)?;
            }
            zip.finish()?;
        }
        Ok(buf)
    }

    #[test]
    fn single_field_single_record() -> Result<()> {
        let zip = build_zip(&[("extract_remove_ref.bcp", b"Removed".as_slice())])?;
        let dir = tempdir()?;
        let report = import_zip_bytes(&zip, dir.path())?;
        assert_eq!(report.converted.len(), 1);

        let out = fs::read_to_string(dir.path().join("extract_remove_ref.csv"))?;
        assert_eq!(out, "code,text\n\"Removed\"");
        Ok(())
    }

    #[test]
    fn class_ref_rows() -> Result<()> {
        let zip = build_zip(&[(
            "extract_class_ref.bcp",
            b"1@**@Education*@@*2@**@Health*@@*".as_slice(),
        )])?;
        let dir = tempdir()?;
        import_zip_bytes(&zip, dir.path())?;

        let out = fs::read_to_string(dir.path().join("extract_class_ref.csv"))?;
        assert_eq!(
            out,
            "classno,classtext\n\"1\",\"Education\"\n\"2\",\"Health\"\n\"\""
        );

        let mut rdr = csv::Reader::from_reader(out.as_bytes());
        let rows: Vec<Vec<String>> = rdr
            .records()
            .take(2)
            .map(|r| r.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<Result<_, _>>()?;
        assert_eq!(rows, vec![vec!["1", "Education"], vec!["2", "Health"]]);
        Ok(())
    }

    #[test]
    fn only_present_members_are_written() -> Result<()> {
        let zip = build_zip(&[("extract_trustee.bcp", b"200001@**@Jane Doe*@@*".as_slice())])?;
        let dir = tempdir()?;
        let report = import_zip_bytes(&zip, dir.path())?;

        assert_eq!(report.converted.len(), 1);
        assert_eq!(report.converted[0].table, "extract_trustee");
        assert_eq!(report.missing.len(), TABLES.len() - 1);
        assert!(!report.missing.contains(&"extract_trustee"));
        assert!(report.failed.is_empty());
        assert!(!report.is_complete());

        let files: Vec<_> = fs::read_dir(dir.path())?.collect::<Result<_, _>>()?;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name(), "extract_trustee.csv");
        Ok(())
    }

    #[test]
    fn invalid_utf8_is_replaced() -> Result<()> {
        let zip = build_zip(&[("extract_name.bcp", b"1@**@0@**@1@**@Caf\xe9 \xff\xfe".as_slice())])?;
        let dir = tempdir()?;
        let report = import_zip_bytes(&zip, dir.path())?;
        assert!(report.converted[0].lossy);

        let out = fs::read_to_string(dir.path().join("extract_name.csv"))?;
        assert!(out.starts_with("regno,subno,nameno,name\n"));
        assert!(out.contains('\u{FFFD}'));
        Ok(())
    }

    #[test]
    fn corrupt_archive_writes_nothing() -> Result<()> {
        let dir = tempdir()?;
        let dest = dir.path().join("ew");
        let err = import_zip_bytes(b"definitely not a zip file", &dest).unwrap_err();
        assert!(matches!(err, BcpError::ArchiveUnreadable { .. }));
        assert!(!dest.exists());
        Ok(())
    }

    #[test]
    fn missing_path_is_unreadable() {
        let dir = tempdir().unwrap();
        let err = import_zip(dir.path().join("nope.zip"), dir.path()).unwrap_err();
        assert!(matches!(err, BcpError::ArchiveUnreadable { .. }));
    }

    #[test]
    fn existing_output_is_recreated() -> Result<()> {
        let dir = tempdir()?;
        let target = dir.path().join("extract_class.csv");
        fs::write(&target, "stale content that is much longer than the new file")?;

        let zip = build_zip(&[("extract_class.bcp", b"100@**@101".as_slice())])?;
        import_zip_bytes(&zip, dir.path())?;
        assert_eq!(fs::read_to_string(&target)?, "regno,class\n\"100\",\"101\"");
        Ok(())
    }

    #[test]
    fn unwritable_table_does_not_stop_siblings() -> Result<()> {
        let dir = tempdir()?;
        // a directory where the CSV should go makes File::create fail
        fs::create_dir(dir.path().join("extract_class.csv"))?;

        let zip = build_zip(&[
            ("extract_class.bcp", b"1@**@2".as_slice()),
            ("extract_trustee.bcp", b"1@**@Someone".as_slice()),
        ])?;
        let report = import_zip_bytes(&zip, dir.path())?;
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "extract_class");
        assert!(matches!(report.failed[0].1, BcpError::OutputWrite { .. }));
        assert_eq!(report.converted.len(), 1);
        assert!(dir.path().join("extract_trustee.csv").is_file());
        Ok(())
    }

    #[test]
    fn unreadable_member_does_not_stop_siblings() -> Result<()> {
        let mut zip = Vec::new();
        {
            let mut w = zip::ZipWriter::new(Cursor::new(&mut zip));
            let options =
                SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
            w.start_file("extract_class.bcp", options)?;
            w.write_all(b"100001@**@101*@@*")?;
            w.start_file("extract_trustee.bcp", options)?;
            w.write_all(b"200002@**@Someone*@@*")?;
            w.finish()?;
        }
        // corrupt the stored class payload so its CRC no longer matches
        let at = zip
            .windows(6)
            .position(|w| w == b"100001")
            .expect("class payload");
        zip[at] ^= 0x01;

        let dir = tempdir()?;
        let report = import_zip_bytes(&zip, dir.path())?;
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "extract_class");
        assert!(matches!(report.failed[0].1, BcpError::MemberRead { .. }));
        let converted: Vec<_> = report.converted.iter().map(|t| t.table).collect();
        assert_eq!(converted, vec!["extract_trustee"]);
        assert!(!dir.path().join("extract_class.csv").exists());
        assert!(dir.path().join("extract_trustee.csv").is_file());
        Ok(())
    }

    #[test]
    fn unknown_members_are_ignored() -> Result<()> {
        let zip = build_zip(&[
            ("readme.txt", b"hello".as_slice()),
            ("extract_class.bcp", b"1@**@2".as_slice()),
        ])?;
        let dir = tempdir()?;
        let report = import_zip_bytes(&zip, dir.path())?;
        assert_eq!(report.converted.len(), 1);
        assert!(!dir.path().join("readme.csv").exists());
        Ok(())
    }
}
