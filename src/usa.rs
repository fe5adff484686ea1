// src/usa.rs
//
// IRS exempt-organisation business master files and the revocation list.

use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufWriter, Cursor, Read, Write},
    path::Path,
};
use tracing::{debug, info};
use zip::ZipArchive;

pub const REVOCATION_MEMBER: &str = "data-download-revocation.txt";

pub const REVOCATION_HEADER: [&str; 12] = [
    "EIN",
    "Legal_Name",
    "Doing_Business_As_Name",
    "Organization_Address",
    "City",
    "State",
    "ZIP_Code",
    "Country",
    "Exemption_Type",
    "Revocation_Date",
    "Revocation_Posting_Date",
    "Exemption_Reinstatement_Date",
];

/// Append the business files into one CSV. The first file is copied whole;
/// every later file loses its header line.
pub fn concat_business_files<W: Write>(parts: &[Vec<u8>], out: &mut W) -> Result<u64> {
    let mut written = 0u64;
    for (i, part) in parts.iter().enumerate() {
        let body: &[u8] = if i == 0 {
            part
        } else {
            match part.iter().position(|&b| b == b'\n') {
                Some(nl) => &part[nl + 1..],
                None => &[],
            }
        };
        if body.is_empty() {
            continue;
        }
        out.write_all(body)?;
        written += body.len() as u64;
        if !body.ends_with(b"\n") {
            out.write_all(b"\n")?;
            written += 1;
        }
    }
    debug!(parts = parts.len(), bytes = written, "concatenated business files");
    Ok(written)
}

/// Pull the pipe-delimited revocation list out of the downloaded ZIP.
pub fn revocation_text(zip_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(zip_bytes)).context("opening revocation ZIP")?;
    let mut entry = archive
        .by_name(REVOCATION_MEMBER)
        .with_context(|| format!("{REVOCATION_MEMBER} not in revocation ZIP"))?;
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Re-delimit the `|`-separated revocation list as CSV under a fixed header.
pub fn convert_revocations<W: Write>(pipe_text: &[u8], out: W) -> Result<usize> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(pipe_text);
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .flexible(true)
        .from_writer(out);

    wtr.write_record(REVOCATION_HEADER)?;
    let mut rows = 0;
    for record in rdr.byte_records() {
        let record = record.with_context(|| format!("revocation row {}", rows + 1))?;
        wtr.write_byte_record(&record)?;
        rows += 1;
    }
    wtr.flush()?;
    Ok(rows)
}

pub fn write_revocations(zip_bytes: &[u8], dest: &Path) -> Result<usize> {
    let text = revocation_text(zip_bytes)?;
    let file = File::create(dest).with_context(|| format!("creating {}", dest.display()))?;
    let rows = convert_revocations(&text, BufWriter::new(file))?;
    info!(path = %dest.display(), rows, "wrote revocations");
    Ok(rows)
}
