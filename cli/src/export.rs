//! CSV export of the ranked results.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use cfst_common::network::candidate::FinalResult;

use crate::terminal::format;

const BOM: &[u8] = b"\xEF\xBB\xBF";
const HEADER: [&str; 5] = ["IP", "Colo", "Latency", "Speed_MB", "Score"];

/// Writes `results` to `path`, replacing any existing file.
pub fn write_csv_file(path: &Path, results: &[FinalResult]) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_csv(&mut writer, results).with_context(|| format!("failed to write {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))
}

/// Writes a byte-order mark, the header and one record per result.
pub fn write_csv<W: Write>(mut out: W, results: &[FinalResult]) -> anyhow::Result<()> {
    out.write_all(BOM)?;

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(HEADER)?;
    for result in results {
        let cells = format::cells(result);
        writer.write_record([
            cells.address,
            cells.pop,
            cells.latency,
            cells.speed,
            cells.score,
        ])?;
    }
    writer.flush()?;
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
