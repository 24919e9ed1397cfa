//! Latency sample collection and the tab-separated stats format.
//!
//! The file layout is kept compatible with the existing analysis scripts:
//! a `ORDER\tLATENCY\tABS\tTYPE` header, then one row per request with
//! times in microseconds. `ABS` is measured from the first sample in the
//! file and `TYPE` is always `global`.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use canopy_types::RequestId;
use tracing::info;

use crate::error::Result;

/// One completed request, timed against the run epoch.
#[derive(Debug, Clone)]
pub struct Sample {
    /// The submitted request.
    pub id: RequestId,

    /// Microseconds from the run epoch when the request was submitted.
    pub before_micros: u64,

    /// Microseconds from the run epoch when the response arrived.
    pub after_micros: u64,
}

impl Sample {
    /// Round-trip latency in microseconds.
    pub fn latency_micros(&self) -> u64 {
        self.after_micros.saturating_sub(self.before_micros)
    }
}

/// Writes one client's samples in the tab-separated format.
pub fn write_stats<W: Write>(writer: &mut W, samples: &[Sample]) -> Result<()> {
    writeln!(writer, "ORDER\tLATENCY\tABS\tTYPE")?;

    let Some(first) = samples.first() else {
        return Ok(());
    };
    let start = first.before_micros;

    for (index, sample) in samples.iter().enumerate() {
        writeln!(
            writer,
            "{}\t{}\t{}\tglobal",
            index + 1,
            sample.latency_micros(),
            sample.after_micros.saturating_sub(start),
        )?;
    }

    Ok(())
}

/// Writes one stats file per client plus a merged file into `dir`,
/// returning the written paths.
///
/// The merged file interleaves all clients' samples in submission order.
pub fn write_stats_dir(dir: impl AsRef<Path>, per_client: &[Vec<Sample>]) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(per_client.len() + 1);
    for (client, samples) in per_client.iter().enumerate() {
        let path = dir.join(format!("stats-{client:04}.txt"));
        let mut file = BufWriter::new(fs::File::create(&path)?);
        write_stats(&mut file, samples)?;
        file.flush()?;
        written.push(path);
    }

    let mut merged: Vec<Sample> = per_client.iter().flatten().cloned().collect();
    merged.sort_by_key(|sample| sample.before_micros);

    let path = dir.join("stats-all.txt");
    let mut file = BufWriter::new(fs::File::create(&path)?);
    write_stats(&mut file, &merged)?;
    file.flush()?;
    written.push(path);

    info!(dir = %dir.display(), files = written.len(), "wrote stats files");
    Ok(written)
}
