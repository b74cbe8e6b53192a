//! Record dump command

use super::{DecodeArgs, SplitArgs};
use dbfsplit::io::dbf::{DbfRecord, RecordScanner};
use dbfsplit::io::source::ReadSeek;
use dbfsplit::io::DbfReader;
use dbfsplit::parallel::open_split;
use dbfsplit::split::SplitPlanner;
use dbfsplit::{DbfError, Result};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Print records as TSV: a header row, then the physical record number
/// followed by every field value.
///
/// Usage: dbfsplit scan FILE [--split I [--records-per-split N]]
///                           [--encoding LABEL] [--strict] [--limit K]
pub fn run(
    file: &Path,
    split_index: Option<usize>,
    split_args: &SplitArgs,
    decode: &DecodeArgs,
    limit: Option<u64>,
) -> Result<()> {
    let options = decode.options()?;

    let mut scanner = match split_index {
        Some(index) => {
            let splits = SplitPlanner::new(split_args.config()?).plan_path(file)?;
            let split = splits.get(index).ok_or_else(|| {
                DbfError::InvalidConfig(format!(
                    "split {} out of range, {} has {} splits",
                    index,
                    file.display(),
                    splits.len()
                ))
            })?;
            open_split(split, &options)?
        }
        None => DbfReader::from_path_with(file, options)?.into_scanner(),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    dump(&mut scanner, &mut out, limit)?;
    out.flush()?;
    Ok(())
}

fn dump<W: Write>(
    scanner: &mut RecordScanner<Box<dyn ReadSeek + Send>>,
    out: &mut W,
    limit: Option<u64>,
) -> Result<()> {
    let names: Vec<&str> = scanner.header().fields().iter().map(|f| f.name()).collect();
    writeln!(out, "#\t{}", names.join("\t"))?;

    let mut written = 0u64;
    while limit.map_or(true, |limit| written < limit) {
        let Some(record) = scanner.next_record()? else {
            break;
        };
        write_record(out, &record)?;
        written += 1;
    }
    Ok(())
}

fn write_record<W: Write>(out: &mut W, record: &DbfRecord) -> io::Result<()> {
    write!(out, "{}", record.number())?;
    for value in record.values() {
        write!(out, "\t{}", value)?;
    }
    writeln!(out)
}
