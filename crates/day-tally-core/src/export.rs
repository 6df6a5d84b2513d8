use std::io;
use std::path::Path;

use crate::error::Error;
use crate::tally::DailyCount;

/// Writes rows as `person,day,file_count` CSV to any writer.
pub fn write_rows<W: io::Write>(writer: W, rows: &[DailyCount]) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, rows: &[DailyCount]) -> Result<(), Error> {
    let file = std::fs::File::create(path)?;
    write_rows(file, rows)
}
