//! Halt-save snapshot framing.
//!
//! A snapshot is the whole job table as a bincode-framed sequence of
//! records: a record count, then per record the 16 UUID bytes
//! (length-prefixed), the length-prefixed UTF-8 command, and the status
//! as its integer code. The format round-trips with itself; nothing else
//! reads it.

use std::path::Path;

use crate::error::Result;
use crate::scheduler::job::Job;

pub fn write_records(path: &Path, records: &[Job]) -> Result<()> {
    let bytes = bincode::serialize(records)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

pub fn read_records(path: &Path) -> Result<Vec<Job>> {
    let bytes = std::fs::read(path)?;
    Ok(bincode::deserialize(&bytes)?)
}
