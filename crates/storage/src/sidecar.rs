use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Size in bytes of one serialized [`ChunkRecord`]: 2 `u32`s + 4 `u64`s.
const RECORD_SIZE: u64 = 4 + 4 + 8 + 8 + 8 + 8;

/// On-disk representation of a single chunk's progress.
///
/// Field order matches the wire format exactly: `id, worker, start, end,
/// done, total`. `worker` is forensic only — see [`read_sidecar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRecord {
    pub id: u32,
    pub worker: u32,
    pub start: u64,
    pub end: u64,
    pub done: u64,
    pub total: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SidecarError {
    #[error("sidecar is not resumable: {0}")]
    NotResumable(String),
    #[error("I/O error writing sidecar: {0}")]
    Write(#[source] io::Error),
}

impl ChunkRecord {
    fn read<R: Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            id: r.read_u32::<BigEndian>()?,
            worker: r.read_u32::<BigEndian>()?,
            start: r.read_u64::<BigEndian>()?,
            end: r.read_u64::<BigEndian>()?,
            done: r.read_u64::<BigEndian>()?,
            total: r.read_u64::<BigEndian>()?,
        })
    }

    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<BigEndian>(self.id)?;
        w.write_u32::<BigEndian>(self.worker)?;
        w.write_u64::<BigEndian>(self.start)?;
        w.write_u64::<BigEndian>(self.end)?;
        w.write_u64::<BigEndian>(self.done)?;
        w.write_u64::<BigEndian>(self.total)?;
        Ok(())
    }
}

/// Reads a sidecar file and returns its chunk records, sorted by `start`.
///
/// Any I/O failure, short read, or a declared `chunk_count` that doesn't fit
/// the remaining file length is folded into [`SidecarError::NotResumable`]
/// rather than propagated — a torn or partial sidecar must never abort the
/// download, only disable resume for that file (spec §4.1, §7).
pub fn read_sidecar(path: &Path) -> Result<Vec<ChunkRecord>, SidecarError> {
    let mut file = File::open(path).map_err(|e| SidecarError::NotResumable(e.to_string()))?;

    let metadata_len = file
        .metadata()
        .map_err(|e| SidecarError::NotResumable(e.to_string()))?
        .len();

    let count = file
        .read_u64::<BigEndian>()
        .map_err(|e| SidecarError::NotResumable(e.to_string()))?;

    let expected_len = 8 + count.saturating_mul(RECORD_SIZE);
    if expected_len != metadata_len {
        return Err(SidecarError::NotResumable(format!(
            "expected {expected_len} bytes for {count} records, file is {metadata_len} bytes"
        )));
    }

    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let record =
            ChunkRecord::read(&mut file).map_err(|e| SidecarError::NotResumable(e.to_string()))?;
        records.push(record);
    }

    records.sort_by_key(|r| r.start);
    Ok(records)
}

/// Overwrites the sidecar at `path` with `records`.
///
/// Writes are whole-file truncate + write; this is best-effort atomic. A
/// crash mid-write leaves a torn file that [`read_sidecar`] will reject as
/// not resumable, which is the documented fallback (spec §4.1).
pub fn write_sidecar(path: &Path, records: &[ChunkRecord]) -> Result<(), SidecarError> {
    let mut file = File::create(path).map_err(SidecarError::Write)?;

    file.write_u64::<BigEndian>(records.len() as u64)
        .map_err(SidecarError::Write)?;

    for record in records {
        record.write(&mut file).map_err(SidecarError::Write)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Vec<ChunkRecord> {
        vec![
            ChunkRecord {
                id: 0,
                worker: 0,
                start: 0,
                end: 99,
                done: 50,
                total: 100,
            },
            ChunkRecord {
                id: 1,
                worker: 2,
                start: 100,
                end: 199,
                done: 0,
                total: 100,
            },
        ]
    }

    #[test]
    fn round_trips_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("work.gx");

        write_sidecar(&path, &sample()).unwrap();
        let read_back = read_sidecar(&path).unwrap();

        assert_eq!(read_back, sample());
    }

    #[test]
    fn round_trip_is_sorted_by_start() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("work.gx");

        let mut reversed = sample();
        reversed.reverse();
        write_sidecar(&path, &reversed).unwrap();

        let read_back = read_sidecar(&path).unwrap();
        assert_eq!(read_back, sample());
    }

    #[test]
    fn missing_file_is_not_resumable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.gx");

        let err = read_sidecar(&path).unwrap_err();
        assert!(matches!(err, SidecarError::NotResumable(_)));
    }

    #[test]
    fn truncated_file_is_not_resumable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("work.gx");

        write_sidecar(&path, &sample()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

        let err = read_sidecar(&path).unwrap_err();
        assert!(matches!(err, SidecarError::NotResumable(_)));
    }

    #[test]
    fn empty_sidecar_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.gx");

        write_sidecar(&path, &[]).unwrap();
        let read_back = read_sidecar(&path).unwrap();
        assert!(read_back.is_empty());
    }
}
