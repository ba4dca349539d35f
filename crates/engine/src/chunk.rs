//! A [`Chunk`] is a half-open byte range `[start, end)` of one file.
//!
//! `start` never changes after creation. `id` is reassigned exactly once, by
//! a split: spec.md states the new sibling inherits the victim's id, which
//! means the victim itself — the entity that physically continues in place,
//! same [`Chunk`], same in-flight worker if one is downloading it — takes a
//! fresh id instead. `end` only changes when the rebalancer shrinks a victim
//! chunk during a split. `done` advances as the owning worker streams bytes.
//! `worker` is the id of whichever worker last claimed the chunk —
//! display/forensics only, never consulted on resume.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use storage::ChunkRecord;

/// Sentinel stored in a chunk's `worker` field before any worker has claimed it.
pub const NO_WORKER: u32 = 0;

#[derive(Debug)]
pub struct Chunk {
    id: AtomicU32,
    pub start: u64,
    end: AtomicU64,
    done: AtomicU64,
    worker: AtomicU32,
}

impl Chunk {
    pub fn new(id: u32, start: u64, end: u64, done: u64) -> Self {
        Self {
            id: AtomicU32::new(id),
            start,
            end: AtomicU64::new(end),
            done: AtomicU64::new(done),
            worker: AtomicU32::new(NO_WORKER),
        }
    }

    pub fn id(&self) -> u32 {
        self.id.load(Ordering::Relaxed)
    }

    /// Reassigns this chunk's id. Used only by a split (spec.md: "the new
    /// sibling inherits the victim's id") to hand the victim a fresh id
    /// while the brand-new [`Chunk`] enqueued as a job keeps the old one.
    /// Caller must hold the file's chunk-list mutex.
    pub fn set_id(&self, id: u32) {
        self.id.store(id, Ordering::Relaxed);
    }

    /// Total bytes this chunk covers, recomputed from its current `end` — the
    /// wire format stores `total` explicitly, but for a live chunk it is
    /// always exactly `end - start`, so there is nothing to keep in sync.
    pub fn total(&self) -> u64 {
        self.end.load(Ordering::Relaxed) - self.start
    }

    pub fn end(&self) -> u64 {
        self.end.load(Ordering::Relaxed)
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    pub fn remaining(&self) -> u64 {
        self.total() - self.done()
    }

    pub fn is_complete(&self) -> bool {
        self.done() >= self.total()
    }

    /// Next byte offset a worker should resume this chunk's GET from.
    pub fn resume_position(&self) -> u64 {
        self.start + self.done()
    }

    pub fn add_done(&self, n: u64) {
        self.done.fetch_add(n, Ordering::Relaxed);
    }

    pub fn set_worker(&self, worker_id: u32) {
        self.worker.store(worker_id, Ordering::Relaxed);
    }

    pub fn worker(&self) -> u32 {
        self.worker.load(Ordering::Relaxed)
    }

    /// True if this chunk is an "active connection": a worker has started
    /// writing to it but hasn't finished (glossary: "a chunk whose `done` is
    /// strictly between `0` and `total`").
    pub fn is_active(&self) -> bool {
        let done = self.done();
        done > 0 && done < self.total()
    }

    pub fn to_record(&self) -> ChunkRecord {
        ChunkRecord {
            id: self.id(),
            worker: self.worker(),
            start: self.start,
            end: self.end(),
            done: self.done(),
            total: self.total(),
        }
    }

    /// Shrinks this chunk's `end` to `mid`, the victim side of a split.
    /// Caller must hold the file's chunk-list mutex.
    pub fn shrink_end_to(&self, mid: u64) {
        self.end.store(mid, Ordering::Relaxed);
    }
}

/// Builds the fresh-download chunk list for a file that has no usable
/// sidecar: one chunk covering the whole file if ranges aren't supported,
/// otherwise `chunk_count` roughly-equal chunks with the last absorbing the
/// remainder (spec §4.2).
pub fn fresh_chunks(content_length: u64, chunk_count: usize, supports_ranges: bool) -> Vec<Chunk> {
    if !supports_ranges || chunk_count <= 1 {
        return vec![Chunk::new(0, 0, content_length, 0)];
    }

    let chunk_count = chunk_count as u64;
    let size = content_length / chunk_count;

    (0..chunk_count)
        .map(|i| {
            let start = i * size;
            let end = if i == chunk_count - 1 {
                content_length
            } else {
                start + size
            };
            Chunk::new(i as u32, start, end, 0)
        })
        .collect()
}

/// Rebuilds the live chunk list from decoded sidecar records, advancing each
/// chunk's `start` past what was already downloaded (spec §4.2's resume
/// path), then splits the largest remaining chunk repeatedly until the list
/// has at least `target_count` entries — honoring a per-file connection
/// count that increased since the sidecar was written.
pub fn resume_chunks(records: Vec<ChunkRecord>, target_count: usize) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = records
        .into_iter()
        .map(|r| Chunk::new(r.id, r.start + r.done, r.end, 0))
        .collect();

    let mut next_id = chunks.iter().map(|c| c.id()).max().map_or(0, |m| m + 1);

    while chunks.len() < target_count {
        let Some((idx, _)) = chunks
            .iter()
            .enumerate()
            .max_by_key(|(_, c)| c.remaining())
        else {
            break;
        };

        if chunks[idx].remaining() < 2 {
            break;
        }

        let victim = &chunks[idx];
        let mid = victim.start + victim.remaining() / 2;
        // Spec: "the new sibling inherits the victim's id" — the victim (the
        // entity that keeps its start and stays in place) takes the fresh id.
        let sibling = Chunk::new(victim.id(), mid, victim.end(), 0);
        victim.set_id(next_id);
        next_id += 1;
        victim.shrink_end_to(mid);
        chunks.push(sibling);
    }

    chunks.sort_by_key(|c| c.start);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_chunks_cover_whole_file_without_ranges() {
        let chunks = fresh_chunks(1000, 4, false);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].end(), 1000);
    }

    #[test]
    fn fresh_chunks_split_evenly_with_last_absorbing_remainder() {
        let chunks = fresh_chunks(1001, 4, true);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].end(), 250);
        assert_eq!(chunks[1].start, 250);
        assert_eq!(chunks[1].end(), 500);
        assert_eq!(chunks[2].start, 500);
        assert_eq!(chunks[2].end(), 750);
        assert_eq!(chunks[3].start, 750);
        assert_eq!(chunks[3].end(), 1001);

        let total: u64 = chunks.iter().map(|c| c.total()).sum();
        assert_eq!(total, 1001);
    }

    #[test]
    fn fresh_chunks_cover_with_no_gaps() {
        let chunks = fresh_chunks(8_388_608, 8, true);
        for w in chunks.windows(2) {
            assert_eq!(w[0].end(), w[1].start);
        }
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks.last().unwrap().end(), 8_388_608);
    }

    #[test]
    fn resume_chunks_preserves_ranges_when_count_matches() {
        let records = vec![
            ChunkRecord {
                id: 0,
                worker: 0,
                start: 0,
                end: 100,
                done: 0,
                total: 100,
            },
            ChunkRecord {
                id: 1,
                worker: 0,
                start: 100,
                end: 200,
                done: 0,
                total: 100,
            },
            ChunkRecord {
                id: 2,
                worker: 0,
                start: 200,
                end: 300,
                done: 0,
                total: 100,
            },
        ];

        let chunks = resume_chunks(records, 3);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].end(), 100);
        assert_eq!(chunks[2].start, 200);
        assert_eq!(chunks[2].end(), 300);
    }

    #[test]
    fn resume_chunks_advances_start_past_done_bytes() {
        let records = vec![ChunkRecord {
            id: 0,
            worker: 3,
            start: 0,
            end: 1000,
            done: 400,
            total: 1000,
        }];

        let chunks = resume_chunks(records, 1);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start, 400);
        assert_eq!(chunks[0].end(), 1000);
        assert_eq!(chunks[0].done(), 0);
        assert_eq!(chunks[0].total(), 600);
    }

    #[test]
    fn resume_chunks_splits_up_to_requested_count() {
        // three 100-byte chunks, first two half-done, matches spec §8 scenario 5
        let records = vec![
            ChunkRecord {
                id: 0,
                worker: 0,
                start: 0,
                end: 100,
                done: 50,
                total: 100,
            },
            ChunkRecord {
                id: 1,
                worker: 0,
                start: 100,
                end: 200,
                done: 50,
                total: 100,
            },
            ChunkRecord {
                id: 2,
                worker: 0,
                start: 200,
                end: 300,
                done: 0,
                total: 100,
            },
        ];

        let chunks = resume_chunks(records, 4);
        assert_eq!(chunks.len(), 4);

        // union of ranges is unchanged: [50,100) [150,200) [50,150)? let's just
        // check total coverage remains [50, 300) with no gaps/overlaps.
        let mut ranges: Vec<(u64, u64)> = chunks.iter().map(|c| (c.start, c.end())).collect();
        ranges.sort();
        assert_eq!(ranges[0].0, 50);
        for w in ranges.windows(2) {
            assert_eq!(w[0].1, w[1].0);
        }
        assert_eq!(ranges.last().unwrap().1, 300);
    }

    #[test]
    fn resume_split_gives_the_new_sibling_the_victims_old_id() {
        let records = vec![ChunkRecord {
            id: 0,
            worker: 0,
            start: 0,
            end: 1000,
            done: 0,
            total: 1000,
        }];

        let chunks = resume_chunks(records, 2);
        assert_eq!(chunks.len(), 2);

        let left = chunks.iter().find(|c| c.start == 0).unwrap();
        let right = chunks.iter().find(|c| c.start == 500).unwrap();
        // the victim (left, stays in place) gets the fresh id; the new
        // sibling (right) inherits the id the victim had before the split.
        assert_eq!(right.id(), 0);
        assert_eq!(left.id(), 1);
    }

    #[test]
    fn chunk_completion_tracking() {
        let chunk = Chunk::new(0, 0, 1000, 0);
        assert_eq!(chunk.total(), 1000);
        assert!(!chunk.is_complete());
        assert!(!chunk.is_active());

        chunk.add_done(500);
        assert_eq!(chunk.remaining(), 500);
        assert_eq!(chunk.resume_position(), 500);
        assert!(chunk.is_active());
        assert!(!chunk.is_complete());

        chunk.add_done(500);
        assert!(chunk.is_complete());
        assert!(!chunk.is_active());
    }

    #[test]
    fn split_preserves_union_of_byte_range() {
        let victim = Chunk::new(0, 0, 1000, 200);
        let remaining = victim.remaining();
        let mid = victim.start + victim.done() + remaining / 2;
        let old_end = victim.end();

        victim.shrink_end_to(mid);
        let sibling = Chunk::new(1, mid, old_end, 0);

        assert_eq!(victim.end(), mid);
        assert_eq!(sibling.start, mid);
        assert_eq!(sibling.end(), old_end);
    }
}
