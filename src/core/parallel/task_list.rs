use parking_lot::Mutex;
use std::collections::VecDeque;
use std::ops::Range;

/// Elements per block before any scaling
pub const BASE_CHUNK_SIZE: usize = 64;

/// Block size for a pass over `elements` elements with `workers` workers
///
/// Small workloads use `base` sized blocks. Once there are more than twice as
/// many base blocks as workers, blocks grow with the log of the per-worker
/// block count: `2 * floor(log2(blocks / workers)) * base`.
pub fn chunk_size(elements: usize, workers: usize, base: usize) -> usize {
    let workers = workers.max(1);
    let base = base.max(1);
    let chunks = elements.div_ceil(base);
    if chunks > 2 * workers {
        let per_worker = chunks / workers;
        2 * per_worker.ilog2() as usize * base
    } else {
        base
    }
}

/// Entry of the work queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// Indices into the pass snapshot
    Block(Range<usize>),
    /// Tells one worker that no blocks are left this pass
    Poison,
}

/// Work queue for one pass: every block, then one poison per worker
#[derive(Debug)]
pub struct TaskList {
    items: Mutex<VecDeque<WorkItem>>,
    blocks: usize,
}

impl TaskList {
    pub fn new(elements: usize, chunk: usize, workers: usize) -> Self {
        let chunk = chunk.max(1);
        let mut items = VecDeque::with_capacity(elements.div_ceil(chunk) + workers);
        let mut start = 0;
        while start < elements {
            let end = (start + chunk).min(elements);
            items.push_back(WorkItem::Block(start..end));
            start = end;
        }
        let blocks = items.len();
        items.extend(std::iter::repeat(WorkItem::Poison).take(workers));
        Self {
            items: Mutex::new(items),
            blocks,
        }
    }

    /// Take the next item; `None` once the queue is drained
    pub fn next(&self) -> Option<WorkItem> {
        self.items.lock().pop_front()
    }

    pub fn blocks(&self) -> usize {
        self.blocks
    }

    pub fn remaining(&self) -> usize {
        self.items.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_workloads_use_base_chunk() {
        assert_eq!(chunk_size(0, 4, 64), 64);
        assert_eq!(chunk_size(100, 4, 64), 64);
        // 8 chunks, 4 workers: not more than twice the workers
        assert_eq!(chunk_size(512, 4, 64), 64);
    }

    #[test]
    fn test_large_workloads_scale_chunk() {
        // 9 chunks / 4 workers = 2 -> 2 * 1 * 64
        assert_eq!(chunk_size(576, 4, 64), 128);
        // 157 chunks / 4 workers = 39 -> 2 * 5 * 64
        assert_eq!(chunk_size(10_000, 4, 64), 640);
        // single worker, 16 chunks -> 2 * 4 * 64
        assert_eq!(chunk_size(1024, 1, 64), 512);
    }

    #[test]
    fn test_zero_workers_treated_as_one() {
        assert_eq!(chunk_size(1024, 0, 64), chunk_size(1024, 1, 64));
    }

    #[test]
    fn test_blocks_cover_every_index_once_then_poison() {
        let tasks = TaskList::new(130, 64, 3);
        assert_eq!(tasks.blocks(), 3);
        assert_eq!(tasks.next(), Some(WorkItem::Block(0..64)));
        assert_eq!(tasks.next(), Some(WorkItem::Block(64..128)));
        assert_eq!(tasks.next(), Some(WorkItem::Block(128..130)));
        for _ in 0..3 {
            assert_eq!(tasks.next(), Some(WorkItem::Poison));
        }
        assert_eq!(tasks.next(), None);
    }
}
