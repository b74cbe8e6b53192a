//! Storage block locations and per-split host hints.
//!
//! A split prefers to run on the hosts that already store the bytes it
//! covers. Block metadata comes from a [`BlockLocator`]; the planner only asks
//! for it once per file and never reads the record region itself.

use crate::error::Result;
use std::collections::HashMap;
use std::path::Path;

/// One storage block of a file and the hosts holding a replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLocation {
    pub offset: u64,
    pub length: u64,
    pub hosts: Vec<String>,
}

impl BlockLocation {
    pub fn new(offset: u64, length: u64, hosts: Vec<String>) -> Self {
        BlockLocation {
            offset,
            length,
            hosts,
        }
    }

    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }

    /// Bytes shared with `[start, end)`.
    pub fn overlap(&self, start: u64, end: u64) -> u64 {
        self.end().min(end).saturating_sub(self.offset.max(start))
    }
}

/// Source of block-location metadata for a file.
pub trait BlockLocator {
    fn block_locations(&self, path: &Path, file_length: u64) -> Result<Vec<BlockLocation>>;
}

/// Local file system: the whole file is one block on `localhost`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBlockLocator;

impl BlockLocator for LocalBlockLocator {
    fn block_locations(&self, _path: &Path, file_length: u64) -> Result<Vec<BlockLocation>> {
        Ok(vec![BlockLocation::new(
            0,
            file_length,
            vec!["localhost".to_string()],
        )])
    }
}

/// Hosts storing any byte of `[start, start + length)`, most overlapping first.
///
/// Hosts with equal overlap keep the order in which they were first seen.
/// An empty range takes the hosts of the block containing `start`.
pub fn split_hosts(blocks: &[BlockLocation], start: u64, length: u64) -> Vec<String> {
    if length == 0 {
        return blocks
            .iter()
            .find(|b| b.offset <= start && start < b.end())
            .or_else(|| blocks.last().filter(|b| b.end() == start))
            .map(|b| b.hosts.clone())
            .unwrap_or_default();
    }

    let end = start.saturating_add(length);
    let mut order: Vec<&str> = Vec::new();
    let mut weight: HashMap<&str, u64> = HashMap::new();
    for block in blocks {
        let shared = block.overlap(start, end);
        if shared == 0 {
            continue;
        }
        for host in &block.hosts {
            let entry = weight.entry(host.as_str()).or_insert_with(|| {
                order.push(host.as_str());
                0
            });
            *entry = entry.saturating_add(shared);
        }
    }

    // sort_by is stable, so ties stay in first-seen order
    order.sort_by(|a, b| weight[b].cmp(&weight[a]));
    order.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks() -> Vec<BlockLocation> {
        vec![
            BlockLocation::new(0, 100, vec!["a".into(), "b".into()]),
            BlockLocation::new(100, 100, vec!["b".into(), "c".into()]),
            BlockLocation::new(200, 50, vec!["d".into()]),
        ]
    }

    #[test]
    fn test_overlap() {
        let block = BlockLocation::new(100, 100, vec![]);
        assert_eq!(block.overlap(0, 100), 0);
        assert_eq!(block.overlap(150, 400), 50);
        assert_eq!(block.overlap(120, 130), 10);
    }

    #[test]
    fn test_end_saturates() {
        let block = BlockLocation::new(u64::MAX - 10, 100, vec!["a".to_string()]);
        assert_eq!(block.end(), u64::MAX);
        assert_eq!(block.overlap(u64::MAX - 5, u64::MAX), 5);
        assert_eq!(split_hosts(&[block], u64::MAX - 4, 2), vec!["a"]);
    }

    #[test]
    fn test_hosts_ordered_by_overlap() {
        // a: 10, b: 10 + 60, c: 60
        assert_eq!(split_hosts(&blocks(), 90, 70), vec!["b", "c", "a"]);
        // d covers 40 bytes, b and c only 10
        assert_eq!(split_hosts(&blocks(), 190, 50), vec!["d", "b", "c"]);
    }

    #[test]
    fn test_single_block() {
        assert_eq!(split_hosts(&blocks(), 10, 20), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_range() {
        assert_eq!(split_hosts(&blocks(), 100, 0), vec!["b", "c"]);
        assert_eq!(split_hosts(&blocks(), 250, 0), vec!["d"]);
        assert!(split_hosts(&[], 0, 0).is_empty());
    }

    #[test]
    fn test_local_locator() {
        let located = LocalBlockLocator
            .block_locations(Path::new("x.dbf"), 4096)
            .unwrap();
        assert_eq!(located, vec![BlockLocation::new(0, 4096, vec!["localhost".into()])]);
    }
}
