//! Sliding window reader — overlapping lazy text blocks.
//!
//! License notices do not respect block boundaries, so every block after
//! the first is the concatenation of the previous chunk and the current
//! one: any phrase shorter than a chunk is guaranteed to appear intact in
//! at least one block. Blocks are produced on demand from a streaming
//! reader and the stream is consumed; there is no rewinding.
//!
//! Chunks are cut at byte granularity and decoded lossily, so a multibyte
//! sequence split at a boundary degrades to replacement characters. The
//! texts the rules target are ASCII.

use crate::scanner::normalize::clean_block;
use std::io::Read;

pub const DEFAULT_BLOCK_SIZE: usize = 4096;
/// Larger window for JavaScript that may still carry a license header
/// ahead of generated content.
pub const JS_BLOCK_SIZE: usize = 8092;

/// In-place adjustment applied to each decoded chunk before windowing.
pub type ChunkTransform = fn(&mut String);

/// One window over file content.
#[derive(Debug)]
pub struct ScanBlock {
    /// Window text: previous chunk plus current chunk.
    pub raw: String,
    /// Zero-based count of reads so far, not a byte offset.
    pub index: usize,
    cleaned: Option<String>,
}

impl ScanBlock {
    pub fn new(raw: String, index: usize) -> Self {
        Self {
            raw,
            index,
            cleaned: None,
        }
    }

    /// Normalized window text, computed at most once and cached.
    pub fn cleaned(&mut self) -> &str {
        if self.cleaned.is_none() {
            self.cleaned = Some(clean_block(&self.raw));
        }
        self.cleaned.as_deref().unwrap_or_default()
    }
}

/// Streaming block producer over any reader.
pub struct BlockReader<R: Read> {
    source: R,
    block_size: usize,
    transform: Option<ChunkTransform>,
    carry: Option<String>,
    next_index: usize,
    finished: bool,
}

impl<R: Read> BlockReader<R> {
    pub fn new(source: R, block_size: usize) -> Self {
        Self {
            source,
            block_size: block_size.max(1),
            transform: None,
            carry: None,
            next_index: 0,
            finished: false,
        }
    }

    /// Install a per-chunk transform, applied before the chunk enters any
    /// window. The license scan lowercases here so keyword, sentence, and
    /// regex stages all see the same case.
    pub fn with_transform(source: R, block_size: usize, transform: ChunkTransform) -> Self {
        let mut reader = Self::new(source, block_size);
        reader.transform = Some(transform);
        reader
    }

    /// Produce the next window, or `None` at end of input.
    pub fn next_block(&mut self) -> std::io::Result<Option<ScanBlock>> {
        if self.finished {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.block_size];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.source.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            self.finished = true;
            return Ok(None);
        }
        if filled < self.block_size {
            self.finished = true;
        }

        let mut chunk = String::from_utf8_lossy(&buf[..filled]).into_owned();
        if let Some(transform) = self.transform {
            transform(&mut chunk);
        }

        let raw = match &self.carry {
            Some(prev) => {
                let mut joined = String::with_capacity(prev.len() + chunk.len());
                joined.push_str(prev);
                joined.push_str(&chunk);
                joined
            }
            None => chunk.clone(),
        };
        self.carry = Some(chunk);

        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(ScanBlock::new(raw, index)))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn blocks_of(data: &[u8], size: usize) -> Vec<ScanBlock> {
        let mut reader = BlockReader::new(Cursor::new(data.to_vec()), size);
        let mut out = Vec::new();
        while let Some(block) = reader.next_block().unwrap() {
            out.push(block);
        }
        out
    }

    #[test]
    fn test_first_block_is_plain_first_chunk() {
        let blocks = blocks_of(b"abcdefgh", 4);
        assert_eq!(blocks[0].index, 0);
        assert_eq!(blocks[0].raw, "abcd");
    }

    #[test]
    fn test_windows_overlap_by_one_chunk() {
        let blocks = blocks_of(b"aaaabbbbcc", 4);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].raw, "aaaa");
        assert_eq!(blocks[1].raw, "aaaabbbb");
        assert_eq!(blocks[2].raw, "bbbbcc");
        assert_eq!(blocks[2].index, 2);
    }

    #[test]
    fn test_phrase_split_across_chunks_is_whole_in_some_window() {
        // Phrase straddles the first chunk boundary.
        let mut data = vec![b'x'; 4090];
        data.extend_from_slice(b"good, not evil");
        data.resize(9000, b'y');
        let blocks = blocks_of(&data, 4096);
        assert_eq!(blocks.len(), 3);
        assert!(!blocks[0].raw.contains("good, not evil"));
        assert!(blocks[1].raw.contains("good, not evil"));
    }

    #[test]
    fn test_exact_multiple_produces_no_empty_block() {
        let blocks = blocks_of(b"aaaabbbb", 4);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_empty_input_produces_no_blocks() {
        let blocks = blocks_of(b"", 4);
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_transform_applies_to_every_chunk() {
        let mut reader = BlockReader::with_transform(Cursor::new(b"AbCdEfG".to_vec()), 4, |s| {
            s.make_ascii_lowercase()
        });
        let first = reader.next_block().unwrap().unwrap();
        assert_eq!(first.raw, "abcd");
        let second = reader.next_block().unwrap().unwrap();
        assert_eq!(second.raw, "abcdefg");
    }

    #[test]
    fn test_invalid_utf8_degrades_lossily() {
        let blocks = blocks_of(&[b'o', b'k', 0xFF, b'!', b'x'], 5);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].raw.starts_with("ok"));
        assert!(blocks[0].raw.ends_with("!x"));
    }

    #[test]
    fn test_cleaned_is_cached_per_block() {
        let mut block = ScanBlock::new("a   <b>deal</b>".to_string(), 0);
        let first = block.cleaned().to_string();
        assert_eq!(first, "a deal");
        // Second call returns the cached value.
        assert_eq!(block.cleaned(), first);
    }
}
