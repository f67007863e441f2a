use std::fmt;

/// Upper end of a block query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTarget {
    /// Confirmed chain head, resolved once per fetch.
    Latest,
    Number(u64),
}

/// Inclusive block interval `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }

    /// Number of blocks covered. Zero for an empty range.
    pub fn span(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.to - self.from + 1
        }
    }

    /// Split into contiguous sub-ranges no wider than `max_span` blocks.
    ///
    /// A `max_span` of zero is treated as one.
    pub fn chunks(&self, max_span: u64) -> Vec<BlockRange> {
        let max_span = max_span.max(1);
        let mut chunks = Vec::new();
        if self.is_empty() {
            return chunks;
        }

        let mut block = self.from;
        loop {
            let to = block.saturating_add(max_span - 1).min(self.to);
            chunks.push(BlockRange::new(block, to));
            if to == self.to {
                break;
            }
            block = to + 1;
        }

        chunks
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}
