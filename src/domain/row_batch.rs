use anyhow::{Result, anyhow};

/// Half-open row range `[start, end)` covered by batch `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBatchRange {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl RowBatchRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

#[derive(Debug)]
pub struct RowBatchSlicer {
    row_count: usize,
    batch_size: usize,
}

impl RowBatchSlicer {
    pub fn new(row_count: usize, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(anyhow!("Batch size must be greater than 0"));
        }

        Ok(Self {
            row_count,
            batch_size,
        })
    }

    pub fn batch_count(&self) -> usize {
        self.row_count.div_ceil(self.batch_size)
    }

    pub fn iter_ranges(&self) -> impl Iterator<Item = RowBatchRange> + '_ {
        (0..self.row_count)
            .step_by(self.batch_size)
            .enumerate()
            .map(move |(index, start)| RowBatchRange {
                index,
                start,
                end: (start + self.batch_size).min(self.row_count),
            })
    }
}
