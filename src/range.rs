use std::ops::Range;

/// A half-open index range `[begin, end)` that knows how finely it may be
/// split.
///
/// A range is divisible while it holds more than `grainsize` indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockedRange {
    begin: usize,
    end: usize,
    grainsize: usize,
}

impl BlockedRange {
    /// Creates `[begin, end)` with a grainsize of 1.
    ///
    /// # Panics
    ///
    /// Panics if `begin > end`.
    pub fn new(begin: usize, end: usize) -> Self {
        Self::with_grainsize(begin, end, 1)
    }

    /// Creates `[begin, end)` that will not be split below `grainsize`
    /// indices. A grainsize of 0 is treated as 1.
    ///
    /// # Panics
    ///
    /// Panics if `begin > end`.
    pub fn with_grainsize(begin: usize, end: usize, grainsize: usize) -> Self {
        assert!(
            begin <= end,
            "range start index {begin} is greater than end index {end}"
        );
        Self {
            begin,
            end,
            grainsize: grainsize.max(1),
        }
    }

    pub fn begin(&self) -> usize {
        self.begin
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn grainsize(&self) -> usize {
        self.grainsize
    }

    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub fn is_divisible(&self) -> bool {
        self.len() > self.grainsize
    }

    /// Splits off the upper half. `self` keeps `[begin, mid)` and the returned
    /// range is `[mid, end)`, both with the same grainsize.
    ///
    /// Callers should check [`is_divisible`](Self::is_divisible) first;
    /// splitting an indivisible range still halves it.
    pub fn split(&mut self) -> BlockedRange {
        let mid = self.begin + self.len() / 2;
        let upper = BlockedRange {
            begin: mid,
            end: self.end,
            grainsize: self.grainsize,
        };
        self.end = mid;
        upper
    }

    /// Splits into `[begin, at)` and `[at, end)`. `at` is clamped into the range.
    pub fn split_at(self, at: usize) -> (BlockedRange, BlockedRange) {
        let at = at.clamp(self.begin, self.end);
        (
            BlockedRange { end: at, ..self },
            BlockedRange { begin: at, ..self },
        )
    }

    pub fn indices(&self) -> Range<usize> {
        self.begin..self.end
    }
}

impl From<Range<usize>> for BlockedRange {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl IntoIterator for BlockedRange {
    type Item = usize;
    type IntoIter = Range<usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.indices()
    }
}
