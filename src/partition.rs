use crate::BlockedRange;

/// Pieces per worker the auto partitioner aims for.
const AUTO_PIECES_PER_THREAD: usize = 4;

/// How a [`BlockedRange`] is cut into pieces for dispatch.
///
/// Every strategy yields contiguous, non-overlapping pieces in ascending
/// order that cover the input exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Partitioner {
    /// Aim for a few pieces per worker. Pieces are never cut below the
    /// grainsize.
    #[default]
    Auto,
    /// Halve recursively until no piece is divisible. Pieces end up between
    /// half the grainsize and the grainsize.
    Simple,
    /// One piece per worker, never below the grainsize.
    Static,
}

impl Partitioner {
    pub fn partition(self, range: BlockedRange, threads: usize) -> Vec<BlockedRange> {
        if range.is_empty() {
            return Vec::new();
        }

        let threads = threads.max(1);
        match self {
            Partitioner::Simple => {
                let mut pieces = Vec::new();
                split_recursive(range, &mut pieces);
                pieces
            }
            Partitioner::Auto => even_pieces(range, threads * AUTO_PIECES_PER_THREAD),
            Partitioner::Static => even_pieces(range, threads),
        }
    }
}

fn split_recursive(mut range: BlockedRange, pieces: &mut Vec<BlockedRange>) {
    if !range.is_divisible() {
        pieces.push(range);
        return;
    }
    let upper = range.split();
    split_recursive(range, pieces);
    split_recursive(upper, pieces);
}

/// Cuts `range` into at most `target` nearly equal pieces, none below the
/// grainsize.
fn even_pieces(range: BlockedRange, target: usize) -> Vec<BlockedRange> {
    let count = target.min(range.len() / range.grainsize()).max(1);
    let base = range.len() / count;
    let extra = range.len() % count;

    let mut pieces = Vec::with_capacity(count);
    let mut rest = range;
    for i in 0..count {
        let size = base + usize::from(i < extra);
        let (piece, tail) = rest.split_at(rest.begin() + size);
        pieces.push(piece);
        rest = tail;
    }
    debug_assert!(rest.is_empty());
    pieces
}
