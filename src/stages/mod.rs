//! Pixel stages executed by the refinement worker
//!
//! Every stage mutates the buffer in place and never changes its
//! dimensions. Neighborhood stages (choke, morphology) read a full snapshot
//! of the previous iteration so that results do not depend on scan order.

pub mod choke;
pub mod chroma_key;
pub mod decontaminate;
pub mod feather;
pub mod morphology;

/// N, S, W, E
pub(crate) const FOUR_NEIGHBORS: [(isize, isize); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

/// All eight surrounding pixels
pub(crate) const EIGHT_NEIGHBORS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// How a neighborhood collapses to one value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reduce {
    Max,
    Min,
}

impl Reduce {
    fn apply(self, a: u8, b: u8) -> u8 {
        match self {
            Reduce::Max => a.max(b),
            Reduce::Min => a.min(b),
        }
    }
}

/// One double-buffered neighborhood iteration over an alpha plane
///
/// `dst` receives a copy of `src` first; interior pixels are then replaced by
/// the reduction of themselves and `offsets`. Border rows and columns are
/// never written. With `partial_only`, pixels whose snapshot alpha is 0 or
/// 255 are left as they are.
pub(crate) fn neighborhood_pass(
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    height: usize,
    offsets: &[(isize, isize)],
    reduce: Reduce,
    partial_only: bool,
) {
    dst.copy_from_slice(src);
    if width < 3 || height < 3 {
        return;
    }

    let stride = width as isize;
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let i = y * width + x;
            let center = src[i];
            if partial_only && (center == 0 || center == 255) {
                continue;
            }

            let mut value = center;
            for &(dx, dy) in offsets {
                let j = (i as isize + dy * stride + dx) as usize;
                value = reduce.apply(value, src[j]);
            }
            dst[i] = value;
        }
    }
}
