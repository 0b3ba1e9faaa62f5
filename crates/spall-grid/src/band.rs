//! Point windows measured from the tracked surface.

/// A band of grid points at offsets `start..=end` past the surface node.
///
/// Boundary-localized physics (trap mutation, desorption) is active only
/// inside its band. Offsets are in points, not nm, and are
/// caller-configurable: the useful width depends on the grid's
/// near-surface refinement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceBand {
    /// First offset past the surface included in the band.
    pub start: usize,
    /// Last offset past the surface included in the band.
    pub end: usize,
}

impl SurfaceBand {
    /// A band covering offsets `start..=end`.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A band of exactly one point, `offset` past the surface.
    pub fn single(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Whether global point `i` is in the band for a surface at `surface`.
    pub fn contains(&self, i: usize, surface: usize) -> bool {
        i >= surface + self.start && i <= surface + self.end
    }

    /// Returns `true` if the band selects no point (`start > end`).
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_point_band() {
        let b = SurfaceBand::single(1);
        assert!(!b.contains(3, 3));
        assert!(b.contains(4, 3));
        assert!(!b.contains(5, 3));
    }

    #[test]
    fn inverted_band_is_empty() {
        let b = SurfaceBand::new(4, 2);
        assert!(b.is_empty());
        assert!((0..20).all(|i| !b.contains(i, 0)));
    }
}
