//! Piecewise-linear lookup tables.

/// `(x, y)` samples with strictly increasing `x`, linearly interpolated.
///
/// Used for time-dependent temperatures and flux amplitudes and for
/// tabulated depth profiles.
///
/// # Examples
///
/// ```
/// use spall_core::LinearTable;
///
/// let t = LinearTable::new(vec![(0.0, 300.0), (10.0, 500.0)]).unwrap();
/// assert_eq!(t.value(5.0), 400.0);
/// assert_eq!(t.value(20.0), 500.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct LinearTable {
    points: Vec<(f64, f64)>,
}

impl LinearTable {
    /// Build a table from samples.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `points` is empty, holds a non-finite value, or
    /// its abscissae are not strictly increasing.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, String> {
        if points.is_empty() {
            return Err("table needs at least one sample".to_string());
        }
        if let Some(&(x, y)) = points.iter().find(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(format!("table sample ({x}, {y}) is not finite"));
        }
        if let Some(w) = points.windows(2).find(|w| w[1].0 <= w[0].0) {
            return Err(format!(
                "table abscissae must increase strictly: {} then {}",
                w[0].0, w[1].0
            ));
        }
        Ok(Self { points })
    }

    /// The samples.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Whether `x` lies within `[first x, last x]`.
    pub fn contains(&self, x: f64) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(&(lo, _)), Some(&(hi, _))) => x >= lo && x <= hi,
            _ => false,
        }
    }

    /// Interpolated value at `x`, clamped to the end samples outside the
    /// table.
    pub fn value(&self, x: f64) -> f64 {
        let i = self.points.partition_point(|&(px, _)| px <= x);
        if i == 0 {
            return self.points.first().map_or(0.0, |p| p.1);
        }
        if i == self.points.len() {
            return self.points.last().map_or(0.0, |p| p.1);
        }
        let (x0, y0) = self.points[i - 1];
        let (x1, y1) = self.points[i];
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}
