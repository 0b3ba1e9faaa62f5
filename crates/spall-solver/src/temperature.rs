//! Where each grid point's temperature comes from.

use spall_core::LinearTable;
use spall_grid::Grid1D;

/// Temperature source evaluated at every point of every evaluation.
#[derive(Clone, Debug, PartialEq)]
pub enum TemperatureProfile {
    /// The same temperature everywhere, always.
    Constant(f64),
    /// Linear in the fractional depth between the surface (0) and the
    /// last grid node (1).
    Gradient {
        /// Temperature at the surface node, in K.
        surface: f64,
        /// Temperature at the last node, in K.
        bulk: f64,
    },
    /// Uniform in space, interpolated in time.
    TimeProfile(LinearTable),
    /// Read from the temperature slot of the state.
    FromState {
        /// Temperature used before any state exists (setup and initial
        /// conditions).
        initial: f64,
    },
}

impl Default for TemperatureProfile {
    fn default() -> Self {
        Self::Constant(1000.0)
    }
}

impl TemperatureProfile {
    /// Temperature at `point` and `time`. `from_state` is the value
    /// currently held in the point's temperature slot.
    pub fn at(
        &self,
        grid: &Grid1D,
        point: usize,
        surface: usize,
        time: f64,
        from_state: f64,
    ) -> f64 {
        match self {
            Self::Constant(t) => *t,
            Self::Gradient { surface: ts, bulk } => {
                let x = grid.fraction(point, surface).max(0.0);
                ts + (bulk - ts) * x
            }
            Self::TimeProfile(table) => table.value(time),
            Self::FromState { .. } => from_state,
        }
    }

    /// Temperature at `point` before the state exists.
    pub fn initial(&self, grid: &Grid1D, point: usize, surface: usize) -> f64 {
        match self {
            Self::FromState { initial } => *initial,
            _ => self.at(grid, point, surface, 0.0, 0.0),
        }
    }

    /// Single temperature used to select setup-time tables: the value at
    /// the surface at time 0.
    pub fn setup_temperature(&self) -> f64 {
        match self {
            Self::Constant(t) => *t,
            Self::Gradient { surface, .. } => *surface,
            Self::TimeProfile(table) => table.value(0.0),
            Self::FromState { initial } => *initial,
        }
    }

    /// Every fixed temperature must be finite and positive.
    pub fn validate(&self) -> Result<(), String> {
        let check = |what: &str, t: f64| {
            if t.is_finite() && t > 0.0 {
                Ok(())
            } else {
                Err(format!("{what} temperature must be finite and positive, got {t}"))
            }
        };
        match self {
            Self::Constant(t) => check("constant", *t),
            Self::Gradient { surface, bulk } => {
                check("surface", *surface)?;
                check("bulk", *bulk)
            }
            Self::TimeProfile(table) => table
                .points()
                .iter()
                .try_for_each(|&(_, t)| check("profile", t)),
            Self::FromState { initial } => check("initial", *initial),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn gradient_is_linear_in_fraction() {
        let grid = Grid1D::uniform(11, 1.0).unwrap();
        let p = TemperatureProfile::Gradient {
            surface: 1000.0,
            bulk: 500.0,
        };
        assert_eq!(p.at(&grid, 0, 0, 0.0, 0.0), 1000.0);
        assert_eq!(p.at(&grid, 10, 0, 0.0, 0.0), 500.0);
        assert_eq!(p.at(&grid, 5, 0, 0.0, 0.0), 750.0);
        // In front of the surface the surface value holds.
        assert_eq!(p.at(&grid, 1, 2, 0.0, 0.0), 1000.0);
    }

    #[test]
    fn time_profile_interpolates() {
        let table = LinearTable::new(vec![(0.0, 300.0), (10.0, 1300.0)]).unwrap();
        let p = TemperatureProfile::TimeProfile(table);
        let grid = Grid1D::uniform(3, 1.0).unwrap();
        assert_eq!(p.at(&grid, 1, 0, 5.0, 0.0), 800.0);
        assert_eq!(p.at(&grid, 1, 0, 20.0, 0.0), 1300.0);
        assert_eq!(p.setup_temperature(), 300.0);
    }

    #[test]
    fn from_state_reads_slot() {
        let grid = Grid1D::uniform(3, 1.0).unwrap();
        let p = TemperatureProfile::FromState { initial: 600.0 };
        assert_eq!(p.at(&grid, 1, 0, 0.0, 812.5), 812.5);
        assert_eq!(p.initial(&grid, 1, 0), 600.0);
    }

    #[test]
    fn validation() {
        assert!(TemperatureProfile::Constant(0.0).validate().is_err());
        assert!(TemperatureProfile::Gradient {
            surface: 900.0,
            bulk: f64::NAN
        }
        .validate()
        .is_err());
        assert!(TemperatureProfile::default().validate().is_ok());
    }

    proptest! {
        #[test]
        fn gradient_stays_between_end_values(
            surface_t in 300.0f64..2000.0,
            bulk_t in 300.0f64..2000.0,
            points in 2usize..40,
            surface in 0usize..40,
        ) {
            let grid = Grid1D::uniform(points, 0.7).unwrap();
            let surface = surface % points;
            let p = TemperatureProfile::Gradient {
                surface: surface_t,
                bulk: bulk_t,
            };
            let (lo, hi) = (surface_t.min(bulk_t), surface_t.max(bulk_t));
            for point in 0..points {
                let t = p.at(&grid, point, surface, 0.0, 0.0);
                prop_assert!(t >= lo - 1e-9 && t <= hi + 1e-9, "{t} outside [{lo}, {hi}]");
            }
        }
    }
}
