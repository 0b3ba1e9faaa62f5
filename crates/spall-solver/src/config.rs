//! Solver configuration, validation, and error types.
//!
//! [`SolverConfig`] is the input for constructing a
//! [`SolverHandler`](crate::SolverHandler). [`validate()`](SolverConfig::validate)
//! checks everything that does not need the network; the constructor
//! checks the rest against the built grid.

use std::error::Error;
use std::fmt;

use spall_grid::{GridError, GridSpec, OwnedRange};

use crate::temperature::TemperatureProfile;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SolverConfig::validate()`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The grid description is invalid.
    Grid(GridError),
    /// Left and right offsets leave no active point.
    OverlappingOffsets {
        /// First active point (surface + left offset).
        first: usize,
        /// Last active point (n − 1 − right offset), if any.
        last: Option<usize>,
    },
    /// A grain boundary index lies outside the grid.
    GrainBoundaryOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of grid points.
        points: usize,
    },
    /// The temperature profile is invalid.
    InvalidTemperature {
        /// Description of the failure.
        reason: String,
    },
    /// A scalar option is NaN, infinite, or negative.
    InvalidValue {
        /// Option name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid(e) => write!(f, "grid: {e}"),
            Self::OverlappingOffsets { first, last } => match last {
                Some(last) => write!(
                    f,
                    "offsets leave no active point: first {first} is past last {last}"
                ),
                None => write!(f, "right offset covers the whole grid"),
            },
            Self::GrainBoundaryOutOfRange { index, points } => {
                write!(f, "grain boundary {index} outside grid of {points} points")
            }
            Self::InvalidTemperature { reason } => write!(f, "temperature: {reason}"),
            Self::InvalidValue { name, value } => {
                write!(f, "{name} must be finite and non-negative, got {value}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GridError> for ConfigError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

// ── SolverConfig ───────────────────────────────────────────────────

/// Complete configuration of one process's solver handler.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig {
    /// Grid layout.
    pub grid: GridSpec,
    /// Index of the tracked free surface.
    pub surface: usize,
    /// Points at and in front of `surface + left_offset − 1` are skipped.
    /// Default: 1.
    pub left_offset: usize,
    /// The last `right_offset` points are skipped. Default: 1.
    pub right_offset: usize,
    /// Points skipped entirely (grain boundaries treated as Dirichlet
    /// nodes).
    pub grain_boundaries: Vec<usize>,
    /// Temperature source.
    pub temperature: TemperatureProfile,
    /// Temperature change (K) below which cached rates are kept.
    /// Default: 0.1.
    pub temperature_tolerance: f64,
    /// Depth (nm) bounding the near-surface trapped aggregate.
    /// Default: 2.0.
    pub near_surface_depth: f64,
    /// Initial V₁ concentration at active points. Default: 0.
    pub initial_vacancy_concentration: f64,
    /// Points owned by this process. `None` = the whole grid.
    pub owned: Option<OwnedRange>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            grid: GridSpec::default(),
            surface: 0,
            left_offset: 1,
            right_offset: 1,
            grain_boundaries: Vec::new(),
            temperature: TemperatureProfile::default(),
            temperature_tolerance: 0.1,
            near_surface_depth: 2.0,
            initial_vacancy_concentration: 0.0,
            owned: None,
        }
    }
}

impl SolverConfig {
    /// Number of grid points the layout describes.
    pub fn points(&self) -> usize {
        match &self.grid {
            GridSpec::Uniform { points, .. } => *points,
            GridSpec::Explicit { spacings } => spacings.len() + 1,
        }
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let points = self.points();
        if points < 2 {
            return Err(GridError::TooFewPoints { points }.into());
        }
        self.check_surface(self.surface)?;
        for &index in &self.grain_boundaries {
            if index >= points {
                return Err(ConfigError::GrainBoundaryOutOfRange { index, points });
            }
        }
        if let Some(owned) = self.owned {
            if owned.end() > points {
                return Err(GridError::OwnershipOutOfRange {
                    start: owned.start(),
                    len: owned.len(),
                    points,
                }
                .into());
            }
        }
        self.temperature
            .validate()
            .map_err(|reason| ConfigError::InvalidTemperature { reason })?;
        for (name, value) in [
            ("temperature_tolerance", self.temperature_tolerance),
            ("near_surface_depth", self.near_surface_depth),
            ("initial_vacancy_concentration", self.initial_vacancy_concentration),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue { name, value });
            }
        }
        Ok(())
    }

    /// Check that `surface` is in range and leaves at least one active
    /// point between the offsets.
    pub fn check_surface(&self, surface: usize) -> Result<(), ConfigError> {
        let points = self.points();
        if surface >= points {
            return Err(GridError::SurfaceOutOfRange { surface, points }.into());
        }
        let first = surface + self.left_offset;
        let last = (points - 1).checked_sub(self.right_offset);
        match last {
            Some(last) if first <= last => Ok(()),
            _ => Err(ConfigError::OverlappingOffsets { first, last }),
        }
    }

    /// Whether global point `point` is skipped for a surface at `surface`.
    pub fn is_excluded(&self, point: usize, surface: usize) -> bool {
        let points = self.points();
        point < surface + self.left_offset
            || point + self.right_offset > points - 1
            || self.grain_boundaries.contains(&point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(points: usize) -> SolverConfig {
        SolverConfig {
            grid: GridSpec::Uniform {
                points,
                spacing: 1.0,
            },
            ..SolverConfig::default()
        }
    }

    #[test]
    fn default_is_valid() {
        assert!(SolverConfig::default().validate().is_ok());
    }

    #[test]
    fn exclusion_window() {
        let mut c = config(10);
        c.surface = 2;
        c.grain_boundaries = vec![6];
        let active: Vec<usize> = (0..10).filter(|&p| !c.is_excluded(p, 2)).collect();
        assert_eq!(active, vec![3, 4, 5, 7, 8]);
    }

    #[test]
    fn offsets_must_leave_a_point() {
        let mut c = config(4);
        c.surface = 2;
        assert_eq!(
            c.validate(),
            Err(ConfigError::OverlappingOffsets {
                first: 3,
                last: Some(2)
            })
        );
        c.right_offset = 10;
        c.surface = 0;
        assert_eq!(
            c.validate(),
            Err(ConfigError::OverlappingOffsets {
                first: 1,
                last: None
            })
        );
    }

    #[test]
    fn rejects_bad_values() {
        let mut c = config(10);
        c.temperature_tolerance = -1.0;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidValue {
                name: "temperature_tolerance",
                ..
            })
        ));

        let mut c = config(10);
        c.grain_boundaries = vec![10];
        assert_eq!(
            c.validate(),
            Err(ConfigError::GrainBoundaryOutOfRange {
                index: 10,
                points: 10
            })
        );

        let mut c = config(10);
        c.surface = 12;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::Grid(GridError::SurfaceOutOfRange { .. }))
        ));

        let mut c = config(10);
        c.temperature = TemperatureProfile::Constant(f64::INFINITY);
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidTemperature { .. })
        ));
    }

    #[test]
    fn ownership_must_fit() {
        let mut c = config(10);
        c.owned = Some(OwnedRange::new(4, 6, 10).unwrap());
        assert!(c.validate().is_ok());
        c.grid = GridSpec::Uniform {
            points: 8,
            spacing: 1.0,
        };
        assert!(matches!(
            c.validate(),
            Err(ConfigError::Grid(GridError::OwnershipOutOfRange { .. }))
        ));
    }
}
