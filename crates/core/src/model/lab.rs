use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// How far a density guess may sit from the derived value and still count,
/// inclusive on the boundary.
pub const DENSITY_TOLERANCE: f64 = 0.05;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LabDataError {
    #[error("sample mass must be a positive number")]
    InvalidMass,

    #[error("initial volume must be zero or positive")]
    InvalidInitialVolume,

    #[error("final volume must exceed the initial volume")]
    NoDisplacement,
}

/// The fixed bench measurements seeded at session start.
///
/// `apparent_density` is always derived from these three values; it is
/// never stored as an independent source of truth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabMeasurements {
    mass: f64,
    initial_volume: f64,
    final_volume: f64,
}

impl LabMeasurements {
    /// Validates and builds a measurement set.
    ///
    /// # Errors
    ///
    /// Returns `LabDataError` when the mass is not positive, the initial
    /// volume is negative, or no water was displaced.
    pub fn new(mass: f64, initial_volume: f64, final_volume: f64) -> Result<Self, LabDataError> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(LabDataError::InvalidMass);
        }
        if !initial_volume.is_finite() || initial_volume < 0.0 {
            return Err(LabDataError::InvalidInitialVolume);
        }
        if !final_volume.is_finite() || final_volume <= initial_volume {
            return Err(LabDataError::NoDisplacement);
        }
        Ok(Self {
            mass,
            initial_volume,
            final_volume,
        })
    }

    /// The ground-truth constants for the oxidized copper ore sample:
    /// 157.5 g displacing 45 mL, i.e. 3.50 g/cm³.
    #[must_use]
    pub fn seeded() -> Self {
        Self {
            mass: 157.5,
            initial_volume: 50.0,
            final_volume: 95.0,
        }
    }

    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    #[must_use]
    pub fn initial_volume(&self) -> f64 {
        self.initial_volume
    }

    #[must_use]
    pub fn final_volume(&self) -> f64 {
        self.final_volume
    }

    /// Volume of water displaced by the sample.
    #[must_use]
    pub fn displaced_volume(&self) -> f64 {
        self.final_volume - self.initial_volume
    }

    /// mass / (final volume - initial volume), the quantity the whole
    /// activity revolves around.
    #[must_use]
    pub fn apparent_density(&self) -> f64 {
        self.mass / self.displaced_volume()
    }

    /// Whether a student guess lands within the tolerance band.
    #[must_use]
    pub fn accepts_guess(&self, guess: f64) -> bool {
        guess.is_finite() && (guess - self.apparent_density()).abs() <= DENSITY_TOLERANCE
    }

    /// The value the lab assistant reads back for one measurement request.
    #[must_use]
    pub fn value_of(&self, measurement: Measurement) -> f64 {
        match measurement {
            Measurement::Mass => self.mass,
            Measurement::InitialVolume => self.initial_volume,
            Measurement::FinalVolume => self.final_volume,
        }
    }
}

// ─── Measurement Requests ──────────────────────────────────────────────────────

/// One of the three readings the student must ask the assistant for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Measurement {
    Mass,
    InitialVolume,
    FinalVolume,
}

impl Measurement {
    pub const ALL: [Measurement; 3] = [
        Measurement::Mass,
        Measurement::InitialVolume,
        Measurement::FinalVolume,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Measurement::Mass => "sample mass",
            Measurement::InitialVolume => "initial water volume",
            Measurement::FinalVolume => "final volume with the sample",
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which measurements have been requested so far. Order is irrelevant;
/// only completeness gates the calculation step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurementRequests(BTreeSet<Measurement>);

impl MeasurementRequests {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request. Returns `true` if it was the first time.
    pub fn request(&mut self, measurement: Measurement) -> bool {
        self.0.insert(measurement)
    }

    #[must_use]
    pub fn contains(&self, measurement: Measurement) -> bool {
        self.0.contains(&measurement)
    }

    /// All three readings have been pulled at least once.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        Measurement::ALL.iter().all(|m| self.0.contains(m))
    }
}
