//! Error definitions for the crate

use core::fmt::Debug;

#[cfg(feature = "defmt")]
use defmt::Format;

/// The error returned when the two-point calibration calculation cannot
/// produce usable coefficients.
///
/// Both samples landing on the same raw coordinate leaves the scale for
/// that axis undefined, so the calculation refuses to divide.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// The two raw samples share the same X coordinate.
    DegenerateX,
    /// The two raw samples share the same Y coordinate.
    DegenerateY,
}

/// The error returned when a polling cycle of the calibration procedure
/// fails in one of its collaborators.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug)]
pub enum ProcessError<TouchError, StorageError, DTError>
where
    TouchError: Debug,
    StorageError: Debug,
    DTError: Debug,
{
    /// An error occurred in the touch sensor driver.
    Touch(TouchError),
    /// An error occurred in the non-volatile settings storage.
    Storage(StorageError),
    /// An error occurred in the display panel driver.
    DrawTarget(DTError),
}
