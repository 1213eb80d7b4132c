#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    unused_variables,
    unreachable_code,
    unused_comparisons,
    unused_must_use
)]
#![no_std]

//! Two-point touch screen calibration with non-volatile persistence, based
//! on the [`embedded-hal`](https://crates.io/crates/embedded-hal),
//! [`embedded-graphics`](https://crates.io/crates/embedded-graphics) and
//! [`embedded-storage`](https://crates.io/crates/embedded-storage) traits.
//!
//! A resistive or capacitive touch panel reports positions in its own
//! sensor units. Depending on how the panel is mounted and wired, those
//! units are shifted, scaled and possibly inverted relative to the display
//! pixels underneath. This crate derives the affine transform between the
//! two coordinate spaces from an interactive two-tap procedure, persists
//! the result across power cycles and substitutes estimated defaults on a
//! blank device.
//!
//! The pieces:
//!
//! - [`Calibrator`] owns the live state and drives the interactive
//!   procedure: tap the upper-left marker, tap the lower-right marker,
//!   tap to confirm, then test freely. It is polled cooperatively, one
//!   call to [`Calibrator::process()`] per main-loop iteration.
//! - [`mapping`] solves the two-point system and applies the transform in
//!   both directions.
//! - [`settings`] reads and writes the calibration record behind a
//!   signature word at a fixed offset of an
//!   [`embedded_storage::Storage`].
//! - [`blocking::run_calibration()`] wraps the whole procedure in a
//!   blocking poll loop for hosts without their own.
//!
//! A typical boot sequence loads the persisted record and only enters the
//! interactive procedure when nothing valid was found:
//!
//! ```ignore
//! let mut calibrator = Calibrator::new(display.bounding_box().size);
//! let defaults = CalibrationRecord::estimate(display.bounding_box().size);
//! if !calibrator.initialize(&mut store, defaults)? {
//!     calibrator.begin_calibration(&mut display)?;
//!     while !calibrator.is_calibrated() {
//!         calibrator.process(&mut touch, &mut store, &mut display)?;
//!         delay.delay_us(500);
//!     }
//! }
//! // Normal operation: decode touches through the mapping.
//! let pixel = calibrator.map_raw_to_display(raw_reading);
//! ```

pub mod blocking;
pub mod calibrator;
pub mod error;
pub mod mapping;
pub mod screen;
pub mod settings;

pub use crate::{
    calibrator::{CalibrationState, Calibrator, TouchSensor},
    error::{CalibrationError, ProcessError},
    mapping::{anchor_points, AnchorPoints, MappingParams},
    settings::{CalibrationRecord, SettingsStore, SETTINGS_AREA_LEN},
};

/// Re-exported from
/// [embedded_graphics](https://docs.rs/embedded-graphics/latest/embedded_graphics/index.html)
/// for convenience.
pub use embedded_graphics::geometry::{Point, Size};
