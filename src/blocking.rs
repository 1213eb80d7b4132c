//! Blocking driver for the calibration procedure.
//!
//! For hosts that do not have their own polling loop: draws the prompts,
//! polls the touch sensor every 500 µs and returns once the user has
//! confirmed a calibration. Hosts with a main loop call
//! [`Calibrator::process()`] themselves instead.

use crate::{
    calibrator::{Calibrator, TouchSensor},
    error::ProcessError,
    mapping::MappingParams,
    settings::SettingsStore,
};
use core::fmt::Debug;
use embedded_graphics::{draw_target::DrawTarget, pixelcolor::RgbColor};
use embedded_hal::delay::DelayNs;
use embedded_storage::Storage;

/// Runs the interactive procedure to completion.
///
/// Restarts the calibrator, then polls until the user has tapped both
/// anchors and confirmed, and returns the newly installed mapping. The
/// calibrator is left at the start of its interactive test phase, which the
/// host may keep driving with [`Calibrator::process()`] or simply abandon.
pub fn run_calibration<T, S, DT, DELAY>(
    calibrator: &mut Calibrator,
    touch: &mut T,
    store: &mut SettingsStore<S>,
    draw_target: &mut DT,
    delay: &mut DELAY,
) -> Result<MappingParams, ProcessError<T::Error, S::Error, DT::Error>>
where
    T: TouchSensor,
    S: Storage,
    S::Error: Debug,
    DT: DrawTarget<Color: RgbColor>,
    DT::Error: Debug,
    DELAY: DelayNs,
{
    calibrator
        .begin_calibration(draw_target)
        .map_err(|e| ProcessError::DrawTarget(e))?;

    while !calibrator.is_calibrated() {
        calibrator.process(touch, store, draw_target)?;
        delay.delay_us(500);
    }

    Ok(calibrator.mapping())
}
