//! The interactive two-point calibration procedure.
//!
//! The host owns a [`Calibrator`] and drives it cooperatively: one call to
//! [`Calibrator::process()`] per main-loop iteration advances the procedure
//! by at most one transition, using the touch state sampled that cycle.
//! The `Wait*` state names denote waiting across polling calls; nothing
//! here blocks or suspends.
//!
//! A run walks two anchor taps (upper-left, then lower-right), a confirm
//! tap that computes and persists the new mapping, and an open-ended test
//! phase where every touch is echoed as a marker at its mapped display
//! position. The test phase has no terminal state; the host leaves it on
//! its own trigger, typically by resuming normal input handling once
//! [`Calibrator::is_calibrated()`] reports `true`.

use core::fmt::{Debug, Write as _};
use embedded_graphics::{
    draw_target::DrawTarget,
    geometry::{Point, Size},
    pixelcolor::RgbColor,
};
use embedded_storage::Storage;
use heapless::String;

use crate::{
    error::ProcessError,
    mapping::{anchor_points, compute_mapping, AnchorPoints, MappingParams, MARKER_ARM_LEN},
    screen,
    settings::{CalibrationRecord, SettingsStore},
};

#[cfg(feature = "defmt")]
use defmt::Format;

/// Raw touch input, polled once per cycle.
///
/// Implementations adapt the actual touch controller driver.
/// [`TouchSensor::read_point()`] is only called while
/// [`TouchSensor::is_touched()`] reports contact, and must return the
/// uncalibrated sensor reading, not a mapped position.
pub trait TouchSensor {
    type Error: Debug;

    fn is_touched(&mut self) -> Result<bool, Self::Error>;
    fn read_point(&mut self) -> Result<Point, Self::Error>;
}

/// Phase of the interactive procedure.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    WaitUpperLeftTap,
    WaitUpperLeftRelease,
    WaitLowerRightTap,
    WaitLowerRightRelease,
    WaitConfirmTap,
    WaitConfirmRelease,
    WaitTestTap,
}

// Text layout of the calibration screens. Column/row positions in pixels,
// matching a portrait 240x320 panel but harmless on other sizes.
const TEXT_COL: i32 = 10;
const PROMPT_COL: i32 = 80;
const PROMPT_ROW: i32 = 20;
const READOUT_UL_ROW: i32 = 50;
const READOUT_LR_ROW: i32 = 70;
const CONFIRM_ROW: i32 = 90;
const VERIFY_ROW: i32 = 110;
const VERIFY_ROW_STEP: i32 = 20;
const TEST_PROMPT_ROW: i32 = 200;

/// Owns the live calibration state: the current mapping, the persisted
/// record it was derived from, and the procedure's state machine.
///
/// Collaborators (touch sensor, settings store, draw target) are passed
/// into the methods that need them rather than owned here, so the host
/// keeps control of its peripherals between calls.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug)]
pub struct Calibrator {
    display_size: Size,
    /// Fixed display-space anchors the user is asked to tap.
    anchors: AnchorPoints,
    /// Full display corners, reported back after a run as a correctness
    /// check.
    corners: AnchorPoints,
    record: CalibrationRecord,
    mapping: MappingParams,
    state: CalibrationState,
    /// Raw samples captured during the current run.
    captured: AnchorPoints,
    calibrated: bool,
    /// Last marker drawn in the test phase, erased before the next one.
    test_marker: Option<Point>,
}

impl Calibrator {
    /// Creates a calibrator for a display of the given size, carrying
    /// estimated defaults until [`Self::initialize()`] or a calibration run
    /// installs something better.
    pub fn new(display_size: Size) -> Self {
        let anchors = anchor_points(display_size);
        let record = CalibrationRecord::estimate(display_size);
        let mapping =
            compute_mapping(&anchors, &record.raw_points()).unwrap_or(MappingParams::IDENTITY);
        let width = display_size.width as i32;
        let height = display_size.height as i32;

        Self {
            display_size,
            anchors,
            corners: AnchorPoints {
                ul: Point::zero(),
                lr: Point::new(width - 1, height - 1),
            },
            record,
            mapping,
            state: CalibrationState::WaitUpperLeftTap,
            captured: AnchorPoints {
                ul: Point::zero(),
                lr: Point::zero(),
            },
            calibrated: false,
            test_marker: None,
        }
    }

    /// Loads the persisted calibration and installs it.
    ///
    /// Returns whether a valid record was found. On first boot the
    /// `defaults` are persisted and installed instead and `false` comes
    /// back, in which case the host should start an interactive run with
    /// [`Self::begin_calibration()`].
    pub fn initialize<S>(
        &mut self,
        store: &mut SettingsStore<S>,
        defaults: CalibrationRecord,
    ) -> Result<bool, S::Error>
    where
        S: Storage,
    {
        let (record, was_valid) = store.load(defaults)?;
        self.install_record(record);
        self.calibrated = was_valid;
        Ok(was_valid)
    }

    /// Whether a completed (or validly persisted) calibration is in effect.
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Current phase of the interactive procedure.
    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// The mapping currently in effect.
    pub fn mapping(&self) -> MappingParams {
        self.mapping
    }

    /// Installs externally supplied coefficients, bypassing the record.
    pub fn set_mapping(&mut self, mapping: MappingParams) {
        self.mapping = mapping;
    }

    /// The record currently in effect.
    pub fn record(&self) -> CalibrationRecord {
        self.record
    }

    /// Maps a raw touch reading to display pixels. Not clamped to the
    /// display bounds.
    pub fn map_raw_to_display(&self, raw: Point) -> Point {
        self.mapping.map_raw_to_display(raw)
    }

    /// Reports the raw reading expected at a display location.
    pub fn map_display_to_raw(&self, display: Point) -> Point {
        self.mapping.map_display_to_raw(display)
    }

    /// (Re)starts the interactive procedure.
    ///
    /// The sole entry point into a run: clears the screen, draws the
    /// upper-left prompt, resets the state machine and the completion flag.
    /// The previous mapping stays in effect until a run completes.
    pub fn begin_calibration<DT>(&mut self, draw_target: &mut DT) -> Result<(), DT::Error>
    where
        DT: DrawTarget<Color: RgbColor>,
    {
        self.calibrated = false;
        self.test_marker = None;
        self.state = CalibrationState::WaitUpperLeftTap;

        draw_target.clear(DT::Color::BLACK)?;
        screen::draw_marker(draw_target, self.anchors.ul, DT::Color::BLUE)?;
        screen::draw_text(
            draw_target,
            Point::new(PROMPT_COL, PROMPT_ROW),
            DT::Color::YELLOW,
            screen::TEXT_TAP_PROMPT,
        )?;

        #[cfg(feature = "defmt")]
        defmt::info!("calibration started, waiting for upper-left tap");

        Ok(())
    }

    /// Advances the procedure by one polling cycle.
    ///
    /// Call once per main-loop iteration while a run is active (and for as
    /// long as the host wants the test phase to stay live). Touch sampling
    /// happens here: the sensor is polled once, and at most one state
    /// transition results.
    pub fn process<T, S, DT>(
        &mut self,
        touch: &mut T,
        store: &mut SettingsStore<S>,
        draw_target: &mut DT,
    ) -> Result<(), ProcessError<T::Error, S::Error, DT::Error>>
    where
        T: TouchSensor,
        S: Storage,
        S::Error: Debug,
        DT: DrawTarget<Color: RgbColor>,
        DT::Error: Debug,
    {
        let touched = touch.is_touched().map_err(|e| ProcessError::Touch(e))?;
        let point = if touched {
            Some(touch.read_point().map_err(|e| ProcessError::Touch(e))?)
        } else {
            None
        };

        match self.state {
            CalibrationState::WaitUpperLeftTap => {
                if let Some(raw) = point {
                    self.captured.ul = raw;
                    screen::draw_readout(
                        draw_target,
                        Point::new(TEXT_COL, READOUT_UL_ROW),
                        DT::Color::YELLOW,
                        raw,
                    )
                    .map_err(|e| ProcessError::DrawTarget(e))?;
                    self.state = CalibrationState::WaitUpperLeftRelease;

                    #[cfg(feature = "defmt")]
                    defmt::debug!("upper-left anchor tapped at {:?}", raw);
                }
            }

            CalibrationState::WaitUpperLeftRelease => {
                if !touched {
                    self.erase_prompt(draw_target, self.anchors.ul, PROMPT_ROW)
                        .map_err(|e| ProcessError::DrawTarget(e))?;
                    self.draw_prompt(
                        draw_target,
                        self.anchors.lr,
                        self.display_height() - PROMPT_ROW,
                    )
                    .map_err(|e| ProcessError::DrawTarget(e))?;
                    self.state = CalibrationState::WaitLowerRightTap;
                }
            }

            CalibrationState::WaitLowerRightTap => {
                if let Some(raw) = point {
                    self.captured.lr = raw;
                    screen::draw_readout(
                        draw_target,
                        Point::new(TEXT_COL, READOUT_LR_ROW),
                        DT::Color::YELLOW,
                        raw,
                    )
                    .map_err(|e| ProcessError::DrawTarget(e))?;
                    self.state = CalibrationState::WaitLowerRightRelease;

                    #[cfg(feature = "defmt")]
                    defmt::debug!("lower-right anchor tapped at {:?}", raw);
                }
            }

            CalibrationState::WaitLowerRightRelease => {
                if !touched {
                    self.erase_prompt(
                        draw_target,
                        self.anchors.lr,
                        self.display_height() - PROMPT_ROW,
                    )
                    .map_err(|e| ProcessError::DrawTarget(e))?;
                    screen::draw_text(
                        draw_target,
                        Point::new(TEXT_COL, CONFIRM_ROW),
                        DT::Color::YELLOW,
                        screen::TEXT_TAP_CONFIRM,
                    )
                    .map_err(|e| ProcessError::DrawTarget(e))?;
                    self.state = CalibrationState::WaitConfirmTap;
                }
            }

            CalibrationState::WaitConfirmTap => {
                if touched {
                    match compute_mapping(&self.anchors, &self.captured) {
                        Ok(mapping) => {
                            self.mapping = mapping;
                            self.record = CalibrationRecord::from_raw_points(&self.captured);
                            store
                                .store(&self.record)
                                .map_err(|e| ProcessError::Storage(e))?;
                            self.draw_corner_verification(draw_target)
                                .map_err(|e| ProcessError::DrawTarget(e))?;
                            self.state = CalibrationState::WaitConfirmRelease;
                        }
                        Err(_e) => {
                            // Unusable samples: keep the previous mapping
                            // and record and ask for the anchors again.
                            #[cfg(feature = "defmt")]
                            defmt::info!("calibration rejected: {:?}, restarting", _e);
                            self.begin_calibration(draw_target)
                                .map_err(|e| ProcessError::DrawTarget(e))?;
                        }
                    }
                }
            }

            CalibrationState::WaitConfirmRelease => {
                if !touched {
                    self.calibrated = true;
                    screen::draw_text(
                        draw_target,
                        Point::new(TEXT_COL, TEST_PROMPT_ROW),
                        DT::Color::YELLOW,
                        screen::TEXT_TAP_TEST,
                    )
                    .map_err(|e| ProcessError::DrawTarget(e))?;
                    self.state = CalibrationState::WaitTestTap;

                    #[cfg(feature = "defmt")]
                    defmt::info!("calibration complete");
                }
            }

            CalibrationState::WaitTestTap => {
                if let Some(raw) = point {
                    let display_point = self.mapping.map_raw_to_display(raw);
                    if let Some(previous) = self.test_marker.take() {
                        let arm = MARKER_ARM_LEN;
                        screen::clear_region(
                            draw_target,
                            previous - Point::new(arm, arm),
                            Size::new((2 * arm + 1) as u32, (2 * arm + 1) as u32),
                            DT::Color::BLACK,
                        )
                        .map_err(|e| ProcessError::DrawTarget(e))?;
                    }
                    screen::draw_marker(draw_target, display_point, DT::Color::GREEN)
                        .map_err(|e| ProcessError::DrawTarget(e))?;
                    self.test_marker = Some(display_point);
                }
            }
        }

        Ok(())
    }

    /// Installs a record and the mapping derived from it, mirroring the
    /// estimate performed in [`Self::new()`].
    fn install_record(&mut self, record: CalibrationRecord) {
        self.mapping = compute_mapping(&self.anchors, &record.raw_points())
            .unwrap_or(MappingParams::IDENTITY);
        self.record = record;
    }

    fn display_height(&self) -> i32 {
        self.display_size.height as i32
    }

    fn draw_prompt<DT>(
        &self,
        draw_target: &mut DT,
        marker: Point,
        text_row: i32,
    ) -> Result<(), DT::Error>
    where
        DT: DrawTarget<Color: RgbColor>,
    {
        screen::draw_marker(draw_target, marker, DT::Color::BLUE)?;
        screen::draw_text(
            draw_target,
            Point::new(PROMPT_COL, text_row),
            DT::Color::YELLOW,
            screen::TEXT_TAP_PROMPT,
        )
    }

    fn erase_prompt<DT>(
        &self,
        draw_target: &mut DT,
        marker: Point,
        text_row: i32,
    ) -> Result<(), DT::Error>
    where
        DT: DrawTarget<Color: RgbColor>,
    {
        screen::draw_marker(draw_target, marker, DT::Color::BLACK)?;
        screen::draw_text(
            draw_target,
            Point::new(PROMPT_COL, text_row),
            DT::Color::BLACK,
            screen::TEXT_TAP_PROMPT,
        )
    }

    /// Reports where the new mapping puts the display corners in raw
    /// units, so the user can eyeball the result before confirming it
    /// works in the test phase.
    fn draw_corner_verification<DT>(&self, draw_target: &mut DT) -> Result<(), DT::Error>
    where
        DT: DrawTarget<Color: RgbColor>,
    {
        let mut row = VERIFY_ROW;
        for corner in [self.corners.ul, self.corners.lr] {
            let raw = self.mapping.map_display_to_raw(corner);

            let mut header: String<{ screen::TEXT_BUF_LEN }> = String::new();
            let _ = write!(header, "({}, {}) maps to:", corner.x, corner.y);
            screen::draw_text(
                draw_target,
                Point::new(TEXT_COL, row),
                DT::Color::YELLOW,
                &header,
            )?;
            screen::draw_readout(
                draw_target,
                Point::new(TEXT_COL, row + VERIFY_ROW_STEP),
                DT::Color::YELLOW,
                raw,
            )?;
            row += 2 * VERIFY_ROW_STEP;
        }
        Ok(())
    }
}
