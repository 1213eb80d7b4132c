//! Non-volatile calibration settings.
//!
//! What survives a power cycle is not the mapping coefficients but the four
//! raw readings they were derived from; the coefficients are rebuilt from
//! the stored readings and the fixed anchor points on every load. The
//! record sits at a fixed storage offset behind a signature word that tells
//! initialized settings apart from blank flash.

use crate::mapping::{anchor_points, AnchorPoints, Point, Size};
use embedded_storage::Storage;

#[cfg(feature = "defmt")]
use defmt::Format;

/// Marks the settings area as initialized.
///
/// Distinct from the all-zeros and all-ones patterns of blank storage, so a
/// never-written area reliably fails the check.
const SIGNATURE: u32 = 0xBEEF_DEED;

const SIGNATURE_LEN: usize = 4;
const RECORD_LEN: usize = 8;

/// Total bytes reserved at the store's base offset.
pub const SETTINGS_AREA_LEN: usize = 16;

/// The raw touch readings measured at the two display anchor points.
///
/// Created from [`CalibrationRecord::estimate()`] defaults at first boot,
/// overwritten whenever an interactive calibration run completes, read once
/// at boot to rebuild the mapping.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationRecord {
    pub raw_ul_x: i16,
    pub raw_ul_y: i16,
    pub raw_lr_x: i16,
    pub raw_lr_y: i16,
}

impl CalibrationRecord {
    /// Factory defaults for a panel whose axes line up with the display.
    ///
    /// Assumes the touch panel covers the display exactly and reports the
    /// full 12-bit range, so each anchor scales proportionally into raw
    /// units. A coarse estimate, only good enough for the user to operate
    /// the calibration screen itself before a real run has happened.
    pub fn estimate(display_size: Size) -> Self {
        const TOUCH_RANGE: i32 = 4096;

        let anchors = anchor_points(display_size);
        let width = display_size.width as i32;
        let height = display_size.height as i32;
        Self {
            raw_ul_x: saturate_i16(anchors.ul.x * TOUCH_RANGE / width),
            raw_ul_y: saturate_i16(anchors.ul.y * TOUCH_RANGE / height),
            raw_lr_x: saturate_i16(anchors.lr.x * TOUCH_RANGE / width),
            raw_lr_y: saturate_i16(anchors.lr.y * TOUCH_RANGE / height),
        }
    }

    /// The stored readings as an upper-left/lower-right point pair.
    pub fn raw_points(&self) -> AnchorPoints {
        AnchorPoints {
            ul: Point::new(self.raw_ul_x as i32, self.raw_ul_y as i32),
            lr: Point::new(self.raw_lr_x as i32, self.raw_lr_y as i32),
        }
    }

    pub(crate) fn from_raw_points(raw: &AnchorPoints) -> Self {
        Self {
            raw_ul_x: saturate_i16(raw.ul.x),
            raw_ul_y: saturate_i16(raw.ul.y),
            raw_lr_x: saturate_i16(raw.lr.x),
            raw_lr_y: saturate_i16(raw.lr.y),
        }
    }

    fn to_bytes(self) -> [u8; RECORD_LEN] {
        let mut bytes = [0u8; RECORD_LEN];
        bytes[0..2].copy_from_slice(&self.raw_ul_x.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.raw_ul_y.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.raw_lr_x.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.raw_lr_y.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8; RECORD_LEN]) -> Self {
        Self {
            raw_ul_x: i16::from_le_bytes([bytes[0], bytes[1]]),
            raw_ul_y: i16::from_le_bytes([bytes[2], bytes[3]]),
            raw_lr_x: i16::from_le_bytes([bytes[4], bytes[5]]),
            raw_lr_y: i16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }
}

fn saturate_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Reads and writes the calibration record at a fixed storage offset.
///
/// The layout is `[signature: 4][raw_ul_x: 2][raw_ul_y: 2][raw_lr_x: 2]
/// [raw_lr_y: 2]`, little-endian, within a [`SETTINGS_AREA_LEN`]-byte
/// reserved area. The layout is fixed; there is no versioning beyond the
/// signature check.
#[derive(Debug)]
pub struct SettingsStore<S> {
    storage: S,
    base: u32,
}

impl<S> SettingsStore<S>
where
    S: Storage,
{
    /// `base` is the byte offset of the settings area in `storage`.
    pub fn new(storage: S, base: u32) -> Self {
        Self { storage, base }
    }

    /// Loads the stored record.
    ///
    /// A signature mismatch means the area was never written: the signature
    /// and `defaults` are persisted and `(defaults, false)` is returned so
    /// the caller knows the screen is uncalibrated. Otherwise the stored
    /// record comes back with `true`.
    pub fn load(
        &mut self,
        defaults: CalibrationRecord,
    ) -> Result<(CalibrationRecord, bool), S::Error> {
        let mut signature = [0u8; SIGNATURE_LEN];
        self.storage.read(self.base, &mut signature)?;

        if u32::from_le_bytes(signature) != SIGNATURE {
            #[cfg(feature = "defmt")]
            defmt::info!("settings area uninitialized, writing defaults");
            self.storage.write(self.base, &SIGNATURE.to_le_bytes())?;
            self.store(&defaults)?;
            return Ok((defaults, false));
        }

        let mut bytes = [0u8; RECORD_LEN];
        self.storage.read(self.record_offset(), &mut bytes)?;
        Ok((CalibrationRecord::from_bytes(&bytes), true))
    }

    /// Writes the record to its fixed offset.
    ///
    /// The signature written at first-run detection is left untouched.
    pub fn store(&mut self, record: &CalibrationRecord) -> Result<(), S::Error> {
        self.storage.write(self.record_offset(), &record.to_bytes())
    }

    fn record_offset(&self) -> u32 {
        self.base + SIGNATURE_LEN as u32
    }
}

#[cfg(test)]
pub(crate) mod test_storage {
    use embedded_storage::{ReadStorage, Storage};

    /// Fixed-size in-memory stand-in for a flash/EEPROM peripheral.
    /// Starts out erased, all ones, like real blank flash.
    #[derive(Debug)]
    pub(crate) struct MemStorage {
        pub(crate) bytes: [u8; 64],
    }

    impl MemStorage {
        pub(crate) fn blank() -> Self {
            Self { bytes: [0xFF; 64] }
        }
    }

    impl ReadStorage for MemStorage {
        type Error = core::convert::Infallible;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            let start = offset as usize;
            bytes.copy_from_slice(&self.bytes[start..start + bytes.len()]);
            Ok(())
        }

        fn capacity(&self) -> usize {
            self.bytes.len()
        }
    }

    impl Storage for MemStorage {
        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            let start = offset as usize;
            self.bytes[start..start + bytes.len()].copy_from_slice(bytes);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_storage::MemStorage;
    use super::*;
    use crate::mapping::compute_mapping;

    fn record(ul_x: i16, ul_y: i16, lr_x: i16, lr_y: i16) -> CalibrationRecord {
        CalibrationRecord {
            raw_ul_x: ul_x,
            raw_ul_y: ul_y,
            raw_lr_x: lr_x,
            raw_lr_y: lr_y,
        }
    }

    #[test]
    fn first_load_substitutes_and_persists_defaults() {
        let defaults = record(200, 210, 3870, 3930);
        let mut store = SettingsStore::new(MemStorage::blank(), 0);

        let (loaded, was_valid) = store.load(defaults).unwrap();
        assert_eq!(loaded, defaults);
        assert!(!was_valid);

        // The defaults were written along with the signature, so a second
        // load finds an initialized area.
        let (loaded, was_valid) = store.load(record(0, 0, 1, 1)).unwrap();
        assert_eq!(loaded, defaults);
        assert!(was_valid);
    }

    #[test]
    fn store_then_load_returns_the_stored_record() {
        let defaults = record(200, 210, 3870, 3930);
        let mut store = SettingsStore::new(MemStorage::blank(), 0);
        let _ = store.load(defaults).unwrap();

        let measured = record(312, 285, 3805, 3790);
        store.store(&measured).unwrap();

        let (loaded, was_valid) = store.load(defaults).unwrap();
        assert_eq!(loaded, measured);
        assert!(was_valid);
    }

    #[test]
    fn base_offset_moves_the_whole_area() {
        let defaults = record(1, 2, 3, 4);
        let mut store = SettingsStore::new(MemStorage::blank(), 16);
        let _ = store.load(defaults).unwrap();

        store.store(&record(10, 20, 30, 40)).unwrap();
        let (loaded, was_valid) = store.load(defaults).unwrap();
        assert_eq!(loaded, record(10, 20, 30, 40));
        assert!(was_valid);
    }

    #[test]
    fn estimated_defaults_are_usable_for_mapping() {
        let size = Size::new(240, 320);
        let defaults = CalibrationRecord::estimate(size);

        // Proportional over the 12-bit range on each axis.
        assert_eq!(defaults.raw_ul_x, (12 * 4096 / 240) as i16);
        assert_eq!(defaults.raw_lr_y, (307 * 4096 / 320) as i16);

        let params = compute_mapping(&anchor_points(size), &defaults.raw_points()).unwrap();
        assert!(params.scale_x > 0.0);
        assert!(params.scale_y > 0.0);
    }
}
