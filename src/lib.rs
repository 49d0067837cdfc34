//! # FT6336U Touch Controller Driver Crate
//!
//! A driver for the FT6336U capacitive touch controller, providing register access and a polling routine that tracks up to two contacts across reads.
//!
//! The FT6336U only reports the touches present at the moment of a read. This driver keeps one slot per hardware touch id (0 and 1) and
//! derives, on every poll, whether a contact just landed (`TouchDown`), is being held (`Streaming`) or was lifted (`Released`).
//! Many boards (the M5Stack Core2 among them) route this controller through a shared I2C bus, so every multi-byte read is done as a single `write_read` transaction.
//!
//! This driver is `embedded-hal` compatible and provides a generic interface for the optional device reset functionality.
//! This is because the reset pin can be controlled via a GPIO port, an I2C I/O expander or a power management IC.
//!
//! The INT pin is not used. If interrupts need to be supported, the user can attach the pin output to an interrupt and call `poll` from their own callback.
//!
//! ## Usage
//!
//! 1. Create an instance of the `Ft6336uDriver`.
//! 2. Initialize the touch driver. This checks the firmware ID of the chip.
//! 3. Call `poll` once per sampling interval and read the returned snapshot.
//!
//! ```ignore
//! let mut touch = Ft6336uDriver::new(I2CInstance, FT6336U_DEVICE_ADDRESS);
//!
//! touch
//!     .initialize()
//!     .expect("Touch controller is not responding");
//!
//! loop {
//!     let snapshot = touch.poll().unwrap();
//!     for point in snapshot.active_touches() {
//!         println!("Touch {}: {:?} at ({}, {})", point.id, point.status, point.x, point.y);
//!     }
//!     delay.delay_ms(20);
//! }
//! ```
//!
//! Notes:
//! - Enable the `defmt` feature to get `defmt::Format` on all public types and driver log output.
//! - If the reset line is controlled via an I2C GPIO expander sharing the same bus with the touch driver, you should use `embedded_hal_bus` to manage multiple instances of I2C.

#![no_std]
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

pub mod registers;
pub mod tracker;

pub use registers::{Event, TouchChannel, TouchRecord};
pub use tracker::{
    InvalidTouchId, TouchPoint, TouchPointSnapshot, TouchReport, TouchSlot, TouchStatus,
    MAX_TOUCH_POINTS,
};

use registers::{
    FT6336U_EXPECTED_FIRMWARE_ID, FT6336U_FIRMWARE_ID, FT6336U_TD_STATUS, TOUCH_RECORD_LEN,
};

/// Default 7-bit I2C address of the FT6336U.
pub const FT6336U_DEVICE_ADDRESS: u8 = 0x38;

/// Trait for controlling the FT6336U hardware reset line.
pub trait ResetInterface {
    /// The specific error type for this reset implementation.
    type Error;

    /// Performs the hardware reset sequence for the FT6336U device.
    /// This could be a GPIO port, an I2C expander-controlled pin or a PMIC output.
    /// Recommended Implementation --> LOW delay 10ms --> HIGH
    fn reset(&mut self) -> Result<(), Self::Error>;
}

/// Driver Errors
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError<I2cError> {
    /// Error originating from the I2C bus.
    I2cError(I2cError),
    /// The firmware ID check failed, or the driver was already initialized.
    NotResponding,
    /// `poll` was called before a successful `initialize`.
    NotInitialized,
    /// The chip reported a touch id outside the two supported slots.
    InvalidTouchId(u8),
}

/// FT6336U touch driver
pub struct Ft6336uDriver<I2C> {
    i2c: I2C,
    device_address: u8,
    initialized: bool,
    touch_points: TouchPointSnapshot,
}

impl<I2C> Ft6336uDriver<I2C>
where
    I2C: I2c,
{
    /// Creates a new instance of the FT6336U driver. No bus traffic happens until `initialize`.
    pub fn new(i2c: I2C, device_address: u8) -> Self {
        Ft6336uDriver {
            i2c,
            device_address,
            initialized: false,
            touch_points: TouchPointSnapshot::new(),
        }
    }

    /// Identifies the device by its firmware ID.
    /// Performs exactly one register read. A bus failure, an unexpected ID, or a driver that
    /// is already initialized are all reported as `NotResponding`.
    pub fn initialize(&mut self) -> Result<(), DriverError<I2C::Error>> {
        if self.initialized {
            #[cfg(feature = "defmt")]
            defmt::error!("ft6336u already initialized");
            return Err(DriverError::NotResponding);
        }

        let firmware_id = match self.read_firmware_id() {
            Ok(id) => id,
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::error!("ft6336u firmware id read failed");
                return Err(DriverError::NotResponding);
            }
        };
        if firmware_id != FT6336U_EXPECTED_FIRMWARE_ID {
            #[cfg(feature = "defmt")]
            defmt::error!("unexpected ft6336u firmware id 0x{:02x}", firmware_id);
            return Err(DriverError::NotResponding);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("ft6336u at 0x{:02x} initialized", self.device_address);
        self.initialized = true;
        Ok(())
    }

    /// Returns true once `initialize` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Resets the chip through the provided reset line and waits for it to boot.
    /// The driver returns to the un-initialized state with both slots released, so
    /// `initialize` has to be called again before polling.
    pub fn hardware_reset<RST, D>(
        &mut self,
        reset: &mut RST,
        delay: &mut D,
    ) -> Result<(), RST::Error>
    where
        RST: ResetInterface,
        D: DelayNs,
    {
        self.initialized = false;
        self.touch_points.clear();
        reset.reset()?;
        delay.delay_ms(300);
        Ok(())
    }

    /// Reads a single register.
    pub fn read_register(&mut self, register: u8) -> Result<u8, I2C::Error> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(self.device_address, &[register], &mut buffer)?;
        Ok(buffer[0])
    }

    /// Reads consecutive registers starting at `register` in one transaction.
    pub fn read_registers(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), I2C::Error> {
        self.i2c
            .write_read(self.device_address, &[register], buffer)
    }

    /// Writes a single register.
    pub fn write_register(&mut self, register: u8, value: u8) -> Result<(), I2C::Error> {
        self.i2c.write(self.device_address, &[register, value])
    }

    /// Reads the firmware ID. A responding FT6336U reports 0x10.
    pub fn read_firmware_id(&mut self) -> Result<u8, I2C::Error> {
        self.read_register(FT6336U_FIRMWARE_ID)
    }

    /// Reads the raw number of active touch points.
    pub fn read_touch_count(&mut self) -> Result<u8, I2C::Error> {
        self.read_register(FT6336U_TD_STATUS)
    }

    /// Reads and decodes the record of one touch channel.
    pub fn read_touch_record(&mut self, channel: TouchChannel) -> Result<TouchRecord, I2C::Error> {
        let mut data = [0u8; TOUCH_RECORD_LEN];
        self.read_registers(channel.base_register(), &mut data)?;
        Ok(TouchRecord::from_bytes(&data))
    }

    /// Reads the touch status and updates the two touch slots.
    ///
    /// All registers are read before any slot changes, so on error the previous
    /// snapshot is kept as it was. Counts above 2 are treated like 2.
    pub fn poll(&mut self) -> Result<TouchPointSnapshot, DriverError<I2C::Error>> {
        if !self.initialized {
            return Err(DriverError::NotInitialized);
        }

        let touch_count = self.read_touch_count().map_err(DriverError::I2cError)?;
        let report = match touch_count {
            0 => TouchReport::NoTouch,
            1 => TouchReport::Single(
                self.read_touch_record(TouchChannel::First)
                    .map_err(DriverError::I2cError)?,
            ),
            _ => {
                let first = self
                    .read_touch_record(TouchChannel::First)
                    .map_err(DriverError::I2cError)?;
                let second = self
                    .read_touch_record(TouchChannel::Second)
                    .map_err(DriverError::I2cError)?;
                TouchReport::Dual(first, second)
            }
        };

        #[cfg(feature = "defmt")]
        if touch_count != self.touch_points.touch_count {
            defmt::debug!("touch count {} -> {}", self.touch_points.touch_count, touch_count);
        }

        self.touch_points
            .apply(touch_count, &report)
            .map_err(|InvalidTouchId(id)| {
                #[cfg(feature = "defmt")]
                defmt::warn!("discarding report with touch id {}", id);
                DriverError::InvalidTouchId(id)
            })?;
        Ok(self.touch_points)
    }

    /// Returns the touch slots as of the latest poll without touching the bus.
    pub fn snapshot(&self) -> &TouchPointSnapshot {
        &self.touch_points
    }

    /// Releases the I2C bus.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use std::vec;
    use std::vec::Vec;

    const ADDR: u8 = FT6336U_DEVICE_ADDRESS;

    fn firmware_id(id: u8) -> I2cTransaction {
        I2cTransaction::write_read(ADDR, vec![FT6336U_FIRMWARE_ID], vec![id])
    }

    fn touch_count(count: u8) -> I2cTransaction {
        I2cTransaction::write_read(ADDR, vec![FT6336U_TD_STATUS], vec![count])
    }

    /// Record block for a contact with the given id and coordinates.
    fn touch_record(channel: TouchChannel, id: u8, x: u16, y: u16) -> I2cTransaction {
        I2cTransaction::write_read(
            ADDR,
            vec![channel.base_register()],
            vec![
                0x80 | (x >> 8) as u8,
                x as u8,
                (id << 4) | (y >> 8) as u8,
                y as u8,
                0x18,
                0x40,
            ],
        )
    }

    fn initialized(mut expectations: Vec<I2cTransaction>) -> Ft6336uDriver<I2cMock> {
        expectations.insert(0, firmware_id(0x10));
        let mut touch = Ft6336uDriver::new(I2cMock::new(&expectations), ADDR);
        touch.initialize().unwrap();
        touch
    }

    fn statuses(snapshot: &TouchPointSnapshot) -> [TouchStatus; 2] {
        [snapshot.slots[0].status, snapshot.slots[1].status]
    }

    struct FakeReset {
        pulses: u8,
    }

    impl ResetInterface for FakeReset {
        type Error = ();

        fn reset(&mut self) -> Result<(), Self::Error> {
            self.pulses += 1;
            Ok(())
        }
    }

    #[test]
    fn initialize_accepts_expected_firmware_id() {
        let expectations = [firmware_id(0x10)];
        let mut touch = Ft6336uDriver::new(I2cMock::new(&expectations), ADDR);

        assert!(!touch.is_initialized());
        assert_eq!(touch.initialize(), Ok(()));
        assert!(touch.is_initialized());

        touch.release().done();
    }

    #[test]
    fn initialize_rejects_other_firmware_id() {
        let expectations = [firmware_id(0x11)];
        let mut touch = Ft6336uDriver::new(I2cMock::new(&expectations), ADDR);

        assert_eq!(touch.initialize(), Err(DriverError::NotResponding));
        assert!(!touch.is_initialized());

        touch.release().done();
    }

    #[test]
    fn initialize_reports_bus_failure_as_not_responding() {
        let expectations = [firmware_id(0x10).with_error(ErrorKind::Other)];
        let mut touch = Ft6336uDriver::new(I2cMock::new(&expectations), ADDR);

        assert_eq!(touch.initialize(), Err(DriverError::NotResponding));
        assert!(!touch.is_initialized());

        touch.release().done();
    }

    #[test]
    fn initialize_twice_is_rejected_without_bus_traffic() {
        let mut touch = initialized(vec![]);

        assert_eq!(touch.initialize(), Err(DriverError::NotResponding));
        assert!(touch.is_initialized());

        touch.release().done();
    }

    #[test]
    fn poll_requires_initialization() {
        let mut touch = Ft6336uDriver::new(I2cMock::new(&[]), ADDR);

        assert_eq!(touch.poll(), Err(DriverError::NotInitialized));

        touch.release().done();
    }

    #[test]
    fn finger_down_held_and_lifted() {
        let mut touch = initialized(vec![
            touch_count(1),
            touch_record(TouchChannel::First, 0, 120, 200),
            touch_count(1),
            touch_record(TouchChannel::First, 0, 122, 205),
            touch_count(0),
        ]);

        let snapshot = touch.poll().unwrap();
        assert_eq!(snapshot.touch_count, 1);
        assert_eq!(statuses(&snapshot), [TouchStatus::TouchDown, TouchStatus::Released]);
        assert_eq!((snapshot.slots[0].x, snapshot.slots[0].y), (120, 200));

        let snapshot = touch.poll().unwrap();
        assert_eq!(statuses(&snapshot), [TouchStatus::Streaming, TouchStatus::Released]);
        assert_eq!((snapshot.slots[0].x, snapshot.slots[0].y), (122, 205));

        let snapshot = touch.poll().unwrap();
        assert_eq!(snapshot.touch_count, 0);
        assert_eq!(statuses(&snapshot), [TouchStatus::Released; 2]);
        assert_eq!(touch.snapshot(), &snapshot);

        touch.release().done();
    }

    #[test]
    fn second_finger_lift_releases_its_slot() {
        let mut touch = initialized(vec![
            touch_count(2),
            touch_record(TouchChannel::First, 0, 10, 20),
            touch_record(TouchChannel::Second, 1, 300, 400),
            touch_count(1),
            touch_record(TouchChannel::First, 1, 301, 402),
        ]);

        let snapshot = touch.poll().unwrap();
        assert_eq!(statuses(&snapshot), [TouchStatus::TouchDown; 2]);
        assert_eq!((snapshot.slots[1].x, snapshot.slots[1].y), (300, 400));

        let snapshot = touch.poll().unwrap();
        assert_eq!(statuses(&snapshot), [TouchStatus::Released, TouchStatus::Streaming]);
        assert_eq!((snapshot.slots[1].x, snapshot.slots[1].y), (301, 402));
        assert_eq!(snapshot.active_touches().len(), 1);

        touch.release().done();
    }

    #[test]
    fn full_scale_coordinates_are_decoded() {
        let mut touch = initialized(vec![
            touch_count(1),
            touch_record(TouchChannel::First, 1, 4095, 2612),
        ]);

        let snapshot = touch.poll().unwrap();
        let slot = snapshot.slot(1).unwrap();
        assert_eq!((slot.x, slot.y), (4095, 2612));

        touch.release().done();
    }

    #[test]
    fn bus_error_keeps_previous_snapshot() {
        let mut touch = initialized(vec![
            touch_count(1),
            touch_record(TouchChannel::First, 0, 50, 60),
            touch_count(2),
            touch_record(TouchChannel::First, 0, 51, 61),
            touch_record(TouchChannel::Second, 1, 0, 0).with_error(ErrorKind::Other),
            touch_count(0).with_error(ErrorKind::Other),
        ]);

        let before = touch.poll().unwrap();

        assert_eq!(touch.poll(), Err(DriverError::I2cError(ErrorKind::Other)));
        assert_eq!(touch.snapshot(), &before);

        assert_eq!(touch.poll(), Err(DriverError::I2cError(ErrorKind::Other)));
        assert_eq!(touch.snapshot(), &before);

        touch.release().done();
    }

    #[test]
    fn invalid_touch_id_is_reported() {
        let mut touch = initialized(vec![
            touch_count(1),
            touch_record(TouchChannel::First, 0x0F, 1, 1),
        ]);

        assert_eq!(touch.poll(), Err(DriverError::InvalidTouchId(0x0F)));
        assert_eq!(touch.snapshot(), &TouchPointSnapshot::new());

        touch.release().done();
    }

    #[test]
    fn touch_record_decodes_all_fields() {
        let expectations = [I2cTransaction::write_read(
            ADDR,
            vec![TouchChannel::Second.base_register()],
            vec![0x41, 0x02, 0x13, 0x04, 0x55, 0x60],
        )];
        let mut touch = Ft6336uDriver::new(I2cMock::new(&expectations), ADDR);

        let record = touch.read_touch_record(TouchChannel::Second).unwrap();
        assert_eq!(
            record,
            TouchRecord {
                event: Event::LiftUp,
                id: 1,
                x: 0x0102,
                y: 0x0304,
                weight: 0x55,
                misc: 0x06,
            }
        );

        touch.release().done();
    }

    #[test]
    fn register_primitives_use_single_transactions() {
        let expectations = [
            I2cTransaction::write_read(ADDR, vec![0x05], vec![0x12]),
            I2cTransaction::write_read(ADDR, vec![0x03], vec![0x01, 0x02, 0x03, 0x04]),
            I2cTransaction::write(ADDR, vec![0x80, 0x22]),
        ];
        let mut touch = Ft6336uDriver::new(I2cMock::new(&expectations), ADDR);

        assert_eq!(touch.read_register(0x05), Ok(0x12));
        let mut buffer = [0u8; 4];
        touch.read_registers(0x03, &mut buffer).unwrap();
        assert_eq!(buffer, [0x01, 0x02, 0x03, 0x04]);
        touch.write_register(0x80, 0x22).unwrap();

        touch.release().done();
    }

    #[test]
    fn hardware_reset_requires_new_initialization() {
        let mut touch = initialized(vec![
            touch_count(1),
            touch_record(TouchChannel::First, 0, 1, 1),
            firmware_id(0x10),
        ]);
        touch.poll().unwrap();

        let mut reset = FakeReset { pulses: 0 };
        touch.hardware_reset(&mut reset, &mut NoopDelay::new()).unwrap();

        assert_eq!(reset.pulses, 1);
        assert!(!touch.is_initialized());
        assert_eq!(touch.snapshot(), &TouchPointSnapshot::new());
        assert_eq!(touch.poll(), Err(DriverError::NotInitialized));
        assert_eq!(touch.initialize(), Ok(()));

        touch.release().done();
    }
}
