// Helpers shared by the unit tests

use crate::{Config, I2cPort, InterruptLine, RtcDevice, DEFAULT_ADDRESS};
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};

pub(crate) const ADDR: u8 = DEFAULT_ADDRESS;

pub(crate) type MockDevice = RtcDevice<I2cPort<I2cMock>>;

pub(crate) fn mock(expectations: &[I2cTrans]) -> I2cMock {
    I2cMock::new(expectations)
}

pub(crate) fn device(expectations: &[I2cTrans]) -> MockDevice {
    RtcDevice::new(I2cPort::new(mock(expectations), ADDR), Config::default())
}

pub(crate) fn finish(dev: MockDevice) {
    dev.release().release().done();
}

/// Interrupt line that records how it was driven.
#[derive(Default)]
pub(crate) struct TestLine {
    enabled: AtomicBool,
    enables: AtomicUsize,
    disables: AtomicUsize,
}

impl TestLine {
    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub(crate) fn enable_count(&self) -> usize {
        self.enables.load(Ordering::SeqCst)
    }

    pub(crate) fn disable_count(&self) -> usize {
        self.disables.load(Ordering::SeqCst)
    }
}

impl InterruptLine for TestLine {
    fn enable(&self) {
        self.enables.fetch_add(1, Ordering::SeqCst);
        self.enabled.store(true, Ordering::SeqCst);
    }

    fn disable(&self) {
        self.disables.fetch_add(1, Ordering::SeqCst);
        self.enabled.store(false, Ordering::SeqCst);
    }
}
