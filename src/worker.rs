//! Threaded interrupt handling (`std` only).
//!
//! [`Rx8010`] shares one [`RtcDevice`] between the caller and a worker thread
//! named `rx8010-irq`. The interrupt handler calls
//! [`InterruptHandle::on_interrupt`], which masks the line and queues a pass;
//! the worker runs [`RtcDevice::service_interrupt`] under the device mutex and
//! forwards the events to an `mpsc` channel. Every foreground call takes the
//! same mutex, so read-modify-write sequences on Flag and Control never
//! interleave with a pass.
//!
//! ```rust,ignore
//! let (events_tx, events) = std::sync::mpsc::channel();
//! let (device, _) = RtcDevice::start(port, Config::default())?;
//! let rtc = Rx8010::spawn(device, line, events_tx)?;
//! let irq = rtc.interrupt_handle();
//! // from the GPIO interrupt callback:
//! irq.on_interrupt();
//! ```

use crate::{
    AlarmSpec, AlarmState, CalendarTime, InterruptLine, PeriodicTimer, PipelineState, RegisterPort,
    RtcDevice, RtcEvent, Rx8010Error, UpdateSelect,
};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

enum Work {
    Interrupt,
    Close,
}

// A panicking pass must not take the device down with it
fn lock<P: RegisterPort>(device: &Mutex<RtcDevice<P>>) -> MutexGuard<'_, RtcDevice<P>> {
    device.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Entry point for the interrupt handler.
pub struct InterruptHandle<L> {
    line: Arc<L>,
    queue: Sender<Work>,
}

impl<L> Clone for InterruptHandle<L> {
    fn clone(&self) -> Self {
        Self {
            line: Arc::clone(&self.line),
            queue: self.queue.clone(),
        }
    }
}

impl<L: InterruptLine> InterruptHandle<L> {
    /// Masks the line and schedules a deferred pass. Performs no bus I/O.
    ///
    /// # Returns
    /// * `PipelineState::Handling` when the pass was queued
    /// * `PipelineState::Disarmed` when the worker is gone
    pub fn on_interrupt(&self) -> PipelineState {
        self.line.disable();
        match self.queue.send(Work::Interrupt) {
            Ok(()) => PipelineState::Handling,
            Err(_) => PipelineState::Disarmed,
        }
    }
}

/// RX-8010 driver with a worker thread for interrupt handling.
///
/// Dropping the handle shuts the pipeline down and joins the worker.
pub struct Rx8010<P: RegisterPort, L: InterruptLine> {
    device: Arc<Mutex<RtcDevice<P>>>,
    line: Arc<L>,
    queue: Sender<Work>,
    worker: Option<JoinHandle<()>>,
}

impl<P, L> Rx8010<P, L>
where
    P: RegisterPort + Send + 'static,
    L: InterruptLine + Send + Sync + 'static,
{
    /// Starts the worker thread and unmasks the interrupt line.
    ///
    /// If bring-up found the oscillator stopped, [`RtcEvent::ClockUnreliable`]
    /// is sent before anything else.
    ///
    /// # Arguments
    /// * `device` - An initialised device, see [`RtcDevice::start`]
    /// * `line` - The interrupt line the INT pin is wired to
    /// * `events` - Receives the events raised by the pipeline
    pub fn spawn(mut device: RtcDevice<P>, line: L, events: Sender<RtcEvent>) -> io::Result<Self> {
        if device.take_clock_unreliable() && events.send(RtcEvent::ClockUnreliable).is_err() {
            debug!("rx8010: no event receiver, dropping ClockUnreliable");
        }
        let device = Arc::new(Mutex::new(device));
        let line = Arc::new(line);
        let (queue, work) = mpsc::channel();

        let worker = thread::Builder::new().name("rx8010-irq".into()).spawn({
            let device = Arc::clone(&device);
            let line = Arc::clone(&line);
            move || run(&device, &*line, &work, &events)
        })?;

        line.enable();
        Ok(Self {
            device,
            line,
            queue,
            worker: Some(worker),
        })
    }

    /// A handle for the interrupt handler.
    pub fn interrupt_handle(&self) -> InterruptHandle<L> {
        InterruptHandle {
            line: Arc::clone(&self.line),
            queue: self.queue.clone(),
        }
    }

    /// Runs `f` with exclusive access to the device.
    pub fn with_device<R>(&self, f: impl FnOnce(&mut RtcDevice<P>) -> R) -> R {
        f(&mut lock(&self.device))
    }

    /// See [`RtcDevice::time`].
    pub fn time(&self) -> Result<CalendarTime, Rx8010Error<P::Error>> {
        lock(&self.device).time()
    }

    /// See [`RtcDevice::set_time`].
    pub fn set_time(&self, time: &CalendarTime) -> Result<(), Rx8010Error<P::Error>> {
        lock(&self.device).set_time(time)
    }

    /// See [`RtcDevice::read_alarm`].
    pub fn read_alarm(&self) -> Result<AlarmState, Rx8010Error<P::Error>> {
        lock(&self.device).read_alarm()
    }

    /// See [`RtcDevice::set_alarm`].
    pub fn set_alarm(&self, alarm: &AlarmSpec) -> Result<(), Rx8010Error<P::Error>> {
        lock(&self.device).set_alarm(alarm)
    }

    /// See [`RtcDevice::set_alarm_enabled`].
    pub fn set_alarm_enabled(&self, enabled: bool) -> Result<(), Rx8010Error<P::Error>> {
        lock(&self.device).set_alarm_enabled(enabled)
    }

    /// See [`RtcDevice::set_update_interrupt`].
    pub fn set_update_interrupt(
        &self,
        enabled: bool,
        select: UpdateSelect,
    ) -> Result<(), Rx8010Error<P::Error>> {
        lock(&self.device).set_update_interrupt(enabled, select)
    }

    /// See [`RtcDevice::set_periodic_timer`].
    pub fn set_periodic_timer(
        &self,
        timer: Option<PeriodicTimer>,
    ) -> Result<(), Rx8010Error<P::Error>> {
        lock(&self.device).set_periodic_timer(timer)
    }

    /// See [`RtcDevice::ioctl`].
    pub fn ioctl(&self, code: u32) -> Result<u32, Rx8010Error<P::Error>> {
        lock(&self.device).ioctl(code)
    }

    /// Shuts the pipeline down, joins the worker and gives the device back.
    pub fn shutdown(mut self) -> Option<RtcDevice<P>> {
        self.teardown();
        let device = Arc::clone(&self.device);
        drop(self);
        let device = Arc::try_unwrap(device).ok()?;
        Some(device.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}

impl<P: RegisterPort, L: InterruptLine> Rx8010<P, L> {
    fn teardown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        // Flag and mask under the lock so a running pass cannot re-arm
        lock(&self.device).shutdown(&*self.line);
        // The worker may already be gone, then there is nothing to wake
        let _ = self.queue.send(Work::Close);
        if worker.join().is_err() {
            error!("rx8010: interrupt worker panicked");
        }
        debug!("rx8010: interrupt worker stopped");
    }
}

impl<P: RegisterPort, L: InterruptLine> Drop for Rx8010<P, L> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn run<P: RegisterPort, L: InterruptLine + ?Sized>(
    device: &Mutex<RtcDevice<P>>,
    line: &L,
    work: &Receiver<Work>,
    events: &Sender<RtcEvent>,
) {
    while let Ok(Work::Interrupt) = work.recv() {
        let state = lock(device).service_interrupt(line, |event| {
            if events.send(event).is_err() {
                debug!("rx8010: no event receiver, dropping {:?}", event);
            }
        });
        debug!("rx8010: interrupt pass done, {:?}", state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mock, TestLine, ADDR};
    use crate::{Config, I2cPort, RegAddr};
    use embedded_hal_mock::eh1::i2c::Transaction as I2cTrans;
    use std::time::Duration;
    use std::vec;

    const FLAG: u8 = RegAddr::Flag as u8;
    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_interrupt_raises_events() {
        let i2c = mock(&[
            I2cTrans::write_read(ADDR, vec![FLAG], vec![0x18]),
            I2cTrans::write(ADDR, vec![FLAG, 0x00]),
        ]);
        let mut done = i2c.clone();
        let device = RtcDevice::new(I2cPort::new(i2c, ADDR), Config::default());
        let (tx, rx) = mpsc::channel();

        let rtc = Rx8010::spawn(device, TestLine::default(), tx).unwrap();
        assert!(rtc.line.is_enabled());

        let irq = rtc.interrupt_handle();
        assert_eq!(irq.on_interrupt(), PipelineState::Handling);

        assert_eq!(rx.recv_timeout(TIMEOUT), Ok(RtcEvent::PeriodicTick));
        assert_eq!(rx.recv_timeout(TIMEOUT), Ok(RtcEvent::AlarmFired));

        let device = rtc.shutdown().unwrap();
        assert!(device.is_shutting_down());
        done.done();
    }

    #[test]
    fn test_reset_at_start_reports_clock_unreliable() {
        let epoch = vec![RegAddr::Seconds as u8, 0x00, 0x00, 0x00, 0x04, 0x01, 0x01, 0x70];
        let i2c = mock(&[
            I2cTrans::write(ADDR, vec![0x17, 0xD8]),
            I2cTrans::write(ADDR, vec![0x30, 0x00]),
            I2cTrans::write(ADDR, vec![0x31, 0x08]),
            I2cTrans::write_read(ADDR, vec![RegAddr::Extension as u8], vec![0x00, 0x02, 0x00]),
            I2cTrans::write(ADDR, vec![RegAddr::Extension as u8, 0x02]),
            I2cTrans::write(ADDR, vec![FLAG, 0x00]),
            I2cTrans::write(ADDR, vec![RegAddr::Control as u8, 0x00]),
            I2cTrans::write_read(ADDR, vec![RegAddr::Control as u8], vec![0x00]),
            I2cTrans::write(ADDR, vec![RegAddr::Control as u8, 0x40]),
            I2cTrans::write(ADDR, epoch),
            I2cTrans::write_read(ADDR, vec![RegAddr::Control as u8], vec![0x40]),
            I2cTrans::write(ADDR, vec![RegAddr::Control as u8, 0x00]),
        ]);
        let mut done = i2c.clone();
        let port = I2cPort::new(i2c, ADDR);
        let (device, was_reset) = RtcDevice::start(port, Config::default()).unwrap();
        assert!(was_reset);
        let (tx, rx) = mpsc::channel();

        let rtc = Rx8010::spawn(device, TestLine::default(), tx).unwrap();
        assert_eq!(rx.recv_timeout(TIMEOUT), Ok(RtcEvent::ClockUnreliable));
        assert!(rx.try_recv().is_err());

        let mut device = rtc.shutdown().unwrap();
        assert!(!device.take_clock_unreliable());
        done.done();
    }

    #[test]
    fn test_shutdown_masks_line_and_stops_worker() {
        let i2c = mock(&[]);
        let mut done = i2c.clone();
        let device = RtcDevice::new(I2cPort::new(i2c, ADDR), Config::default());
        let (tx, rx) = mpsc::channel();

        let rtc = Rx8010::spawn(device, TestLine::default(), tx).unwrap();
        let line = Arc::clone(&rtc.line);
        let irq = rtc.interrupt_handle();
        drop(rtc);

        assert!(!line.is_enabled());
        assert_eq!(line.disable_count(), 1);
        // The worker is gone: nothing is queued and the line stays masked
        assert_eq!(irq.on_interrupt(), PipelineState::Disarmed);
        assert!(!line.is_enabled());
        // The sender went away with the worker
        assert!(rx.recv_timeout(TIMEOUT).is_err());
        done.done();
    }

    #[test]
    fn test_foreground_calls_share_the_device() {
        let i2c = mock(&[
            I2cTrans::write_read(ADDR, vec![FLAG], vec![0x02]),
            I2cTrans::write_read(
                ADDR,
                vec![RegAddr::Seconds as u8],
                vec![0x30, 0x15, 0x12, 0x03, 0x25, 0x09, 0x23],
            ),
        ]);
        let mut done = i2c.clone();
        let device = RtcDevice::new(I2cPort::new(i2c, ADDR), Config::default());
        let (tx, _rx) = mpsc::channel();

        let rtc = Rx8010::spawn(device, TestLine::default(), tx).unwrap();
        assert_eq!(rtc.ioctl(crate::RTC_VL_READ), Ok(1));
        assert_eq!(rtc.time().unwrap().year, 2023);
        assert!(rtc.with_device(|device| !device.is_shutting_down()));
        drop(rtc);
        done.done();
    }
}
