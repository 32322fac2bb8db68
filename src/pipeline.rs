//! Interrupt handling.
//!
//! The RX-8010 signals the alarm, the fixed-cycle timer and the time update on
//! one open-drain INT pin. Handling an interrupt is split in two:
//!
//! 1. In interrupt context the line is masked and work is queued. No bus
//!    traffic happens there.
//! 2. A deferred pass, with exclusive access to the device, drains the Flag
//!    register with [`RtcDevice::service_interrupt`], raises one [`RtcEvent`]
//!    per set flag and unmasks the line again.
//!
//! Once [`RtcDevice::shutdown`] ran the line stays masked for good.
//!
//! The `std` feature provides a ready-made worker thread in
//! [`worker`](crate::worker); other environments call
//! [`RtcDevice::service_interrupt`] from their own deferred context.

use crate::{Flag, RegAddr, RegisterPort, RtcDevice};

/// Events raised by the interrupt pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RtcEvent {
    /// The fixed-cycle timer expired (TF)
    PeriodicTick,
    /// The alarm matched (AF)
    AlarmFired,
    /// The time update interrupt fired (UF)
    UpdateTick,
    /// The oscillator stopped at some point (VLF), the time may be wrong
    ClockUnreliable,
}

// Event flags and the event each one raises, in delivery order
const FLAG_EVENTS: [(u8, RtcEvent); 3] = [
    (Flag::TIMER, RtcEvent::PeriodicTick),
    (Flag::ALARM, RtcEvent::AlarmFired),
    (Flag::UPDATE, RtcEvent::UpdateTick),
];

/// The interrupt line the INT pin is wired to.
///
/// Both methods are called from interrupt context as well as from the
/// deferred pass, so they only take `&self`.
pub trait InterruptLine {
    /// Unmasks the interrupt.
    fn enable(&self);
    /// Masks the interrupt.
    fn disable(&self);
}

/// State of the interrupt pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PipelineState {
    /// Line unmasked, waiting for the chip
    Armed,
    /// Line masked, a deferred pass is queued or running
    Handling,
    /// Shut down, the line stays masked
    Disarmed,
}

impl<P: RegisterPort> RtcDevice<P> {
    /// Runs one deferred interrupt pass.
    ///
    /// Reads the Flag register once, raises [`RtcEvent::ClockUnreliable`] if
    /// VLF is set or a bring-up notice is still pending, and one event per set
    /// event flag, then writes the flags back with the handled bits cleared.
    /// Unless the device is shutting down the line is unmasked afterwards, also
    /// when the bus failed.
    ///
    /// Events already raised are not retracted when the final write fails.
    pub fn service_interrupt<L, F>(&mut self, line: &L, mut raise: F) -> PipelineState
    where
        L: InterruptLine + ?Sized,
        F: FnMut(RtcEvent),
    {
        self.drain_flags(&mut raise);

        if self.shutdown {
            debug!("rx8010: shutting down, interrupt stays masked");
            PipelineState::Disarmed
        } else {
            line.enable();
            PipelineState::Armed
        }
    }

    fn drain_flags<F: FnMut(RtcEvent)>(&mut self, raise: &mut F) {
        let pending = self.take_clock_unreliable();
        let flag = match self.flag() {
            Ok(flag) => flag,
            Err(_) => {
                error!("rx8010: failed to read flag register");
                if pending {
                    raise(RtcEvent::ClockUnreliable);
                }
                return;
            }
        };
        debug!("rx8010: interrupt, flag={:?}", flag);

        if flag.voltage_low() {
            warn!("rx8010: oscillation stop detected, clock may be wrong");
        }
        if pending || flag.voltage_low() {
            raise(RtcEvent::ClockUnreliable);
        }

        let mut status = u8::from(flag);
        for (mask, event) in FLAG_EVENTS {
            if status & mask != 0 {
                status &= !mask;
                raise(event);
            }
        }

        if self
            .port
            .write_register(RegAddr::Flag.into(), status)
            .is_err()
        {
            error!("rx8010: failed to clear flag register");
        }
    }

    /// Stops the pipeline for good: sets the shutdown flag and masks the line.
    ///
    /// Call with the same exclusive access the deferred pass runs under, so a
    /// pass in flight either sees the flag or has already finished.
    pub fn shutdown<L: InterruptLine + ?Sized>(&mut self, line: &L) {
        self.shutdown = true;
        line.disable();
    }

    /// Whether [`RtcDevice::shutdown`] was called.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown
    }
}
