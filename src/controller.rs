//! Control-loop context
//!
//! [`Controller`] owns every piece of process-wide state (dedup memory,
//! action queue, toggle bit, siren program, OTA window, status LED burst)
//! together with the outputs it drives. The firmware calls
//! [`Controller::handle_datagram`] for each received datagram and
//! [`Controller::tick`] once per loop iteration. Neither call blocks.

use embassy_time::Instant;
use embedded_hal::digital::{OutputPin, PinState};

use crate::config::SIREN_ACTIVE_HIGH;
use crate::dispatcher::{Dispatcher, Inbound};
use crate::indicator::ActivityIndicator;
use crate::interpreter::{self, Command, Reject};
use crate::ota::OtaGate;
use crate::protocol::{Ack, AckStatus, Request};
use crate::queue::Action;
use crate::rc5::{ButtonIndex, Rc5Encoder};
use crate::scheduler::ActionScheduler;
use crate::siren::SirenEngine;
use crate::{IrTransmitter, UpdateTransport};

pub struct Controller<IR, SIREN, LED, OTA>
where
    IR: IrTransmitter,
    SIREN: OutputPin,
    LED: OutputPin,
    OTA: UpdateTransport,
{
    dispatcher: Dispatcher,
    scheduler: ActionScheduler,
    encoder: Rc5Encoder,
    siren: SirenEngine,
    ota: OtaGate,
    indicator: ActivityIndicator,

    ir: IR,
    siren_pin: SIREN,
    status_led: LED,
    update: OTA,
}

impl<IR, SIREN, LED, OTA> Controller<IR, SIREN, LED, OTA>
where
    IR: IrTransmitter,
    SIREN: OutputPin,
    LED: OutputPin,
    OTA: UpdateTransport,
{
    /// Create a controller. The siren is driven off straight away.
    pub fn new(ir: IR, siren_pin: SIREN, status_led: LED, update: OTA) -> Self {
        Self::with_gate(ir, siren_pin, status_led, update, OtaGate::new())
    }

    /// Create a controller with a custom OTA gate (window length)
    pub fn with_gate(ir: IR, siren_pin: SIREN, status_led: LED, update: OTA, ota: OtaGate) -> Self {
        let mut controller = Self {
            dispatcher: Dispatcher::new(),
            scheduler: ActionScheduler::new(),
            encoder: Rc5Encoder::new(),
            siren: SirenEngine::new(),
            ota,
            indicator: ActivityIndicator::new(),
            ir,
            siren_pin,
            status_led,
            update,
        };
        controller.write_siren(false);
        controller.write_status_led(false);
        controller
    }

    /// Handle one received datagram.
    ///
    /// Returns the acknowledgement to send back to the sender, or `None`
    /// when the datagram is dropped silently. Queued IR work only runs on
    /// later ticks, so the caller sends the acknowledgement first.
    pub fn handle_datagram(&mut self, datagram: &[u8], now: Instant) -> Option<Ack> {
        match self.dispatcher.admit(datagram) {
            Inbound::Dropped(err) => {
                crate::log!("[UDP] Dropping datagram: {:?}", err);
                None
            }
            Inbound::Answer(ack) => {
                crate::log!(
                    "[UDP] Answering id {} with stored status {:?}",
                    ack.request_id,
                    ack.status
                );
                Some(ack)
            }
            Inbound::Fresh(request) => {
                let status = match self.interpret(&request, now) {
                    Ok(()) => {
                        self.indicator.trigger(now);
                        AckStatus::Accepted
                    }
                    Err(reason) => {
                        crate::log!(
                            "[UDP] Rejecting command 0x{:02x} id {}: {:?}",
                            request.command,
                            request.request_id,
                            reason
                        );
                        AckStatus::Rejected
                    }
                };
                Some(self.dispatcher.settle(request.request_id, status))
            }
        }
    }

    fn interpret(&mut self, request: &Request<'_>, now: Instant) -> Result<(), Reject> {
        let command = interpreter::interpret(
            request.command,
            request.payload,
            self.ota.is_open(now),
        )?;

        match command {
            Command::Press(button) => self
                .scheduler
                .enqueue(Action::Press(button))
                .map_err(|_| Reject::QueueFull),
            Command::Sequence(actions) => self
                .scheduler
                .enqueue_all(actions)
                .map_err(|_| Reject::QueueFull),
            Command::Siren(program) => {
                crate::log!("[SIREN] Starting {} phase program", program.phases().len());
                let level = self.siren.start(program, now);
                self.write_siren(level);
                Ok(())
            }
            Command::EnterService => {
                if self.ota.enter(now) {
                    self.update.begin();
                }
                self.indicator.trigger(now);
                Ok(())
            }
        }
    }

    /// One control-loop step: status LED, OTA window, one queued action,
    /// siren phase.
    pub fn tick(&mut self, now: Instant, link_up: bool) {
        let led = self.indicator.tick(now, link_up);
        self.write_status_led(led);

        if self.ota.tick(now) && link_up {
            self.update.poll();
        }

        if let Some(button) = self.scheduler.tick(now) {
            self.press(button, now);
        }

        if let Some(level) = self.siren.tick(now) {
            self.write_siren(level);
        }
    }

    fn press(&mut self, button: ButtonIndex, now: Instant) {
        let frame = self.encoder.encode_press(button);
        if let Err(e) = self.ir.transmit(frame) {
            crate::log!("[IR] Failed to send {}: {:?}", button.entry().name, e);
        }
        self.indicator.trigger(now);
    }

    fn write_siren(&mut self, on: bool) {
        let state = PinState::from(on == SIREN_ACTIVE_HIGH);
        if self.siren_pin.set_state(state).is_err() {
            crate::log!("[SIREN] Failed to drive output");
        }
    }

    fn write_status_led(&mut self, on: bool) {
        // Status LED errors are not actionable
        let _ = self.status_led.set_state(PinState::from(on));
    }

    pub fn pending_actions(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn free_slots(&self) -> usize {
        self.scheduler.free()
    }

    pub fn toggle_bit(&self) -> bool {
        self.encoder.toggle()
    }

    pub fn siren_active(&self) -> bool {
        self.siren.is_active()
    }

    pub fn service_window_open(&self, now: Instant) -> bool {
        self.ota.is_open(now)
    }

    pub fn ir(&self) -> &IR {
        &self.ir
    }

    pub fn siren_pin(&self) -> &SIREN {
        &self.siren_pin
    }

    pub fn status_led(&self) -> &LED {
        &self.status_led
    }

    pub fn update_transport(&self) -> &OTA {
        &self.update
    }
}
