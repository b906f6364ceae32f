mod tests {
    use core::convert::Infallible;

    use embassy_time::{Duration, Instant};
    use embedded_hal::digital::{ErrorType, OutputPin};
    use scoreboard_ir::ota::OtaGate;
    use scoreboard_ir::{BoardError, Controller, IrTransmitter, Rc5Frame, UpdateTransport};

    #[derive(Default)]
    struct RecordingIr {
        sent: Vec<Rc5Frame>,
    }

    impl IrTransmitter for RecordingIr {
        fn transmit(&mut self, frame: Rc5Frame) -> Result<(), BoardError> {
            self.sent.push(frame);
            Ok(())
        }
    }

    #[derive(Default)]
    struct LevelPin {
        high: bool,
        writes: usize,
    }

    impl ErrorType for LevelPin {
        type Error = Infallible;
    }

    impl OutputPin for LevelPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingOta {
        begun: u32,
        polls: u32,
    }

    impl UpdateTransport for CountingOta {
        fn begin(&mut self) {
            self.begun += 1;
        }

        fn poll(&mut self) {
            self.polls += 1;
        }
    }

    type TestController = Controller<RecordingIr, LevelPin, LevelPin, CountingOta>;

    fn controller() -> TestController {
        Controller::new(
            RecordingIr::default(),
            LevelPin::default(),
            LevelPin::default(),
            CountingOta::default(),
        )
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn request(command: u8, id: u16, payload: &[u8]) -> Vec<u8> {
        let mut datagram = vec![0xA5, 0x01, command];
        datagram.extend_from_slice(&id.to_le_bytes());
        datagram.push(payload.len() as u8);
        datagram.extend_from_slice(payload);
        datagram
    }

    /// Tick once per millisecond over `from..=to` with the link up
    fn run(controller: &mut TestController, from: u64, to: u64) {
        for ms in from..=to {
            controller.tick(at(ms), true);
        }
    }

    fn accepted(ack: Option<scoreboard_ir::Ack>) -> bool {
        ack.is_some_and(|ack| ack.is_accepted())
    }

    #[test]
    fn press_is_acknowledged_before_it_is_sent() {
        let mut controller = controller();

        let ack = controller.handle_datagram(&[0xA5, 0x01, 0x01, 0x05, 0x00, 0x00], at(0));
        assert_eq!(
            ack.map(|ack| ack.to_bytes()),
            Some([0xA5, 0x01, 0x7F, 0x05, 0x00, 0x01, 0x00])
        );
        assert!(controller.ir().sent.is_empty());
        assert_eq!(controller.pending_actions(), 1);

        controller.tick(at(1), true);
        assert_eq!(controller.ir().sent.len(), 1);
        assert_eq!(controller.pending_actions(), 0);
    }

    #[test]
    fn duplicate_request_only_replays_the_ack() {
        let mut controller = controller();
        let datagram = request(0x01, 5, &[]);

        let first = controller.handle_datagram(&datagram, at(0));
        let second = controller.handle_datagram(&datagram, at(1));
        assert_eq!(first, second);
        assert_eq!(controller.pending_actions(), 1);

        run(&mut controller, 2, 50);
        assert_eq!(controller.ir().sent.len(), 1);
    }

    #[test]
    fn new_id_after_duplicate_is_processed() {
        let mut controller = controller();
        controller.handle_datagram(&request(0x01, 5, &[]), at(0));
        controller.handle_datagram(&request(0x01, 5, &[]), at(0));
        controller.handle_datagram(&request(0x02, 6, &[]), at(0));
        assert_eq!(controller.pending_actions(), 2);
    }

    #[test]
    fn foreign_and_short_datagrams_are_ignored() {
        let mut controller = controller();
        assert_eq!(controller.handle_datagram(&[0xA5, 0x01, 0x01], at(0)), None);
        assert_eq!(
            controller.handle_datagram(&[0x5A, 0x01, 0x01, 0x05, 0x00, 0x00], at(0)),
            None
        );
        assert_eq!(
            controller.handle_datagram(&[0xA5, 0x02, 0x01, 0x05, 0x00, 0x00], at(0)),
            None
        );
        assert_eq!(controller.pending_actions(), 0);
    }

    #[test]
    fn length_mismatch_is_rejected_and_replayed() {
        let mut controller = controller();
        let truncated = [0xA5, 0x01, 0x01, 0x0B, 0x00, 0x02, 0x00];

        let ack = controller.handle_datagram(&truncated, at(0));
        assert_eq!(
            ack.map(|ack| ack.to_bytes()),
            Some([0xA5, 0x01, 0x7F, 0x0B, 0x00, 0x00, 0x00])
        );
        assert_eq!(controller.handle_datagram(&truncated, at(1)), ack);
        assert_eq!(controller.pending_actions(), 0);
    }

    #[test]
    fn mode_switch_presses_exit_three_times_with_gaps() {
        let mut controller = controller();
        assert!(accepted(controller.handle_datagram(&request(0x40, 1, &[]), at(0))));

        let mut press_times = Vec::new();
        for ms in 1..=800 {
            let before = controller.ir().sent.len();
            controller.tick(at(ms), true);
            if controller.ir().sent.len() > before {
                press_times.push(ms);
            }
        }

        assert_eq!(press_times, vec![1, 102, 203]);
        let sent = &controller.ir().sent;
        assert!(sent.iter().all(|f| f.code & 0x7FF == sent[0].code & 0x7FF));
        assert_ne!(sent[0].code & 0x800, sent[1].code & 0x800);
        assert_ne!(sent[1].code & 0x800, sent[2].code & 0x800);
        assert_eq!(controller.pending_actions(), 0);
    }

    #[test]
    fn toggle_bit_flips_once_per_press() {
        let mut controller = controller();
        let initial = controller.toggle_bit();
        controller.handle_datagram(&request(0x41, 1, &[]), at(0));
        run(&mut controller, 1, 1_000);

        assert_eq!(controller.ir().sent.len(), 4);
        assert_eq!(controller.toggle_bit(), initial);
    }

    #[test]
    fn macro_is_rejected_whole_when_it_does_not_fit() {
        let mut controller = controller();
        for id in 1..=26u16 {
            assert!(accepted(controller.handle_datagram(&request(0x01, id, &[]), at(0))));
        }
        assert_eq!(controller.free_slots(), 6);

        let ack = controller.handle_datagram(&request(0x41, 100, &[]), at(0));
        assert!(!accepted(ack));
        assert_eq!(controller.pending_actions(), 26);

        // The mode switch needs exactly six slots
        assert!(accepted(controller.handle_datagram(&request(0x40, 101, &[]), at(0))));
        assert_eq!(controller.pending_actions(), 32);
        assert!(!accepted(controller.handle_datagram(&request(0x01, 102, &[]), at(0))));
    }

    #[test]
    fn unknown_command_is_rejected() {
        let mut controller = controller();
        let ack = controller.handle_datagram(&request(0x33, 9, &[]), at(0));
        assert_eq!(
            ack.map(|ack| ack.to_bytes()),
            Some([0xA5, 0x01, 0x7F, 0x09, 0x00, 0x00, 0x00])
        );
    }

    #[test]
    fn siren_follows_two_phase_program() {
        let mut controller = controller();
        let payload = [0x02, 0x64, 0x00, 0x32, 0x00, 0xC8, 0x00, 0x50, 0x00];
        assert!(accepted(controller.handle_datagram(&request(0x60, 1, &payload), at(0))));
        assert!(controller.siren_pin().high);

        let mut levels = vec![(0u64, true)];
        for ms in 1..=600 {
            controller.tick(at(ms), true);
            let level = controller.siren_pin().high;
            if levels.last().map(|&(_, last)| last) != Some(level) {
                levels.push((ms, level));
            }
        }

        assert_eq!(
            levels,
            vec![(0, true), (100, false), (150, true), (350, false)]
        );
        assert!(!controller.siren_active());
    }

    #[test]
    fn siren_program_is_replaced_by_a_new_one() {
        let mut controller = controller();
        let long = [0x01, 0xE8, 0x03, 0x00, 0x00];
        let short = [0x01, 0x0A, 0x00, 0x0A, 0x00];
        controller.handle_datagram(&request(0x60, 1, &long), at(0));
        run(&mut controller, 1, 50);
        controller.handle_datagram(&request(0x60, 2, &short), at(50));

        run(&mut controller, 51, 80);
        assert!(!controller.siren_active());
        assert!(!controller.siren_pin().high);
    }

    #[test]
    fn malformed_siren_payload_is_rejected_and_silent() {
        let mut controller = controller();
        let ack = controller.handle_datagram(
            &[0xA5, 0x01, 0x60, 0x07, 0x00, 0x03, 0x01, 0x64, 0x00, 0x32, 0x00],
            at(0),
        );
        assert_eq!(
            ack.map(|ack| ack.to_bytes()),
            Some([0xA5, 0x01, 0x7F, 0x07, 0x00, 0x00, 0x00])
        );

        for payload in [&[0x00][..], &[0x04, 0, 0, 0, 0][..], &[0x01, 0x64, 0x00][..]] {
            assert!(!accepted(controller.handle_datagram(&request(0x60, 8, payload), at(0))));
            controller.handle_datagram(&request(0x01, 9, &[]), at(0));
        }
        assert!(!controller.siren_active());
        assert!(!controller.siren_pin().high);
    }

    #[test]
    fn service_window_gates_other_commands_until_it_expires() {
        let mut controller = Controller::with_gate(
            RecordingIr::default(),
            LevelPin::default(),
            LevelPin::default(),
            CountingOta::default(),
            OtaGate::with_window(Duration::from_millis(1_000)),
        );

        assert!(accepted(controller.handle_datagram(&request(0x70, 1, &[]), at(0))));
        assert_eq!(controller.update_transport().begun, 1);
        assert!(controller.service_window_open(at(10)));

        assert!(!accepted(controller.handle_datagram(&request(0x01, 2, &[]), at(10))));
        let siren = [0x01, 0x64, 0x00, 0x32, 0x00];
        assert!(!accepted(controller.handle_datagram(&request(0x60, 3, &siren), at(10))));
        assert_eq!(controller.pending_actions(), 0);

        // Re-entering extends the window without restarting the transport
        assert!(accepted(controller.handle_datagram(&request(0x70, 4, &[]), at(800))));
        assert_eq!(controller.update_transport().begun, 1);
        assert!(controller.service_window_open(at(1_500)));

        run(&mut controller, 801, 1_799);
        let polls = controller.update_transport().polls;
        assert!(polls > 0);
        controller.tick(at(1_800), true);
        assert!(!controller.service_window_open(at(1_800)));
        controller.tick(at(1_801), true);
        assert_eq!(controller.update_transport().polls, polls);

        assert!(accepted(controller.handle_datagram(&request(0x01, 5, &[]), at(1_801))));
    }

    #[test]
    fn update_transport_is_not_polled_without_link() {
        let mut controller = controller();
        controller.handle_datagram(&request(0x70, 1, &[]), at(0));
        for ms in 1..=100 {
            controller.tick(at(ms), false);
        }
        assert_eq!(controller.update_transport().polls, 0);
    }

    #[test]
    fn ota_enter_with_payload_is_rejected() {
        let mut controller = controller();
        assert!(!accepted(controller.handle_datagram(&request(0x70, 1, &[0x01]), at(0))));
        assert!(!controller.service_window_open(at(1)));
        assert_eq!(controller.update_transport().begun, 0);
    }

    #[test]
    fn status_led_blinks_on_activity_and_follows_link() {
        let mut controller = controller();
        controller.tick(at(0), true);
        assert!(controller.status_led().high);
        controller.tick(at(1), false);
        assert!(!controller.status_led().high);

        controller.handle_datagram(&request(0x33, 1, &[]), at(2));
        controller.tick(at(3), false);
        assert!(!controller.status_led().high);

        controller.handle_datagram(&request(0x01, 2, &[]), at(10));
        let writes_before = controller.status_led().writes;
        run(&mut controller, 10, 700);
        assert!(controller.status_led().writes > writes_before);
        assert!(controller.status_led().high);
    }
}
