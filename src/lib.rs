#![cfg_attr(not(test), no_std)]

//! ESP32-C3 Scoreboard IR Bridge Library
//!
//! Receives compact binary UDP commands, turns them into RC5 infrared remote
//! presses (plus an auxiliary siren output) and acknowledges every command.
//!
//! Everything outside the `firmware` feature is hardware independent and is
//! exercised by the host test-suite. The firmware adapters (Wi-Fi, UDP socket,
//! RMT IR transmitter) only build for the ESP32-C3.

mod macros;

pub mod controller;
pub mod dispatcher;
pub mod indicator;
pub mod interpreter;
pub mod link;
pub mod ota;
pub mod protocol;
pub mod queue;
pub mod rc5;
pub mod scheduler;
pub mod siren;

#[cfg(feature = "firmware")]
pub mod ir_tx;
#[cfg(feature = "firmware")]
pub mod udp_server;
#[cfg(feature = "firmware")]
pub mod wifi;

pub use controller::Controller;
pub use protocol::{Ack, AckStatus, Request};
pub use rc5::{ButtonIndex, Rc5Frame};

/// Project version information
pub const VERSION: &str = "0.1.0-dev";

/// Default configuration constants
pub mod config {
    use embassy_time::Duration;

    /// UDP port the command socket listens on
    pub const UDP_PORT: u16 = 4210;

    /// IR LED GPIO pin (RMT channel 0)
    pub const IR_LED_PIN: u8 = 4;

    /// Status LED GPIO pin (devkit LED)
    pub const STATUS_LED_PIN: u8 = 8;

    /// Siren relay GPIO pin
    pub const SIREN_PIN: u8 = 5;

    /// Siren output is driven high while sounding
    pub const SIREN_ACTIVE_HIGH: bool = true;

    /// Pending IR actions the queue can hold
    pub const ACTION_QUEUE_CAPACITY: usize = 32;

    /// Gap between presses inside a macro
    pub const IR_GAP: Duration = Duration::from_millis(100);

    /// Settle time after the third exit press of the mode switch macro
    pub const IR_GAP_MODE_SWITCH_END: Duration = Duration::from_millis(500);

    /// Status LED burst timing
    pub const ACTIVITY_BLINK_ON: Duration = Duration::from_millis(70);
    pub const ACTIVITY_BLINK_OFF: Duration = Duration::from_millis(70);
    pub const ACTIVITY_BLINK_COUNT: u8 = 4;

    /// OTA service window, re-armed by every OTA-enter command
    pub const OTA_WINDOW: Duration = Duration::from_millis(180_000);

    /// Hostname announced by the OTA listener
    pub const OTA_HOSTNAME: &str = "scoreboard-esp32";

    /// Port of the OTA listener
    pub const OTA_PORT: u16 = 3232;

    /// Interval between Wi-Fi reconnect attempts while the link is down
    pub const WIFI_RETRY_INTERVAL: Duration = Duration::from_millis(3000);

    /// How long the control loop waits for a datagram before ticking
    pub const RECV_POLL: Duration = Duration::from_millis(1);

    /// WiFi configuration
    /// Read from environment variables at compile time
    pub const WIFI_SSID: &str = env!("WIFI_SSID");
    pub const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");
}

/// Error types for the IR bridge hardware layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    /// WiFi connection error
    WiFiError,
    /// UDP socket error
    UdpError,
    /// IR transmission error
    IrError,
    /// Digital output error
    GpioError,
    /// System error
    SystemError,
}

/// Sends one RC5 code word on the IR LED.
///
/// Implementations are synchronous: the frame is on air when `transmit`
/// returns.
pub trait IrTransmitter {
    fn transmit(&mut self, frame: Rc5Frame) -> Result<(), BoardError>;
}

/// Firmware update transport that is only serviced during the OTA window.
pub trait UpdateTransport {
    /// Bring the transport up. Called once, on the first OTA-enter command.
    fn begin(&mut self);

    /// Service pending update traffic. Called every tick while the window is
    /// open and the link is up.
    fn poll(&mut self);
}
