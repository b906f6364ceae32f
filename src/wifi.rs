//! WiFi module for ESP32-C3 board
//!
//! Station-mode connection management using esp-wifi 0.14.1 with embassy-net
//! DHCP. Connecting never blocks: the link supervisor polls
//! [`WiFiManager::is_connected`] and asks for a reconnect when needed.

use crate::BoardError;
use embassy_net::Stack;
use esp_println::println;
use esp_wifi::config::PowerSaveMode;
use esp_wifi::wifi::{AuthMethod, ClientConfiguration, Configuration, WifiController};

/// WiFi manager for the station interface
pub struct WiFiManager<'a> {
    controller: WifiController<'a>,
    stack: Stack<'a>,
    started: bool,
}

impl<'a> WiFiManager<'a> {
    /// Create a new WiFi manager instance
    pub fn new(controller: WifiController<'a>, stack: Stack<'a>) -> Self {
        Self {
            controller,
            stack,
            started: false,
        }
    }

    /// Configure the station, start the radio and begin connecting.
    ///
    /// Power saving is disabled so inbound UDP is not delayed by modem sleep.
    pub fn start(&mut self, ssid: &str, password: &str) -> Result<(), BoardError> {
        println!("[WIFI] Connecting to WiFi network: {}", ssid);

        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let client_config = ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| BoardError::WiFiError)?,
            password: password.try_into().map_err(|_| BoardError::WiFiError)?,
            auth_method,
            ..Default::default()
        };

        self.controller
            .set_configuration(&Configuration::Client(client_config))
            .map_err(|_| BoardError::WiFiError)?;

        self.controller.start().map_err(|_| BoardError::WiFiError)?;
        self.started = true;

        if let Err(e) = self.controller.set_power_saving(PowerSaveMode::None) {
            println!("[WIFI] Failed to disable power saving: {:?}", e);
        }

        self.controller.connect().map_err(|_| BoardError::WiFiError)
    }

    /// Ask the driver to associate again with the configured network
    pub fn reconnect(&mut self) -> Result<(), BoardError> {
        if !self.started {
            self.controller.start().map_err(|_| BoardError::WiFiError)?;
            self.started = true;
        }

        // Drop a half-open association before retrying
        let _ = self.controller.disconnect();
        self.controller.connect().map_err(|e| {
            println!("[WIFI] Reconnect failed: {:?}", e);
            BoardError::WiFiError
        })
    }

    /// Associated and holding a DHCP lease
    pub fn is_connected(&self) -> bool {
        self.controller.is_connected().unwrap_or(false) && self.stack.is_config_up()
    }

    /// Get current IP address from DHCP
    pub fn get_ip_address(&self) -> Option<[u8; 4]> {
        self.stack
            .config_v4()
            .map(|config| config.address.address().octets())
    }

    /// Print the DHCP lease
    pub fn print_dhcp_info(&self) {
        match self.stack.config_v4() {
            Some(config) => {
                let ip = config.address.address().octets();
                println!(
                    "[DHCP] IP Address: {}.{}.{}.{}/{}",
                    ip[0],
                    ip[1],
                    ip[2],
                    ip[3],
                    config.address.prefix_len()
                );
                if let Some(gateway) = config.gateway {
                    let gw = gateway.octets();
                    println!("[DHCP] Gateway: {}.{}.{}.{}", gw[0], gw[1], gw[2], gw[3]);
                }
            }
            None => println!("[DHCP] No DHCP configuration available"),
        }
    }
}
