//! UDP command socket
//!
//! Wraps the embassy-net socket the control loop reads commands from and
//! writes acknowledgements to. Receiving is bounded by a short timeout so the
//! loop keeps ticking when the network is idle.

use crate::BoardError;
use crate::protocol::{ACK_LEN, Ack, MAX_DATAGRAM_LEN};
use embassy_net::udp::{PacketMetadata, RecvError, UdpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_time::{Duration, with_timeout};
use esp_println::println;

/// Socket receive buffer, a few full-size datagrams deep
const RX_BUFFER_SIZE: usize = 4 * MAX_DATAGRAM_LEN;

/// Socket transmit buffer, plenty for queued acknowledgements
const TX_BUFFER_SIZE: usize = 16 * ACK_LEN;

/// Backing storage for the socket; must outlive the [`UdpServer`]
pub struct SocketBuffers {
    rx_meta: [PacketMetadata; 8],
    rx_buffer: [u8; RX_BUFFER_SIZE],
    tx_meta: [PacketMetadata; 16],
    tx_buffer: [u8; TX_BUFFER_SIZE],
}

impl SocketBuffers {
    pub const fn new() -> Self {
        Self {
            rx_meta: [PacketMetadata::EMPTY; 8],
            rx_buffer: [0; RX_BUFFER_SIZE],
            tx_meta: [PacketMetadata::EMPTY; 16],
            tx_buffer: [0; TX_BUFFER_SIZE],
        }
    }
}

impl Default for SocketBuffers {
    fn default() -> Self {
        Self::new()
    }
}

/// UDP server for command datagrams
pub struct UdpServer<'a> {
    socket: UdpSocket<'a>,
    port: u16,
}

impl<'a> UdpServer<'a> {
    /// Create the socket and bind it to `port`
    pub fn bind(
        stack: Stack<'a>,
        buffers: &'a mut SocketBuffers,
        port: u16,
    ) -> Result<Self, BoardError> {
        let mut socket = UdpSocket::new(
            stack,
            &mut buffers.rx_meta,
            &mut buffers.rx_buffer,
            &mut buffers.tx_meta,
            &mut buffers.tx_buffer,
        );

        match socket.bind(port) {
            Ok(_) => {
                println!("[UDP] Listening for commands on port {}", port);
                Ok(Self { socket, port })
            }
            Err(e) => {
                println!("[UDP] Failed to bind to port {}: {:?}", port, e);
                Err(BoardError::UdpError)
            }
        }
    }

    /// Wait up to `timeout` for the next datagram.
    ///
    /// Returns its length in `buffer` and the sender, or `None` when nothing
    /// usable arrived. Oversized datagrams cannot be valid commands and are
    /// dropped here.
    pub async fn poll(
        &mut self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Option<(usize, IpEndpoint)> {
        match with_timeout(timeout, self.socket.recv_from(buffer)).await {
            Ok(Ok((len, meta))) => Some((len, meta.endpoint)),
            Ok(Err(RecvError::Truncated)) => {
                println!("[UDP] Dropping oversized datagram");
                None
            }
            #[allow(unreachable_patterns)]
            Ok(Err(e)) => {
                println!("[UDP] Receive error: {:?}", e);
                None
            }
            Err(_) => None,
        }
    }

    /// Send an acknowledgement to the requester
    pub async fn send_ack(&mut self, ack: &Ack, endpoint: IpEndpoint) {
        if let Err(e) = self.socket.send_to(&ack.to_bytes(), endpoint).await {
            println!("[UDP] Failed to send ack {} to {:?}: {:?}", ack.request_id, endpoint, e);
        }
    }

    /// Get the bound port
    pub fn get_port(&self) -> u16 {
        self.port
    }
}
