#![no_std]
#![no_main]

use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::rmt::{Rmt, TxChannelCreator};
use esp_hal::rng::Rng;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_println::println;

// WiFi imports
use esp_wifi::wifi;

// Embassy imports
use embassy_net::{Config, Stack, StackResources};
use embassy_time::{Instant, Timer};
use esp_hal_embassy::Executor;
use static_cell::StaticCell;

use scoreboard_ir::config;
use scoreboard_ir::ir_tx::{self, IrBlaster};
use scoreboard_ir::link::{LinkAction, LinkSupervisor};
use scoreboard_ir::protocol::MAX_DATAGRAM_LEN;
use scoreboard_ir::udp_server::{SocketBuffers, UdpServer};
use scoreboard_ir::wifi::WiFiManager;
use scoreboard_ir::{Controller, UpdateTransport};

// Add app descriptor for espflash compatibility
esp_bootloader_esp_idf::esp_app_desc!();

type IrChannel = esp_hal::rmt::Channel<esp_hal::Blocking, 0>;
type BridgeController =
    Controller<IrBlaster<IrChannel>, Output<'static>, Output<'static>, OtaListener>;

static WIFI_INIT_CELL: StaticCell<esp_wifi::EspWifiController<'static>> = StaticCell::new();
static STACK_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
static EXECUTOR: StaticCell<Executor> = StaticCell::new();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    println!("[MAIN] Panic: {}", info);
    loop {}
}

/// OTA endpoint announced while the service window is open.
///
/// Image transfer is handled by the bootloader tooling; the firmware only
/// has to stay responsive and keep the endpoint advertised.
struct OtaListener {
    armed: bool,
    polls: u32,
}

impl OtaListener {
    const fn new() -> Self {
        Self {
            armed: false,
            polls: 0,
        }
    }
}

impl UpdateTransport for OtaListener {
    fn begin(&mut self) {
        self.armed = true;
        println!(
            "[OTA] Listening as {}.local:{}",
            config::OTA_HOSTNAME,
            config::OTA_PORT
        );
    }

    fn poll(&mut self) {
        if !self.armed {
            return;
        }
        self.polls = self.polls.wrapping_add(1);
        if self.polls % 10_000 == 0 {
            println!("[OTA] Waiting for update image");
        }
    }
}

// Embassy task to run the network stack
#[embassy_executor::task]
async fn net_task(
    mut runner: embassy_net::Runner<'static, esp_wifi::wifi::WifiDevice<'static>>,
) -> ! {
    runner.run().await
}

/// The single control loop: link upkeep, one datagram, one controller tick
#[embassy_executor::task]
async fn control_task(
    mut wifi_manager: WiFiManager<'static>,
    stack: Stack<'static>,
    mut controller: BridgeController,
) {
    let mut buffers = SocketBuffers::new();
    let mut server = match UdpServer::bind(stack, &mut buffers, config::UDP_PORT) {
        Ok(server) => server,
        Err(e) => {
            println!("[MAIN] Command socket unavailable: {:?}", e);
            return;
        }
    };

    let mut link = LinkSupervisor::new(Instant::now());
    let mut datagram = [0u8; MAX_DATAGRAM_LEN];

    println!("[MAIN] Control loop running on UDP port {}", server.get_port());

    loop {
        let was_up = link.is_up();
        if let Some(LinkAction::Reconnect) = link.tick(Instant::now(), wifi_manager.is_connected())
        {
            if let Err(e) = wifi_manager.reconnect() {
                println!("[WIFI] Reconnect request failed: {:?}", e);
            }
        }
        if link.is_up() && !was_up {
            wifi_manager.print_dhcp_info();
        }

        if link.is_up() {
            if let Some((len, endpoint)) = server.poll(&mut datagram, config::RECV_POLL).await {
                if let Some(ack) = controller.handle_datagram(&datagram[..len], Instant::now()) {
                    // Acknowledge before any queued IR work runs
                    server.send_ack(&ack, endpoint).await;
                }
            }
        } else {
            Timer::after(config::RECV_POLL).await;
        }

        controller.tick(Instant::now(), link.is_up());
    }
}

#[esp_hal::main]
fn main() -> ! {
    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    println!("[MAIN] Scoreboard IR bridge {}", scoreboard_ir::VERSION);

    // Outputs come up first so the siren is silent from reset
    let siren_level = if config::SIREN_ACTIVE_HIGH {
        Level::Low
    } else {
        Level::High
    };
    let siren_pin = Output::new(peripherals.GPIO5, siren_level, OutputConfig::default());
    let status_led = Output::new(peripherals.GPIO8, Level::Low, OutputConfig::default());

    // Initialize heap allocator for WiFi (72KB)
    esp_alloc::heap_allocator!(size: 72 * 1024);

    // Initialize embassy time system
    let timer_group0 = TimerGroup::new(peripherals.TIMG0);
    esp_hal_embassy::init(timer_group0.timer0);

    // IR LED on RMT channel 0, one tick per microsecond
    let rmt = match Rmt::new(peripherals.RMT, Rate::from_hz(ir_tx::RMT_TICK_HZ)) {
        Ok(rmt) => rmt,
        Err(e) => {
            println!("[IR] Failed to initialize RMT: {:?}", e);
            panic!("RMT initialization failed");
        }
    };
    let ir_channel = match rmt.channel0.configure(peripherals.GPIO4, ir_tx::tx_config()) {
        Ok(channel) => channel,
        Err(e) => {
            println!("[IR] Failed to configure RMT channel: {:?}", e);
            panic!("RMT channel configuration failed");
        }
    };
    println!("[IR] RC5 transmitter ready on GPIO{}", config::IR_LED_PIN);

    let controller = Controller::new(
        IrBlaster::new(ir_channel),
        siren_pin,
        status_led,
        OtaListener::new(),
    );

    // Initialize WiFi driver
    let timer_group1 = TimerGroup::new(peripherals.TIMG1);
    let mut rng = Rng::new(peripherals.RNG);
    let seed = ((rng.random() as u64) << 32) | rng.random() as u64;
    let wifi_init = match esp_wifi::init(timer_group1.timer0, rng, peripherals.RADIO_CLK) {
        Ok(wifi_init) => wifi_init,
        Err(e) => {
            println!("[WIFI] Failed to initialize WiFi driver: {:?}", e);
            panic!("WiFi initialization failed");
        }
    };
    let wifi_init_ref = WIFI_INIT_CELL.init(wifi_init);

    let (wifi_controller, wifi_interfaces) = match wifi::new(wifi_init_ref, peripherals.WIFI) {
        Ok(parts) => parts,
        Err(e) => {
            println!("[WIFI] Failed to create WiFi controller: {:?}", e);
            panic!("WiFi initialization failed");
        }
    };

    // Create embassy-net stack with DHCP configuration
    let stack_resources = STACK_RESOURCES.init(StackResources::new());
    let (stack, runner) = embassy_net::new(
        wifi_interfaces.sta,
        Config::dhcpv4(Default::default()),
        stack_resources,
        seed,
    );

    let mut wifi_manager = WiFiManager::new(wifi_controller, stack);
    // The link supervisor retries, so a failed first attempt is not fatal
    if let Err(e) = wifi_manager.start(config::WIFI_SSID, config::WIFI_PASSWORD) {
        println!("[WIFI] Initial connection request failed: {:?}", e);
    }

    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        println!("[MAIN] Spawning network task...");
        spawner.spawn(net_task(runner)).ok();

        println!("[MAIN] Spawning control task...");
        if let Err(e) = spawner.spawn(control_task(wifi_manager, stack, controller)) {
            println!("[MAIN] Failed to spawn control task: {:?}", e);
        }
    });
}
