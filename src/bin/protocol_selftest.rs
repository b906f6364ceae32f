//! 协议功能自检程序
//!
//! 在板子上用模拟时钟重放协议测试向量：应答格式、去重、宏展开、警报时序和 OTA 窗口。
//! 输出使用内存中的记录器，不驱动真实的 IR LED 或警报器。

#![no_std]
#![no_main]

use core::convert::Infallible;

use embassy_time::Instant;
use embedded_hal::digital::{ErrorType, OutputPin};
use esp_hal::clock::CpuClock;
use esp_println::println;
use heapless::Vec;
use scoreboard_ir::protocol::Ack;
use scoreboard_ir::{BoardError, Controller, IrTransmitter, Rc5Frame, UpdateTransport};

// Add app descriptor for espflash compatibility
esp_bootloader_esp_idf::esp_app_desc!();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    println!("❌ 自检失败: {}", info);
    loop {}
}

/// 记录发送的 RC5 码
struct RecordingIr {
    sent: Vec<Rc5Frame, 32>,
}

impl IrTransmitter for RecordingIr {
    fn transmit(&mut self, frame: Rc5Frame) -> Result<(), BoardError> {
        self.sent.push(frame).map_err(|_| BoardError::IrError)
    }
}

/// 记录电平的输出引脚
struct LevelPin {
    high: bool,
}

impl ErrorType for LevelPin {
    type Error = Infallible;
}

impl OutputPin for LevelPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}

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

fn new_controller() -> TestController {
    Controller::new(
        RecordingIr { sent: Vec::new() },
        LevelPin { high: true },
        LevelPin { high: true },
        CountingOta { begun: 0, polls: 0 },
    )
}

fn at(ms: u64) -> Instant {
    Instant::from_millis(ms)
}

fn run_until(controller: &mut TestController, from: u64, to: u64) {
    for ms in from..=to {
        controller.tick(at(ms), true);
    }
}

#[esp_hal::main]
fn main() -> ! {
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let _peripherals = esp_hal::init(config);

    println!("=== 协议功能自检 ===");

    // 1. 单键按下与应答
    println!("\n1. 测试单键按下与应答");
    let mut controller = new_controller();
    let ack = controller.handle_datagram(&[0xA5, 0x01, 0x01, 0x05, 0x00, 0x00], at(0));
    assert_eq!(
        ack.map(|ack| ack.to_bytes()),
        Some([0xA5, 0x01, 0x7F, 0x05, 0x00, 0x01, 0x00])
    );
    // 应答先于红外发送
    assert!(controller.ir().sent.is_empty());
    assert_eq!(controller.pending_actions(), 1);
    println!("✅ 按键命令被接受，应答正确");

    // 2. 重复请求只应答不执行
    println!("\n2. 测试去重");
    let again = controller.handle_datagram(&[0xA5, 0x01, 0x01, 0x05, 0x00, 0x00], at(1));
    assert_eq!(again, Some(Ack::new(5, true.into())));
    assert_eq!(controller.pending_actions(), 1);
    controller.tick(at(2), true);
    assert_eq!(controller.ir().sent.len(), 1);
    println!("✅ 重复请求只重发应答，按键只发送一次");

    // 3. 模式切换宏：三次按键，翻转位交替
    println!("\n3. 测试模式切换宏");
    let mut controller = new_controller();
    let ack = controller.handle_datagram(&[0xA5, 0x01, 0x40, 0x06, 0x00, 0x00], at(0));
    assert!(ack.is_some_and(|ack| ack.is_accepted()));
    run_until(&mut controller, 1, 800);
    let sent = &controller.ir().sent;
    assert_eq!(sent.len(), 3);
    assert_ne!(sent[0].code & 0x800, sent[1].code & 0x800);
    assert_ne!(sent[1].code & 0x800, sent[2].code & 0x800);
    println!("✅ 宏展开为三次按键，翻转位交替");

    // 4. 警报程序时序
    println!("\n4. 测试警报时序");
    let mut controller = new_controller();
    let ack = controller.handle_datagram(
        &[
            0xA5, 0x01, 0x60, 0x07, 0x00, 0x03, 0x01, 0x64, 0x00, 0x32, 0x00,
        ],
        at(0),
    );
    assert_eq!(
        ack.map(|ack| ack.to_bytes()),
        Some([0xA5, 0x01, 0x7F, 0x07, 0x00, 0x00, 0x00])
    );
    assert!(!controller.siren_active());

    let ack = controller.handle_datagram(
        &[
            0xA5, 0x01, 0x60, 0x08, 0x00, 0x05, 0x01, 0x64, 0x00, 0x32, 0x00,
        ],
        at(0),
    );
    assert!(ack.is_some_and(|ack| ack.is_accepted()));
    assert!(controller.siren_pin().high);
    run_until(&mut controller, 1, 99);
    assert!(controller.siren_pin().high);
    controller.tick(at(100), true);
    assert!(!controller.siren_pin().high);
    run_until(&mut controller, 101, 150);
    assert!(!controller.siren_active());
    println!("✅ 警报按时开启并关闭，非法程序被拒绝");

    // 5. OTA 窗口
    println!("\n5. 测试 OTA 窗口");
    let mut controller = new_controller();
    let ack = controller.handle_datagram(&[0xA5, 0x01, 0x70, 0x09, 0x00, 0x00], at(0));
    assert!(ack.is_some_and(|ack| ack.is_accepted()));
    assert_eq!(controller.update_transport().begun, 1);
    let ack = controller.handle_datagram(&[0xA5, 0x01, 0x01, 0x0A, 0x00, 0x00], at(10));
    assert!(ack.is_some_and(|ack| !ack.is_accepted()));
    controller.tick(at(11), true);
    assert!(controller.update_transport().polls > 0);
    println!("✅ OTA 窗口内仅接受 OTA 命令");

    println!("\n=== 所有自检通过 ===");

    loop {
        core::hint::spin_loop();
    }
}
