use std::env;
use std::path::Path;

fn main() {
    // Invoked by the linker as its error-handling script
    if env::args().len() > 2 {
        linker_be_nice();
    }

    // Wi-Fi credentials are baked in at compile time
    export_wifi_credentials();

    // Host builds (unit and integration tests) link with the normal toolchain
    let target_arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    if target_arch != "riscv32" {
        return;
    }

    register_linker_script_hint();
    // make sure linkall.x is the last linker script (otherwise might cause problems with flip-link)
    println!("cargo:rustc-link-arg=-Tlinkall.x");
}

/// Read `WIFI_SSID` / `WIFI_PASSWORD` from the environment or a `.env` file
/// and expose them to `env!` in the crate. Environment variables win.
fn export_wifi_credentials() {
    println!("cargo:rerun-if-changed=.env");
    println!("cargo:rerun-if-env-changed=WIFI_SSID");
    println!("cargo:rerun-if-env-changed=WIFI_PASSWORD");

    if Path::new(".env").exists() {
        if let Err(e) = dotenvy::dotenv() {
            println!("cargo:warning=Failed to load .env file: {}", e);
        }
    }

    let ssid = read_trimmed("WIFI_SSID");
    let password = read_trimmed("WIFI_PASSWORD");

    println!("cargo:rustc-env=WIFI_SSID={}", ssid);
    println!("cargo:rustc-env=WIFI_PASSWORD={}", password);

    if ssid.is_empty() {
        println!("cargo:warning=WIFI_SSID is empty - the IR bridge will never join a network");
    }
    if password.is_empty() {
        println!("cargo:warning=WIFI_PASSWORD is empty - assuming an open network");
    }
}

fn read_trimmed(key: &str) -> String {
    env::var(key)
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

fn linker_be_nice() {
    let args: Vec<String> = env::args().collect();
    let kind = &args[1];
    let what = &args[2];

    match kind.as_str() {
        "undefined-symbol" => match what.as_str() {
            "_stack_start" => {
                eprintln!();
                eprintln!("💡 Is the linker script `linkall.x` missing?");
                eprintln!();
            }
            "esp_wifi_preempt_enable"
            | "esp_wifi_preempt_yield_task"
            | "esp_wifi_preempt_task_create" => {
                eprintln!();
                eprintln!("💡 `esp-wifi` has no scheduler enabled. Make sure you have the `builtin-scheduler` feature enabled, or that you provide an external scheduler.");
                eprintln!();
            }
            _ => (),
        },
        // we don't have anything helpful for "missing-lib" yet
        _ => {
            std::process::exit(1);
        }
    }

    std::process::exit(0);
}

fn register_linker_script_hint() {
    if let Ok(exe) = env::current_exe() {
        println!(
            "cargo:rustc-link-arg=--error-handling-script={}",
            exe.display()
        );
    }
}
