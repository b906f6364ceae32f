/// Tagged console line.
///
/// Forwards to `esp_println::println!` on the firmware build. Host builds
/// still type-check the arguments but print nothing.
#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {{
        #[cfg(feature = "firmware")]
        ::esp_println::println!($($arg)*);
        #[cfg(not(feature = "firmware"))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}
