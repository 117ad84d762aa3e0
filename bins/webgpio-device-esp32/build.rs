//! Build script for the webgpio ESP32 firmware.

fn main() {
    // Required for esp-idf-svc to find the IDF toolchain.
    embuild::espidf::sysenv::output();
    // Baked-in credentials; NVS values take precedence at runtime.
    println!("cargo:rerun-if-env-changed=WEBGPIO_SSID");
    println!("cargo:rerun-if-env-changed=WEBGPIO_PASSPHRASE");
}
