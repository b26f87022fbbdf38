fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds (unit tests) link normally; only the firmware image needs the esp-hal script
    if std::env::var_os("CARGO_FEATURE_FIRMWARE").is_some() {
        println!("cargo:rustc-link-arg-bins=-Tlinkall.x");

        // Add ESP-IDF app descriptor metadata
        println!("cargo:rustc-env=ESP_IDF_VERSION=v5.0");
        println!("cargo:rustc-env=IDF_TARGET=esp32c6");
    }
}
