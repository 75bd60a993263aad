//! This build script copies the MCU linker memory file from `linker/` into
//! a directory where the linker can always find it at build time, as
//! `memory.x`. Only firmware builds need it: the default feature set builds
//! the host-side library (and its tests) which never links for a target.

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn main() {
    if let Some(mcu) = selected_mcu() {
        let linker_file = format!("linker/{}.x", mcu);
        let linker_file_content = std::fs::read(&linker_file)
            .unwrap_or_else(|_| panic!("Cannot read {}", &linker_file));

        // Put `memory.x` in our output directory and ensure it's
        // on the linker search path.
        let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
        File::create(out.join("memory.x"))
            .unwrap()
            .write_all(&linker_file_content).unwrap();
        println!("cargo:rustc-link-search={}", out.display());
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");

        // By default, Cargo will re-run a build script whenever
        // any file in the project changes. By specifying the linker file
        // here, we ensure the build script is only re-run when it changes.
        println!("cargo:rerun-if-changed={}", linker_file);
    }
}

fn selected_mcu() -> Option<&'static str> {
    if env::var_os("CARGO_FEATURE_FIRMWARE").is_none() {
        return None;
    }

    if env::var_os("CARGO_FEATURE_STM32F411CE").is_some() {
        return Some("stm32f411ce");
    }

    panic!("No board selected. Use cargo --features=blackpill");
}
