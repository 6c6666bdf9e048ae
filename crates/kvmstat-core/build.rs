//! Build script for kvmstat-core
//!
//! This script checks build requirements before compilation:
//! - Minimum Rust version
//! - Whether the target has a libkvm implementation
//!
//! ## Requirements
//!
//! - **Rust**: 1.70.0 or newer
//! - **FreeBSD**: libkvm (part of the base system)
//! - **Other targets**: build fine, but `KvmHandle` is always invalid

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    // Check minimum Rust version
    if let Ok(rustc_version) = rustc_version::version() {
        let min_rust_version = rustc_version::Version::new(1, 70, 0);

        if rustc_version < min_rust_version {
            panic!(
                "kvmstat-core requires Rust {} or newer, found {}",
                min_rust_version, rustc_version
            );
        }
    } else {
        // If we can't get version (e.g., in some build environments), just warn
        println!("cargo:warning=could not verify Rust version");
    }

    // `cfg(target_os)` in a build script describes the host, so read the target from cargo
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os != "freebsd" {
        println!("cargo:warning=no libkvm on target '{target_os}': kvm handles will always be invalid");
    }
}
