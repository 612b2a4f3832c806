fn main() {
    println!("cargo:rerun-if-env-changed=STAR_PRESET");

    // Host builds (tests, fuzzing) have no ESP-IDF toolchain to describe.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
