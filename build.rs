fn main() {
    // ESP-IDF environment only exists for device builds; host builds
    // (tests, simulation) skip it entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
