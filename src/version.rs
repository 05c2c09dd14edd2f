// Build-time identity of the vmidle binary.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// "vmidle 0.3.0", used in the `info` header and the startup log.
pub fn banner() -> String {
    format!("{} {}", NAME, VERSION)
}
