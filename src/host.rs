//! Host system queries.

use nix::sys::utsname::uname;

/// Machine hardware name of the running kernel, as `uname -m` prints it
/// (e.g. `x86_64`, `aarch64`).
///
/// Falls back to the architecture this binary was compiled for if `uname(2)`
/// fails.
pub fn machine_arch() -> String {
    match uname() {
        Ok(uts) => uts.machine().to_string_lossy().into_owned(),
        Err(e) => {
            tracing::warn!("uname failed ({}), assuming {}", e, std::env::consts::ARCH);
            std::env::consts::ARCH.to_string()
        }
    }
}
