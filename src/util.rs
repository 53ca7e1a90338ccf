//! Internal utilities.

use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt::Write as _;

/// Reports whether this looks like a regular user on a graphical desktop.
///
/// Restarting a system service from such a session makes `PolicyKit` pop up
/// an authentication dialog, which callers want to avoid.
#[must_use]
pub fn running_as_gui_desktop_user() -> bool {
    // SAFETY: `getuid` has no preconditions and cannot fail.
    let uid = unsafe { libc::getuid() };
    uid != 0 && std::env::var_os("DISPLAY").is_some_and(|d| !d.is_empty())
}

/// Returns `len` bytes from the OS random source as lowercase hex.
///
/// # Errors
///
/// Returns the random source error if the OS cannot provide entropy.
pub fn random_hex(len: usize) -> Result<String, rand::Error> {
    let mut bytes = vec![0u8; len];
    OsRng.try_fill_bytes(&mut bytes)?;
    let mut out = String::with_capacity(len * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_hex_length_and_alphabet() {
        let s = random_hex(12).unwrap();
        assert_eq!(s.len(), 24);
        assert!(s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    }

    #[test]
    fn random_hex_differs() {
        assert_ne!(random_hex(12).unwrap(), random_hex(12).unwrap());
    }

    #[test]
    fn root_is_never_desktop_user() {
        // SAFETY: see `running_as_gui_desktop_user`.
        if unsafe { libc::getuid() } == 0 {
            assert!(!running_as_gui_desktop_user());
        }
    }
}
