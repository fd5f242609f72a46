//! The `/etc/passwd`-style uid→name lookup used by `--user` output.
//!
//! Built once, before the worker pool starts, by walking the whole password database with
//! `getpwent(3)`; read-only for the rest of the run, so no locking is needed once it is handed
//! to the collector.
use std::collections::HashMap;
use std::ffi::CStr;

/// A snapshot of the system's uid→name mapping, resolved once up front.
#[derive(Debug, Clone, Default)]
pub struct UserNames {
    names: HashMap<u32, String>,
}

impl UserNames {
    /// Scans the whole password database once via `getpwent(3)`. Safe to call from a single
    /// thread only (the underlying C API keeps process-global iteration state); call this
    /// before spawning the worker pool, never from inside it.
    #[must_use]
    pub fn load() -> Self {
        let mut names = HashMap::new();

        // SAFETY: setpwent/getpwent/endpwent form a single-threaded scan of the password
        // database; each `getpwent` call returns a pointer valid only until the next call or
        // `endpwent`, so the name is copied out immediately.
        unsafe {
            libc::setpwent();
            loop {
                let entry = libc::getpwent();
                let Some(entry) = entry.as_ref() else {
                    break;
                };
                if entry.pw_name.is_null() {
                    continue;
                }
                let name = CStr::from_ptr(entry.pw_name).to_string_lossy().into_owned();
                names.insert(entry.pw_uid, name);
            }
            libc::endpwent();
        }

        Self { names }
    }

    /// Returns the cached name for `uid`, or its decimal string form when unresolved.
    #[must_use]
    pub fn name_of(&self, uid: u32) -> String {
        self.names
            .get(&uid)
            .cloned()
            .unwrap_or_else(|| uid.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_root_or_falls_back_to_numeric() {
        let users = UserNames::load();
        // uid 0 is root on every POSIX system this tool targets; if the sandbox running the
        // test has no /etc/passwd (unlikely) this still exercises the numeric fallback path.
        let name = users.name_of(0);
        assert!(name == "root" || name == "0");
    }

    #[test]
    fn unknown_uid_falls_back_to_numeric_string() {
        let users = UserNames::load();
        assert_eq!(users.name_of(u32::MAX), u32::MAX.to_string());
    }
}
