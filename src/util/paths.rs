//! Bundle path helpers.
//!
//! The bundle directory layout consumed at boot:
//!
//! ```text
//! <bundle>/assets/              application assets
//! <bundle>/assets/libapp.so     AOT data blob (AOT mode, optional)
//! <bundle>/assets/kernel_blob.bin  interpreted-code snapshot (debug mode)
//! <bundle>/icudtl.dat           ICU data (system fallback if absent)
//! <bundle>/lib/                 bundled runtime library (system fallback)
//! ```

use std::path::{Path, PathBuf};

/// System fallback location for the ICU data file.
pub const SYSTEM_ICU_DATA_PATH: &str = "/usr/share/tanoak/icudtl.dat";

/// Returns true when `path` exists and is a regular file.
pub fn is_file(path: &Path) -> bool {
    path.is_file()
}

pub fn assets_dir(bundle: &Path) -> PathBuf {
    bundle.join("assets")
}

pub fn aot_blob_path(bundle: &Path) -> PathBuf {
    assets_dir(bundle).join("libapp.so")
}

pub fn kernel_snapshot_path(bundle: &Path) -> PathBuf {
    assets_dir(bundle).join("kernel_blob.bin")
}

/// ICU data: the bundle copy wins, the system copy is the fallback.
/// Returns `None` when neither exists.
pub fn icu_data_path(bundle: &Path) -> Option<PathBuf> {
    let bundled = bundle.join("icudtl.dat");
    if is_file(&bundled) {
        return Some(bundled);
    }
    let system = PathBuf::from(SYSTEM_ICU_DATA_PATH);
    is_file(&system).then_some(system)
}

/// Per-user persistent cache directory, created on demand.
pub fn persistent_cache_dir() -> std::io::Result<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/tmp"));
    let dir = home.join(".tanoak");
    match std::fs::create_dir(&dir) {
        Ok(()) => Ok(dir),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(dir),
        Err(e) => Err(e),
    }
}
