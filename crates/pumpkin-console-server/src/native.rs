//! Dynamic-library backend
//!
//! Binds the C entry points exported by a Pumpkin build compiled as a shared
//! library (`pumpkin_register_logger`, `pumpkin_run_from_config_dir`, ...).
//!
//! The logger entry point takes a bare `extern "C" fn(*const c_char)` with no
//! user-data pointer, so the only way to reach Rust state from it is a
//! process-wide slot. That slot holds exactly one [`LogCallback`]: the sink
//! injected by whichever session registered last.

use std::ffi::{c_char, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use libloading::Library;
use pumpkin_console_core::prelude::*;

use crate::backend::{LogCallback, ServerBackend};

type RawLogCallback = extern "C" fn(*const c_char);

/// Sink reached from [`log_trampoline`]
static LOG_CALLBACK_SLOT: RwLock<Option<LogCallback>> = RwLock::new(None);

/// Exit code when the config directory cannot be passed across the ABI
const EXIT_BAD_CONFIG_DIR: i32 = -2;

/// Function pointers resolved from the library.
///
/// Only valid while the owning [`Library`] is loaded.
struct NativeApi {
    register_logger: unsafe extern "C" fn(RawLogCallback),
    run_from_config_dir: unsafe extern "C" fn(*const c_char) -> i32,
    request_stop: unsafe extern "C" fn(),
    inject_command: unsafe extern "C" fn(*const c_char),
    get_players_json: unsafe extern "C" fn() -> *mut c_char,
    get_metrics_json: unsafe extern "C" fn() -> *mut c_char,
    get_completions_json: unsafe extern "C" fn(*const c_char) -> *mut c_char,
    free_string: unsafe extern "C" fn(*mut c_char),
}

/// A Pumpkin server loaded from a shared library
pub struct NativeLibrary {
    path: PathBuf,
    api: NativeApi,
    // Declared last so it is dropped after `api`
    _library: Library,
}

impl std::fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl NativeLibrary {
    /// Load the library at `path` and resolve every entry point.
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading server library: {}", path.display());

        // SAFETY: loading runs the library's initializers; the path is chosen
        // by the user as a Pumpkin server build.
        let library = unsafe { Library::new(path) }
            .map_err(|e| Error::library_load(path, e.to_string()))?;

        let api = NativeApi {
            register_logger: symbol(&library, "pumpkin_register_logger")?,
            run_from_config_dir: symbol(&library, "pumpkin_run_from_config_dir")?,
            request_stop: symbol(&library, "pumpkin_request_stop")?,
            inject_command: symbol(&library, "pumpkin_inject_command")?,
            get_players_json: symbol(&library, "pumpkin_get_players_json")?,
            get_metrics_json: symbol(&library, "pumpkin_get_metrics_json")?,
            get_completions_json: symbol(&library, "pumpkin_get_completions_json")?,
            free_string: symbol(&library, "pumpkin_free_string")?,
        };

        debug!("Resolved all server entry points");

        Ok(Self {
            path: path.to_path_buf(),
            api,
            _library: library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy a library-owned string and hand it back to the library.
    fn take_string(&self, ptr: *mut c_char) -> Option<String> {
        if ptr.is_null() {
            return None;
        }
        // SAFETY: non-null strings returned by the query entry points are
        // NUL-terminated and stay valid until passed to `pumpkin_free_string`.
        let text = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
        unsafe { (self.api.free_string)(ptr) };
        Some(text)
    }
}

/// Resolve one exported function by name.
fn symbol<T: Copy>(library: &Library, name: &str) -> Result<T> {
    let c_name = format!("{name}\0");
    // SAFETY: `T` is the documented signature of the export; the pointer is
    // only used while `library` is kept alive by `NativeLibrary`.
    unsafe { library.get::<T>(c_name.as_bytes()) }
        .map(|sym| *sym)
        .map_err(|e| {
            error!("Missing symbol {}: {}", name, e);
            Error::missing_symbol(name)
        })
}

/// Replace the process-wide log sink.
pub(crate) fn install_log_callback(callback: Option<LogCallback>) {
    let mut slot = LOG_CALLBACK_SLOT
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    *slot = callback;
}

/// Entry point handed to `pumpkin_register_logger`.
///
/// Runs on whatever thread the server logs from. Panics in the sink are
/// caught here, unwinding into the library would abort the process.
extern "C" fn log_trampoline(line: *const c_char) {
    if line.is_null() {
        return;
    }

    let callback = LOG_CALLBACK_SLOT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    let Some(callback) = callback else {
        return;
    };

    // SAFETY: the library passes a NUL-terminated string valid for this call.
    let text = unsafe { CStr::from_ptr(line) }.to_string_lossy();
    if catch_unwind(AssertUnwindSafe(|| callback(&text))).is_err() {
        error!("Log sink panicked while handling a server line");
    }
}

impl ServerBackend for NativeLibrary {
    fn register_logger(&self, callback: LogCallback) {
        install_log_callback(Some(callback));
        // SAFETY: `log_trampoline` matches the expected callback ABI and is
        // valid for the life of the process.
        unsafe { (self.api.register_logger)(log_trampoline) };
    }

    fn run_from_config_dir(&self, config_dir: &Path) -> i32 {
        let Some(dir) = config_dir.to_str() else {
            error!("Config directory is not valid UTF-8: {}", config_dir.display());
            return EXIT_BAD_CONFIG_DIR;
        };
        let Ok(c_dir) = CString::new(dir) else {
            error!("Config directory contains a NUL byte: {}", dir);
            return EXIT_BAD_CONFIG_DIR;
        };

        info!("Running native server from {}", dir);
        // SAFETY: `c_dir` outlives the call.
        let code = unsafe { (self.api.run_from_config_dir)(c_dir.as_ptr()) };
        info!("Native server returned {}", code);
        code
    }

    fn request_stop(&self) {
        debug!("Requesting native server stop");
        // SAFETY: no arguments; the export tolerates being called before start.
        unsafe { (self.api.request_stop)() };
    }

    fn inject_command(&self, command: &str) {
        let Ok(c_command) = CString::new(command) else {
            warn!("Dropping command containing a NUL byte");
            return;
        };
        // SAFETY: the library copies the command before returning.
        unsafe { (self.api.inject_command)(c_command.as_ptr()) };
    }

    fn players_json(&self) -> Option<String> {
        // SAFETY: the returned string is released in `take_string`.
        let ptr = unsafe { (self.api.get_players_json)() };
        self.take_string(ptr)
    }

    fn metrics_json(&self) -> Option<String> {
        // SAFETY: the returned string is released in `take_string`.
        let ptr = unsafe { (self.api.get_metrics_json)() };
        self.take_string(ptr)
    }

    fn completions_json(&self, input: &str) -> Option<String> {
        let c_input = CString::new(input).ok()?;
        // SAFETY: `c_input` outlives the call; the result is released in
        // `take_string`.
        let ptr = unsafe { (self.api.get_completions_json)(c_input.as_ptr()) };
        self.take_string(ptr)
    }
}
