/// Constants used throughout the lazyclean codebase
// Environment variable names
pub const IDLE_TIMEOUT_ENV_VAR: &str = "LAZYCLEAN_IDLE_TIMEOUT_MS";
pub const WORKER_NAME_ENV_VAR: &str = "LAZYCLEAN_WORKER_NAME";
pub const LOG_ENV_VAR: &str = "LAZYCLEAN_LOG";

// Worker defaults
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_WORKER_NAME: &str = "lazyclean-cleaner";

// Spooled buffers
pub const DEFAULT_SPOOL_THRESHOLD: usize = 64 * 1024;
pub const SPOOL_FILE_PREFIX: &str = "lazyclean-spool-";

// Shared timer
pub const TIMER_THREAD_NAME: &str = "lazyclean-timer";
