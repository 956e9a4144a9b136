// Public modules
pub mod dump;
pub mod history;
pub mod queue;
pub mod sampler;
pub mod sensor;

// Re-export constants commonly used
pub mod constants {
    // Une mesure toutes les 1,5 s
    pub const UPDATE_INTERVAL_MS: u64 = 1500;
    pub const HISTORY_WINDOW_SIZE: usize = 100;
    pub const LOG_INTERVAL_SECS: u64 = 60;
}
