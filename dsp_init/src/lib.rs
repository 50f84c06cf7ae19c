mod config;
mod literals;
mod log_config;
mod ratio;
mod sampling;
mod workdir;

pub use config::{initialize_configuration, load_default_configuration, Config, APP_NAME};
pub use literals::*;
pub use log_config::initialize_logger;
pub use ratio::get_split_ratio;
pub use sampling::{get_frame_limits, get_interval, FrameLimits};
pub use workdir::get_working_dir;
