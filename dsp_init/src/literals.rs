pub const DSPREP_INTERVAL: &str = "DSPREP_INTERVAL";
pub const DSPREP_MIN_FRAMES: &str = "DSPREP_MIN_FRAMES";
pub const DSPREP_MAX_FRAMES: &str = "DSPREP_MAX_FRAMES";
pub const DSPREP_SPLIT_RATIO: &str = "DSPREP_SPLIT_RATIO";
pub const DSPREP_WORKDIR: &str = "DSPREP_WORKDIR";
