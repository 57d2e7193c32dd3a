/// Frame layout and default settings.

pub const MAX_COLORS: usize = 32; // color slots in a frame
pub const MAX_STEPS: usize = 64; // step slots in a frame
pub const COLOR_WIDTH: usize = 3; // bytes per color
pub const HEADER_FIELDS: usize = 8; // u16 fields before the color block

pub const HEADER_SIZE: usize = HEADER_FIELDS * 2;
pub const COLORS_SIZE: usize = MAX_COLORS * COLOR_WIDTH;
pub const STEPS_SIZE: usize = MAX_STEPS;
pub const COLORS_OFFSET: usize = HEADER_SIZE;
pub const STEPS_OFFSET: usize = COLORS_OFFSET + COLORS_SIZE;
pub const FRAME_SIZE: usize = STEPS_OFFSET + STEPS_SIZE; // 176 bytes on the wire

pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_BIND_PORT: u16 = 3355;
pub const DEFAULT_SCHEDULE_START: (u32, u32) = (18, 0);
pub const DEFAULT_SCHEDULE_END: (u32, u32) = (23, 0);
pub const DEFAULT_TICK_PERIOD_SECONDS: f64 = 30.0;
pub const MAX_TICK_PERIOD_SECONDS: f64 = 86_400.0; // one day
pub const DEFAULT_CONFIG_DIR: &str = "configs";
pub const DEFAULT_OFF_CONFIG: &str = "config_off.json";

pub const ACCEPT_POLL_MS: u64 = 100; // listener sleep between accept polls
pub const BIND_RETRY_INITIAL_MS: u64 = 1000;
pub const BIND_RETRY_MAX_MS: u64 = 30_000;
pub const KEEPALIVE_IDLE_SECS: u64 = 10; // idle time before the first probe
pub const KEEPALIVE_INTERVAL_SECS: u64 = 10; // time between unanswered probes
