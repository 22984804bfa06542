mod logger;
pub mod time_utils;

pub use logger::{LoggerManager, TARGET_STRATEGY, TARGET_TRADE};
pub use time_utils::{now_shanghai_str, utc_to_shanghai, utc_to_shanghai_str};
