//! 时间工具
//!
//! 通知、API 输出与日志统一使用上海时间 (UTC+8)

use chrono::{DateTime, Utc};
use chrono_tz::{Asia::Shanghai, Tz};

/// 展示用时间格式
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn utc_to_shanghai(utc_time: DateTime<Utc>) -> DateTime<Tz> {
    utc_time.with_timezone(&Shanghai)
}

/// UTC 时间转为上海时间字符串 (YYYY-MM-DD HH:MM:SS)
pub fn utc_to_shanghai_str(utc_time: DateTime<Utc>) -> String {
    utc_to_shanghai(utc_time).format(DISPLAY_FORMAT).to_string()
}

pub fn now_shanghai_str() -> String {
    utc_to_shanghai_str(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_utc_to_shanghai_crosses_midnight() {
        let utc_time = Utc.with_ymd_and_hms(2024, 1, 1, 20, 30, 0).unwrap();

        assert_eq!(utc_to_shanghai(utc_time).hour(), 4);
        assert_eq!(utc_to_shanghai_str(utc_time), "2024-01-02 04:30:00");
    }

    #[test]
    fn test_now_shanghai_str_format() {
        let now = now_shanghai_str();
        assert_eq!(now.len(), 19);
        assert!(chrono::NaiveDateTime::parse_from_str(&now, DISPLAY_FORMAT).is_ok());
    }
}
