pub(super) const LOG_LINE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
pub(super) const LOG_LINE_PATTERN_COLORED: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{h({l})}] {t} - {m}{n}";

pub(super) const LOG_ARCHIVE_SUFFIX: &str = ".{}.gz";
pub(super) const LOG_FILE_BASE_ROLLS: u32 = 1;
pub(super) const LOG_FILE_MAX_ROLLS: u32 = 8;
pub(super) const LOG_FILE_MAX_SIZE: u64 = 32 * 1024 * 1024;
