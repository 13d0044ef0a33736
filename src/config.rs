use crate::error::ConfigError;
use std::time::Duration;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 试卷 TOML 文件存放目录
    pub exam_folder: String,
    /// 文档存储快照文件
    pub snapshot_path: String,
    /// 同时处理的试卷数量
    pub max_concurrent_exams: usize,
    /// 单次存储调用超时（毫秒）
    pub store_timeout_ms: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 试卷文件未指定作者时使用的操作人
    pub default_actor: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exam_folder: "exam_sheets".to_string(),
            snapshot_path: "question_store.json".to_string(),
            max_concurrent_exams: 4,
            store_timeout_ms: 5_000,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            default_actor: "admin".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            exam_folder: std::env::var("EXAM_FOLDER").unwrap_or(default.exam_folder),
            snapshot_path: std::env::var("SNAPSHOT_PATH").unwrap_or(default.snapshot_path),
            max_concurrent_exams: std::env::var("MAX_CONCURRENT_EXAMS").ok().and_then(|v| v.parse().ok()).filter(|v| *v > 0).unwrap_or(default.max_concurrent_exams),
            store_timeout_ms: std::env::var("STORE_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.store_timeout_ms),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            default_actor: std::env::var("DEFAULT_ACTOR").unwrap_or(default.default_actor),
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// 检查配置是否可用于运行
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exam_folder.trim().is_empty() {
            return Err(invalid("exam_folder", "目录不能为空"));
        }
        if self.snapshot_path.trim().is_empty() {
            return Err(invalid("snapshot_path", "快照路径不能为空"));
        }
        if self.max_concurrent_exams == 0 {
            return Err(invalid("max_concurrent_exams", "并发数必须大于 0"));
        }
        if self.store_timeout_ms == 0 {
            return Err(invalid("store_timeout_ms", "超时必须大于 0"));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = Config {
            store_timeout_ms: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { name: "store_timeout_ms", .. })
        ));
    }

    #[test]
    fn blank_snapshot_path_is_rejected() {
        let config = Config {
            snapshot_path: "  ".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { name: "snapshot_path", .. })
        ));
    }
}
