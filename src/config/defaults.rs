use super::*;

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/vigil/vigil.log".to_string(),
            backup_count: 7,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://owner-api.teslamotors.com".to_string(),
            access_token: String::new(),
            request_timeout_secs: 30,
            max_retries: 3,
            retry_delay_secs: 5,
            wake_timeout_secs: 90,
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:9341".to_string(),
            queue_capacity: 16,
            send_timeout_ms: 500,
        }
    }
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            directory: "/tmp/vigil".to_string(),
            prefix: "vigil".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            api: ApiConfig::default(),
            command: CommandConfig::default(),
            records: RecordsConfig::default(),
            intervals: BTreeMap::new(),
            backoff_base_secs: 6,
        }
    }
}
