use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_peers: usize,
    pub timeout_secs: u64,
    pub tick_ms: u64,
    pub summary_interval_secs: u64,
}

impl ServerConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn summary_interval(&self) -> Duration {
        Duration::from_secs(self.summary_interval_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_peers: 32,
            timeout_secs: 30,
            tick_ms: 5,
            summary_interval_secs: 30,
        }
    }
}
