use serde::Deserialize;

/// Pipeline behavior toggles.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// When false, multipart form-data requests are rejected with 415
    /// before any filter runs.
    pub multipart_enabled: bool,
    /// Log exceptions that were recovered by an error route or handler.
    pub log_handled_exceptions: bool,
    /// Upper bound on status-route re-dispatches for a single response,
    /// guarding against status routes that point at each other.
    pub max_status_redirects: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self { multipart_enabled: true, log_handled_exceptions: true, max_status_redirects: 5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LifecycleConfig::default();
        assert!(config.multipart_enabled);
        assert!(config.log_handled_exceptions);
        assert_eq!(config.max_status_redirects, 5);
    }

    #[test]
    fn partial_deserialization_keeps_defaults() {
        let config: LifecycleConfig = serde_json::from_str(r#"{"multipart_enabled": false}"#).unwrap();
        assert!(!config.multipart_enabled);
        assert!(config.log_handled_exceptions);
        assert_eq!(config.max_status_redirects, 5);
    }
}
