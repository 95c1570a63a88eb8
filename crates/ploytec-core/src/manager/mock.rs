//! Mock extension manager for testing.

use std::sync::Mutex;

use tracing::debug;

use super::traits::ExtensionManager;

/// One recorded request against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerRequest {
    Activate(String),
    Deactivate(String),
    QueryProperties(String),
}

/// Mock extension manager that records submitted requests. Tests drive the
/// callback side directly through the session controller's callback sink.
pub struct MockExtensionManager {
    requests: Mutex<Vec<ManagerRequest>>,
}

impl MockExtensionManager {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
        }
    }

    /// All recorded requests, in order.
    pub fn requests(&self) -> Vec<ManagerRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn record(&self, request: ManagerRequest) {
        debug!(?request, "mock manager request");
        self.requests.lock().unwrap().push(request);
    }
}

impl Default for MockExtensionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionManager for MockExtensionManager {
    fn activate(&self, identifier: &str) {
        self.record(ManagerRequest::Activate(identifier.to_string()));
    }

    fn deactivate(&self, identifier: &str) {
        self.record(ManagerRequest::Deactivate(identifier.to_string()));
    }

    fn query_properties(&self, identifier: &str) {
        self.record(ManagerRequest::QueryProperties(identifier.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_requests() {
        let mock = MockExtensionManager::new();
        mock.activate("sc.hackerman.ploytecdriver");
        mock.deactivate("sc.hackerman.ploytecdriver");
        mock.query_properties("sc.hackerman.ploytecdriver");

        assert_eq!(
            mock.requests(),
            vec![
                ManagerRequest::Activate("sc.hackerman.ploytecdriver".into()),
                ManagerRequest::Deactivate("sc.hackerman.ploytecdriver".into()),
                ManagerRequest::QueryProperties("sc.hackerman.ploytecdriver".into()),
            ]
        );

        mock.clear_requests();
        assert!(mock.requests().is_empty());
    }
}
