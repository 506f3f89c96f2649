use axum::body::Body;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// One inbound upload, as delivered by the HTTP layer.
///
/// The orchestrator consumes it; nothing retains it past verdict assembly.
pub struct UploadRequest {
    /// Raw request path, e.g. `/holiday.jpg`
    pub path: String,
    /// `Content-Length` as declared by the client, `None` when absent or unparsable
    pub declared_length: Option<u64>,
    pub content_type: Option<String>,
    pub body: Body,
}

impl std::fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadRequest")
            .field("path", &self.path)
            .field("declared_length", &self.declared_length)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub test_name: &'static str,
    pub passed: bool,
}

/// Heuristic outcomes in evaluation order.
///
/// Serializes as a JSON object whose keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestResults(Vec<TestResult>);

impl TestResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, test_name: &'static str, passed: bool) {
        self.0.push(TestResult { test_name, passed });
    }

    pub fn get(&self, test_name: &str) -> Option<bool> {
        self.0
            .iter()
            .find(|r| r.test_name == test_name)
            .map(|r| r.passed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestResult> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for TestResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for result in &self.0 {
            map.serialize_entry(result.test_name, &result.passed)?;
        }
        map.end()
    }
}

/// Response body of the analysis endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Verdict {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "TestResults::is_empty")]
    pub tests: TestResults,
}

impl Verdict {
    /// The failure state: `{"is_valid": false}`
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Failure after the name was accepted; the name is still echoed.
    pub fn invalid_named(name: String) -> Self {
        Self {
            is_valid: false,
            name: Some(name),
            tests: TestResults::new(),
        }
    }

    pub fn valid(name: String, tests: TestResults) -> Self {
        Self {
            is_valid: true,
            name: Some(name),
            tests,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_verdict_serializes_without_optional_keys() {
        let json = serde_json::to_string(&Verdict::invalid()).unwrap();
        assert_eq!(json, r#"{"is_valid":false}"#);
    }

    #[test]
    fn test_tests_keep_insertion_order() {
        let mut tests = TestResults::new();
        tests.push("creator_tool_is_photoshop", false);
        tests.push("create_modify_mismatch", true);

        let json = serde_json::to_string(&Verdict::valid("a.jpg".to_string(), tests)).unwrap();
        assert_eq!(
            json,
            r#"{"is_valid":true,"name":"a.jpg","tests":{"creator_tool_is_photoshop":false,"create_modify_mismatch":true}}"#
        );
    }

    #[test]
    fn test_named_failure_keeps_name() {
        let json = serde_json::to_string(&Verdict::invalid_named("x.png".to_string())).unwrap();
        assert_eq!(json, r#"{"is_valid":false,"name":"x.png"}"#);
    }
}
