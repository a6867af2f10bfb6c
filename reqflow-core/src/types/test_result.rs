use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestResultStatus {
    Success,
    Failed,
    Error,
    Skipped,
}

impl TestResultStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, TestResultStatus::Failed | TestResultStatus::Error)
    }
}

impl fmt::Display for TestResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestResultStatus::Success => "SUCCESS",
            TestResultStatus::Failed => "FAILED",
            TestResultStatus::Error => "ERROR",
            TestResultStatus::Skipped => "SKIPPED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TestResult {
    pub status: TestResultStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self::with_status(TestResultStatus::Success, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::with_status(TestResultStatus::Failed, message)
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self::with_status(TestResultStatus::Skipped, message)
    }

    pub fn error(message: impl Into<String>, error: &dyn std::error::Error) -> Self {
        Self {
            status: TestResultStatus::Error,
            message: message.into(),
            error: Some(error.to_string()),
        }
    }

    fn with_status(status: TestResultStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error: None,
        }
    }
}
