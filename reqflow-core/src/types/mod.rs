mod env;
mod metadata;
mod request;
mod response;
mod test_result;

pub use env::{EnvKey, ENVIRONMENT_NONE};
pub use metadata::{DisableSpec, LoopSpec, Metadata, Symbol};
pub use request::{HttpRequest, Protocol};
pub use response::HttpResponse;
pub use test_result::{TestResult, TestResultStatus};

/// Resolved variables visible to one execution.
pub type Variables = std::collections::BTreeMap<String, serde_json::Value>;
