//! `<task_summary>` extraction from a finished response.

use regex::Regex;
use std::sync::LazyLock;

static TASK_SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<task_summary>(.*?)</task_summary>").expect("valid task summary regex")
});

/// A response split into the part holding code and the summary annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitResponse {
    pub code: String,
    pub summary: String,
}

/// Pull the first `<task_summary>` block out of `response`.
///
/// Without a summary the code part is the response untouched and the summary
/// is empty.
pub fn split_summary(response: &str) -> SplitResponse {
    let Some(caps) = TASK_SUMMARY_RE.captures(response) else {
        return SplitResponse {
            code: response.to_string(),
            summary: String::new(),
        };
    };
    let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
        return SplitResponse {
            code: response.to_string(),
            summary: String::new(),
        };
    };

    let mut code = String::with_capacity(response.len());
    code.push_str(&response[..whole.start()]);
    code.push_str(&response[whole.end()..]);
    SplitResponse {
        code: code.trim().to_string(),
        summary: inner.as_str().trim().to_string(),
    }
}
