//! Best-effort extraction of user parameters from tool code.
//!
//! Tool bundles may declare user-configurable parameters as fields of a
//! `UserParameters` configuration class. Extraction is a static,
//! best-effort scan: callers degrade a failed scan to an empty parameter
//! list and an `is_valid = false` flag, never a fatal error. The scanner
//! is a trait so a different declaration surface can be plugged in.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// A user-configurable parameter declared by a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserParameter {
    /// Field name.
    pub name: String,
    /// Declared type annotation, if any.
    pub type_hint: Option<String>,
}

/// Errors from scanning tool code for parameter declarations.
#[derive(Debug, Error)]
pub enum ParamScanError {
    /// A line inside the configuration block is not a field declaration.
    #[error("malformed declaration on line {line}: {text}")]
    MalformedField {
        /// 1-based line number in the scanned code.
        line: usize,
        /// Trimmed line content.
        text: String,
    },
}

/// A pluggable scanner for user-parameter declarations.
pub trait ParamScanner: Send + Sync {
    /// Scan tool code for declared parameters.
    ///
    /// # Errors
    ///
    /// Returns an error when a declaration block is present but cannot be
    /// parsed; callers treat this as a degraded (not failed) read.
    fn scan(&self, code: &str) -> Result<Vec<UserParameter>, ParamScanError>;
}

static CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^class\s+UserParameters\b").expect("valid regex"));
static FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+(\w+)\s*:\s*([^=#]+?)\s*(?:=.*)?$").expect("valid regex"));

/// Scanner for `class UserParameters` configuration blocks.
///
/// Recognizes simple `name: type` field declarations (optionally with a
/// default) on the lines indented under the class header. Anything else
/// inside the block is malformed; code without the block declares no
/// parameters.
#[derive(Debug, Default)]
pub struct ConfigClassScanner;

impl ParamScanner for ConfigClassScanner {
    fn scan(&self, code: &str) -> Result<Vec<UserParameter>, ParamScanError> {
        let mut params = Vec::new();
        let mut in_block = false;

        for (idx, line) in code.lines().enumerate() {
            if CLASS_RE.is_match(line) {
                in_block = true;
                continue;
            }
            if !in_block {
                continue;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            // Dedent ends the block.
            if !line.starts_with(|c: char| c.is_whitespace()) {
                in_block = false;
                continue;
            }
            if trimmed == "pass" || trimmed.starts_with("\"\"\"") {
                continue;
            }

            if let Some(caps) = FIELD_RE.captures(line) {
                let type_hint = caps[2].trim().to_string();
                params.push(UserParameter {
                    name: caps[1].to_string(),
                    type_hint: (!type_hint.is_empty()).then_some(type_hint),
                });
            } else {
                return Err(ParamScanError::MalformedField {
                    line: idx + 1,
                    text: trimmed.to_string(),
                });
            }
        }

        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigClassScanner, ParamScanError, ParamScanner};

    #[test]
    fn test_extracts_declared_fields() {
        let code = "\
from pydantic import BaseModel


class UserParameters(BaseModel):
    api_key: str
    region: Optional[str] = \"us-east-1\"
    # internal knob
    retries: int = 3


def run_tool(config, args):
    return None
";
        let params = ConfigClassScanner.scan(code).expect("scan should succeed");
        let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["api_key", "region", "retries"]);
        assert_eq!(params[0].type_hint.as_deref(), Some("str"));
        assert_eq!(params[1].type_hint.as_deref(), Some("Optional[str]"));
    }

    #[test]
    fn test_no_block_means_no_parameters() {
        let code = "def run_tool(args):\n    return 42\n";
        let params = ConfigClassScanner.scan(code).expect("scan should succeed");
        assert!(params.is_empty());
    }

    #[test]
    fn test_empty_block_is_valid() {
        let code = "class UserParameters(BaseModel):\n    pass\n";
        let params = ConfigClassScanner.scan(code).expect("scan should succeed");
        assert!(params.is_empty());
    }

    #[test]
    fn test_malformed_block_is_an_error() {
        let code = "\
class UserParameters(BaseModel):
    api_key: str
    def not_a_field(self):
";
        let result = ConfigClassScanner.scan(code);
        assert!(matches!(
            result,
            Err(ParamScanError::MalformedField { line: 3, .. })
        ));
    }

    #[test]
    fn test_code_after_dedent_is_not_scanned() {
        let code = "\
class UserParameters(BaseModel):
    api_key: str

class Other:
    unrelated = compute()
";
        // `unrelated = compute()` sits in a different class and must not
        // trip the scanner.
        let params = ConfigClassScanner.scan(code).expect("scan should succeed");
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "api_key");
    }
}
