//! Remediation messages for resolution failures.
//! Message text is data: templates keyed by failure kind, rendered with
//! `{placeholder}` substitution.

use super::types::FailureKind;
use std::collections::BTreeMap;

pub const CLANG_FORMAT_DIFF_URL: &str =
    "https://raw.githubusercontent.com/llvm/llvm-project/main/clang/tools/clang-format/clang-format-diff.py";

const NOT_FOUND: &str = "\
You didn't have {fallback_script} and/or clang-format available in your computer!
You can download {fallback_script} by running:
    curl --location {download_url} -o {repo_root}/{fallback_script}
You should make sure the downloaded script is not compromised.
You can download clang-format by running:
    brew install clang-format
  Or
    apt install clang-format
  This might work too:
    yum install git-clang-format
Then make sure clang-format is available and executable from $PATH:
    clang-format --version";

const MISSING_DEPENDENCY: &str = "\
To run {tool}, we'll need the library \"{module}\" to be
installed for {interpreter}. You can try either of the following ways to install it:
  1. Manually download {module}: https://pypi.python.org/pypi/{module}
  2. easy_install {module} (if you have easy_install)
  3. pip install {module} (if you have pip)";

const VERSION_MISMATCH: &str = "\
You have {script} for Python 2 but are using a Python 3
interpreter ({interpreter}).
You can download {fallback_script} for Python 3 by running:
    curl --location {download_url} -o {repo_root}/{fallback_script}";

/// Values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct MessageVars {
    values: BTreeMap<&'static str, String>,
}

impl MessageVars {
    pub fn new() -> Self {
        let mut vars = Self::default();
        vars.set("download_url", CLANG_FORMAT_DIFF_URL);
        vars
    }

    pub fn set(&mut self, key: &'static str, value: impl Into<String>) -> &mut Self {
        self.values.insert(key, value.into());
        self
    }
}

/// Failure kind -> message template.
#[derive(Debug, Clone)]
pub struct RemediationCatalog {
    templates: BTreeMap<FailureKind, String>,
}

impl Default for RemediationCatalog {
    fn default() -> Self {
        let templates = FailureKind::ALL
            .iter()
            .map(|&kind| (kind, default_template(kind).to_string()))
            .collect();
        Self { templates }
    }
}

impl RemediationCatalog {
    /// Replace the template for `kind`.
    pub fn with_template(mut self, kind: FailureKind, template: impl Into<String>) -> Self {
        self.templates.insert(kind, template.into());
        self
    }

    pub fn template(&self, kind: FailureKind) -> &str {
        self.templates
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| default_template(kind))
    }

    /// Render the template for `kind` in one pass over the template.
    /// Unknown placeholders are left as-is and substituted values are never
    /// rescanned.
    pub fn render(&self, kind: FailureKind, vars: &MessageVars) -> String {
        let mut rest = self.template(kind);
        let mut out = String::with_capacity(rest.len());
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            let value = tail
                .find('}')
                .and_then(|close| Some((close, vars.values.get(&tail[1..close])?)));
            match value {
                Some((close, value)) => {
                    out.push_str(value);
                    rest = &tail[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn default_template(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::NotFound => NOT_FOUND,
        FailureKind::MissingDependency => MISSING_DEPENDENCY,
        FailureKind::VersionMismatch => VERSION_MISMATCH,
    }
}
