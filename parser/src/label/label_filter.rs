use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parser::{escape_ident, quote, ParseError};

pub const NAME_LABEL: &str = "__name__";

/// How a [`LabelFilter`] compares a label against its value.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelFilterOp {
    #[default]
    Equal,
    NotEqual,
    RegexEqual,
    RegexNotEqual,
}

impl LabelFilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelFilterOp::Equal => "=",
            LabelFilterOp::NotEqual => "!=",
            LabelFilterOp::RegexEqual => "=~",
            LabelFilterOp::RegexNotEqual => "!~",
        }
    }
}

impl fmt::Display for LabelFilterOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One matcher of a series selector, e.g. `job="api"` or `path=~"/v1/.+"`.
///
/// Regex values are kept as written and never compiled here.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelFilter {
    pub op: LabelFilterOp,
    pub label: String,
    /// unquoted
    pub value: String,
}

impl LabelFilter {
    pub fn new(op: LabelFilterOp, label: &str, value: &str) -> Result<Self, ParseError> {
        if label.is_empty() {
            return Err(ParseError::InvalidSelector(
                "label filter requires a label name".to_string(),
            ));
        }
        Ok(LabelFilter {
            op,
            label: label.to_string(),
            value: value.to_string(),
        })
    }

    pub fn equal(label: &str, value: &str) -> Result<Self, ParseError> {
        LabelFilter::new(LabelFilterOp::Equal, label, value)
    }

    pub fn regex_equal(label: &str, value: &str) -> Result<Self, ParseError> {
        LabelFilter::new(LabelFilterOp::RegexEqual, label, value)
    }

    /// True for `__name__="..."`, the filter a bare metric name stands for.
    pub fn is_metric_name_filter(&self) -> bool {
        self.op == LabelFilterOp::Equal && self.label == NAME_LABEL
    }
}

impl fmt::Display for LabelFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}{}", escape_ident(&self.label), self.op, quote(&self.value))
    }
}
