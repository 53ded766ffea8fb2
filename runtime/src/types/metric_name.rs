use std::cmp::Ordering;
use std::fmt;
use std::fmt::Display;

use enquote::enquote;
use serde::{Deserialize, Serialize};

use promql_common::encoding::{marshal_string, unmarshal_string};

use crate::runtime_error::{RuntimeError, RuntimeResult};

pub const METRIC_NAME_LABEL: &str = "__name__";

/// Tag represents a (key, value) tag for metric.
#[derive(Debug, Default, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new<S: Into<String>>(key: S, value: S) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn marshal(&self, buf: &mut Vec<u8>) {
        marshal_string(buf, &self.key);
        marshal_string(buf, &self.value);
    }

    fn unmarshal(src: &[u8]) -> RuntimeResult<(Tag, &[u8])> {
        let (key, src) = read_string(src, "tag key")?;
        let (value, src) = read_string(src, "tag value")?;
        Ok((Tag { key, value }, src))
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.value.cmp(&other.value))
    }
}

/// MetricName is the identity of a series: a metric group plus a set of tags.
#[derive(Debug, PartialEq, Eq, Clone, Default, Hash, Serialize, Deserialize)]
pub struct MetricName {
    pub metric_group: String,
    pub tags: Vec<Tag>,
}

impl MetricName {
    pub fn new(name: &str) -> Self {
        MetricName {
            metric_group: name.to_string(),
            tags: vec![],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.metric_group.is_empty() && self.tags.is_empty()
    }

    /// from_strings creates a metric name from pairs of strings.
    pub fn from_strings(ss: &[&str]) -> RuntimeResult<Self> {
        if ss.len() % 2 != 0 {
            return Err(RuntimeError::from("invalid number of strings"));
        }

        let mut res = MetricName::default();
        for pair in ss.chunks_exact(2) {
            res.set_tag(pair[0], pair[1]);
        }

        Ok(res)
    }

    pub fn reset_metric_group(&mut self) {
        self.metric_group.clear();
    }

    pub fn set_metric_group(&mut self, value: &str) {
        self.metric_group = value.to_string();
    }

    /// add_tag adds new tag to mn with the given key and value.
    pub fn add_tag(&mut self, key: &str, value: &str) {
        if key == METRIC_NAME_LABEL {
            self.metric_group = value.into();
            return;
        }
        self.upsert(key, value);
    }

    fn upsert(&mut self, key: &str, value: &str) {
        match self.tags.binary_search_by_key(&key, |tag| &tag.key) {
            Ok(idx) => {
                let tag = &mut self.tags[idx];
                tag.value.clear();
                tag.value.push_str(value);
            }
            Err(idx) => {
                let tag = Tag {
                    key: key.to_string(),
                    value: value.to_string(),
                };
                self.tags.insert(idx, tag);
            }
        }
    }

    /// sets tag with the given key and value, replacing any previous value.
    pub fn set_tag(&mut self, key: &str, value: &str) {
        if key == METRIC_NAME_LABEL {
            self.metric_group = value.into();
        } else {
            self.upsert(key, value);
        }
    }

    /// removes a tag with the given key
    pub fn remove_tag(&mut self, key: &str) {
        if key == METRIC_NAME_LABEL {
            self.reset_metric_group();
        } else {
            self.tags.retain(|x| x.key != key);
        }
    }

    /// returns tag value for the given key.
    pub fn tag_value(&self, key: &str) -> Option<&String> {
        if key == METRIC_NAME_LABEL {
            return Some(&self.metric_group);
        }
        self.tags.iter().find(|x| x.key == key).map(|x| &x.value)
    }

    pub fn sort_tags(&mut self) {
        if self.tags.len() > 1 {
            self.tags.sort();
        }
    }

    /// Appends the canonical identity of mn to dst: the metric group followed by every
    /// tag in key order. Tags are sorted in place first, so equal identities always
    /// produce equal bytes regardless of the order tags were added in.
    pub fn marshal_sorted(&mut self, dst: &mut Vec<u8>) {
        self.sort_tags();
        let required_size = self
            .tags
            .iter()
            .fold(self.metric_group.len() + 2, |acc, tag| {
                acc + tag.key.len() + tag.value.len() + 4
            });
        dst.reserve(required_size);
        marshal_string(dst, &self.metric_group);
        for tag in self.tags.iter() {
            tag.marshal(dst);
        }
    }

    /// Reverses [`MetricName::marshal_sorted`].
    pub fn unmarshal(src: &[u8]) -> RuntimeResult<MetricName> {
        let (metric_group, mut src) = read_string(src, "metric group")?;
        let mut mn = MetricName::new(&metric_group);
        while !src.is_empty() {
            let (tag, tail) = Tag::unmarshal(src)?;
            mn.tags.push(tag);
            src = tail;
        }
        Ok(mn)
    }

    /// Renders the tags as `{k1="v1", k2="v2"}`.
    pub fn tags_string(&self) -> String {
        let mut res = String::with_capacity(2 + self.tags.len() * 16);
        res.push('{');
        for (i, Tag { key: k, value: v }) in self.tags.iter().enumerate() {
            if i > 0 {
                res.push_str(", ");
            }
            res.push_str(k);
            res.push('=');
            res.push_str(&enquote('"', v));
        }
        res.push('}');
        res
    }
}

fn read_string<'a>(src: &'a [u8], what: &str) -> RuntimeResult<(String, &'a [u8])> {
    unmarshal_string(src).map_err(|e| {
        RuntimeError::SerializationError(format!("error reading {}: {}", what, e))
    })
}

impl Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{{", self.metric_group)?;
        for (i, Tag { key: k, value: v }) in self.tags.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}={}", k, enquote('"', v))?;
        }
        write!(f, "}}")
    }
}

impl PartialOrd for MetricName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.metric_group != other.metric_group {
            return Some(self.metric_group.cmp(&other.metric_group));
        }
        // Tags must be already sorted by the caller, so just compare them.
        for (a, b) in self.tags.iter().zip(&other.tags) {
            let ord = a.cmp(b);
            if ord != Ordering::Equal {
                return Some(ord);
            }
        }

        Some(self.tags.len().cmp(&other.tags.len()))
    }
}
