//! Callback gauges and the registry they are published to.
//!
//! Gauges are sampled at scrape time rather than pushed, so the owner of the value
//! never has to know when the registry is read.

use std::fmt;

use prometheus_client::collector::Collector;
use prometheus_client::encoding::{DescriptorEncoder, EncodeMetric};
use prometheus_client::metrics::gauge::ConstGauge;
use prometheus_client::metrics::MetricType;
use prometheus_client::registry::Registry;

/// Samples the current value of a gauge.
pub type GaugeFn = Box<dyn Fn() -> f64 + Send + Sync>;

/// Describes a gauge: its name, help text and constant labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaugeDesc {
    pub name: String,
    pub help: String,
    pub labels: Vec<(String, String)>,
}

impl GaugeDesc {
    pub fn new(name: &str, help: &str) -> Self {
        GaugeDesc {
            name: name.to_string(),
            help: help.to_string(),
            labels: vec![],
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.push((key.to_string(), value.to_string()));
        self
    }
}

impl fmt::Display for GaugeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.labels.is_empty() {
            return Ok(());
        }
        write!(f, "{{")?;
        for (i, (k, v)) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}=\"{}\"", k, v)?;
        }
        write!(f, "}}")
    }
}

/// Anything gauges can be published to.
pub trait GaugeRegistry {
    fn register_gauge(&mut self, desc: GaugeDesc, f: GaugeFn);
}

struct CallbackGauge {
    desc: GaugeDesc,
    f: GaugeFn,
}

impl fmt::Debug for CallbackGauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackGauge")
            .field("desc", &self.desc)
            .finish()
    }
}

impl Collector for CallbackGauge {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), fmt::Error> {
        let gauge = ConstGauge::new((self.f)());
        let mut metric_encoder =
            encoder.encode_descriptor(&self.desc.name, &self.desc.help, None, MetricType::Gauge)?;
        let family_encoder = metric_encoder.encode_family(&self.desc.labels)?;
        gauge.encode(family_encoder)
    }
}

impl GaugeRegistry for Registry {
    fn register_gauge(&mut self, desc: GaugeDesc, f: GaugeFn) {
        self.register_collector(Box::new(CallbackGauge { desc, f }));
    }
}
