use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 镜像源定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mirror {
    pub name: String, // 例如: "Aliyun"
    pub url: String,  // 例如: "https://mirrors.aliyun.com/pypi/simple"
}

impl Mirror {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    /// `{base_url}/{package}/`, without doubling the slash when the base URL already ends in one.
    pub fn package_url(&self, package: &str) -> String {
        format!("{}/{}/", self.url.trim_end_matches('/'), package)
    }
}

/// 单次测速的结果
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Success {
        kb_per_sec: f64,
        bytes: usize,
        elapsed: Duration,
    },
    /// Non-200 status, timeout, connection or read error.
    Failed,
}

/// One probe against one (mirror, package) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub mirror: String,
    pub outcome: ProbeOutcome,
}

impl Sample {
    pub fn success(mirror: &str, kb_per_sec: f64, bytes: usize, elapsed: Duration) -> Self {
        Self {
            mirror: mirror.to_string(),
            outcome: ProbeOutcome::Success {
                kb_per_sec,
                bytes,
                elapsed,
            },
        }
    }

    pub fn failed(mirror: &str) -> Self {
        Self {
            mirror: mirror.to_string(),
            outcome: ProbeOutcome::Failed,
        }
    }

    /// Usable throughput, if any. A 200 with an empty body counts as no measurement.
    pub fn speed(&self) -> Option<f64> {
        match self.outcome {
            ProbeOutcome::Success { kb_per_sec, .. } if kb_per_sec > 0.0 => Some(kb_per_sec),
            _ => None,
        }
    }
}

/// Successful throughput values (KB/s) for one mirror.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorSamples {
    pub mirror: Mirror,
    pub speeds: Vec<f64>,
}

/// 测速结果集: 只包含至少成功过一次的镜像源, 按配置顺序排列
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    entries: Vec<MirrorSamples>,
    failed: usize,
}

impl ResultSet {
    /// Builds a result set from per-mirror speeds, dropping mirrors without any sample.
    /// Entry order is the order of `entries`.
    pub fn from_entries(entries: impl IntoIterator<Item = MirrorSamples>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .filter(|e| !e.speeds.is_empty())
                .collect(),
            failed: 0,
        }
    }

    /// Record how many probes produced no usable sample.
    pub fn with_failed(mut self, failed: usize) -> Self {
        self.failed = failed;
        self
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.entries
            .iter()
            .find(|e| e.mirror.name == name)
            .map(|e| e.speeds.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MirrorSamples> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of successful samples across all mirrors.
    pub fn sample_count(&self) -> usize {
        self.entries.iter().map(|e| e.speeds.len()).sum()
    }
}
