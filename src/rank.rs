use crate::error::{MirrorError, Result};
use crate::types::{Mirror, ResultSet};
use serde::Serialize;

/// Summary of one mirror's successful samples, in KB/s.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MirrorStats {
    pub mirror: Mirror,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    pub samples: usize,
}

impl MirrorStats {
    /// `None` for an empty sequence
    pub fn from_speeds(mirror: &Mirror, speeds: &[f64]) -> Option<Self> {
        if speeds.is_empty() {
            return None;
        }

        let mean = speeds.iter().sum::<f64>() / speeds.len() as f64;
        let max = speeds.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = speeds.iter().copied().fold(f64::INFINITY, f64::min);

        Some(Self {
            mirror: mirror.clone(),
            // Guard against rounding pushing the mean a hair outside [min, max]
            mean: mean.clamp(min, max),
            max,
            min,
            samples: speeds.len(),
        })
    }
}

/// 排名: 按平均速度从高到低
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Ranking {
    entries: Vec<MirrorStats>,
}

impl Ranking {
    pub fn entries(&self) -> &[MirrorStats] {
        &self.entries
    }

    /// 最快的镜像源; 没有任何成功样本时返回 NoData
    pub fn best(&self) -> Result<&MirrorStats> {
        self.entries.first().ok_or(MirrorError::NoData)
    }
}

/// Reduce every mirror to its stats and sort by mean, fastest first.
/// The sort is stable, so equal means keep result-set (mirror table) order.
pub fn rank(results: &ResultSet) -> Ranking {
    let mut entries: Vec<MirrorStats> = results
        .iter()
        .filter_map(|e| MirrorStats::from_speeds(&e.mirror, &e.speeds))
        .collect();

    entries.sort_by(|a, b| b.mean.total_cmp(&a.mean));

    Ranking { entries }
}
