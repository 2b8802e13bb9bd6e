use crate::error::Result;
use crate::rank::{MirrorStats, Ranking};
use crate::types::{Mirror, ResultSet};
use serde::Serialize;

const RULE_WIDTH: usize = 60;

/// Everything the console/JSON output needs, detached from the probing machinery.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub packages: Vec<String>,
    pub probes: usize,
    pub succeeded: usize,
    pub ranking: Ranking,
    pub best: MirrorStats,
    pub unreachable: Vec<String>,
}

impl Report {
    /// Fails with `NoData` when no mirror produced a sample.
    pub fn new(
        mirrors: &[Mirror],
        packages: &[String],
        results: &ResultSet,
        ranking: Ranking,
    ) -> Result<Self> {
        let best = ranking.best()?.clone();
        let unreachable = mirrors
            .iter()
            .filter(|m| results.get(&m.name).is_none())
            .map(|m| m.name.clone())
            .collect();

        Ok(Self {
            packages: packages.to_vec(),
            probes: mirrors.len() * packages.len(),
            succeeded: results.sample_count(),
            ranking,
            best,
            unreachable,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 完整的文本输出: 表格 + 不可用列表 + 推荐
    pub fn render(&self) -> String {
        let mut out = render_table(&self.ranking);
        if !self.unreachable.is_empty() {
            out.push_str(&format!("Unreachable: {}\n", self.unreachable.join(", ")));
        }
        out.push_str(&format!(
            "{} of {} probes succeeded.\n",
            self.succeeded, self.probes
        ));
        out.push('\n');
        out.push_str(&render_recommendation(&self.best));
        out
    }
}

/// Ranking table, fastest first, speeds in KB/s with two decimals
pub fn render_table(ranking: &Ranking) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<4} {:<12} {:>14} {:>14} {:>14}\n",
        "RANK", "MIRROR", "AVG (KB/s)", "MAX (KB/s)", "MIN (KB/s)"
    ));
    out.push_str(&format!("{}\n", "-".repeat(RULE_WIDTH + 2)));

    for (i, s) in ranking.entries().iter().enumerate() {
        out.push_str(&format!(
            "{:<4} {:<12} {:>14.2} {:>14.2} {:>14.2}\n",
            i + 1,
            s.mirror.name,
            s.mean,
            s.max,
            s.min
        ));
    }
    out.push_str(&format!("{}\n", "-".repeat(RULE_WIDTH + 2)));
    out
}

pub fn render_recommendation(best: &MirrorStats) -> String {
    format!(
        "Recommendation: '{}' is the fastest ({:.2} KB/s on average).\nURL: {}\nRun 'pip config set global.index-url {}' to apply.\n",
        best.mirror.name, best.mean, best.mirror.url, best.mirror.url
    )
}
