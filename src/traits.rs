use crate::types::{Mirror, Sample};
use async_trait::async_trait;

/// Prober: 对单个 (镜像源, 包) 组合执行一次测速
///
/// Implementations must not fail: every error (timeout, bad status,
/// connection refused, ...) is folded into `ProbeOutcome::Failed`.
#[async_trait]
pub trait Prober: Sync + Send {
    async fn probe(&self, mirror: &Mirror, package: &str) -> Sample;
}
