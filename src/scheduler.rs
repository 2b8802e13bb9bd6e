//! Fan probes out over the (mirror × package) cross product.
//!
//! At most `workers` probe tasks are in flight at once; when one finishes the
//! next pending pair is spawned. Every task sends its sample to one collector
//! task, which is the only owner of the per-mirror speed lists.

use crate::error::Result;
use crate::traits::Prober;
use crate::types::{Mirror, MirrorSamples, ProbeOutcome, ResultSet, Sample};
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// 并发测试所有镜像源的下载速度
///
/// 逻辑:
/// 1. 枚举所有 (镜像源, 包) 组合
/// 2. 以最多 `workers` 个并发任务执行测速
/// 3. 所有样本经由 channel 汇总到唯一的收集任务
/// 4. 等待全部任务结束后返回结果集 (按镜像源配置顺序)
pub async fn run_probes(
    prober: Arc<dyn Prober>,
    mirrors: &[Mirror],
    packages: &[String],
    workers: usize,
    pb: &ProgressBar,
) -> Result<ResultSet> {
    let workers = workers.max(1);
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Sample)>();

    // Keyed by position in the mirror table so the result set comes out in table order
    let collector = tokio::spawn(async move {
        let mut speeds: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
        let mut failed = 0usize;
        let mut total_bytes = 0usize;
        while let Some((idx, sample)) = rx.recv().await {
            if let ProbeOutcome::Success { bytes, elapsed, .. } = &sample.outcome {
                total_bytes += bytes;
                tracing::trace!(
                    mirror = %sample.mirror,
                    bytes,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "sample received"
                );
            }
            match sample.speed() {
                Some(speed) => speeds.entry(idx).or_default().push(speed),
                None => failed += 1,
            }
        }
        (speeds, failed, total_bytes)
    });

    let mut jobs = mirrors
        .iter()
        .enumerate()
        .flat_map(|(idx, _)| packages.iter().map(move |p| (idx, p.clone())));

    let mut join_set = JoinSet::new();
    let mut finished = 0usize;
    let mut aborted = 0usize;

    loop {
        while join_set.len() < workers {
            let Some((idx, package)) = jobs.next() else {
                break;
            };
            let prober = Arc::clone(&prober);
            let mirror = mirrors[idx].clone();
            let tx = tx.clone();
            join_set.spawn(async move {
                let sample = prober.probe(&mirror, &package).await;
                let _ = tx.send((idx, sample));
            });
        }

        let Some(res) = join_set.join_next().await else {
            break;
        };
        finished += 1;
        pb.inc(1);
        if let Err(e) = res {
            // No sample was sent for this job
            aborted += 1;
            tracing::warn!("probe task did not complete: {}", e);
        }
    }

    drop(tx);
    let (speeds, failed, total_bytes) = collector.await?;

    let results = ResultSet::from_entries(speeds.into_iter().map(|(idx, speeds)| {
        MirrorSamples {
            mirror: mirrors[idx].clone(),
            speeds,
        }
    }))
    .with_failed(failed + aborted);

    tracing::info!(
        probes = finished,
        failed = results.failed(),
        succeeded = results.sample_count(),
        reachable = results.len(),
        total_bytes,
        "probing finished"
    );
    if results.is_empty() {
        tracing::warn!("no mirror produced a usable sample");
    }

    Ok(results)
}
