//! 消息分发指标收集模块
//!
//! 基于 SubmitOutcome / ReplayReport 记录 Prometheus 指标，并在内存中聚合摘要。

use contracts::{DispatchOutcome, ReplayReport, SubmitOutcome};
use metrics::{counter, gauge, histogram};
use std::collections::BTreeMap;

/// 记录一次 submit 的结果
///
/// # Example
///
/// ```ignore
/// let outcome = dispatcher.submit_detailed(envelope, saved, processors)?;
/// observability::metrics::record_submit_outcome(&outcome);
/// ```
pub fn record_submit_outcome(outcome: &SubmitOutcome) {
    counter!("courier_submissions_total", "path" => outcome.path()).increment(1);

    match outcome {
        SubmitOutcome::Recorded {
            event_emitted,
            marked_read,
            ..
        } => {
            if *event_emitted {
                counter!("courier_events_emitted_total").increment(1);
            }
            if *marked_read {
                counter!("courier_marked_read_total").increment(1);
            }
        }
        SubmitOutcome::Buffered { .. } => counter!("courier_buffered_total").increment(1),
        SubmitOutcome::Dispatched(dispatch) => record_dispatch(dispatch),
    }
}

/// 记录事务提交后的重放结果
pub fn record_replay_report(report: &ReplayReport) {
    counter!("courier_replayed_total").increment(report.replayed() as u64);
    histogram!("courier_replay_batch_size").record(report.replayed() as f64);
    for outcome in &report.outcomes {
        record_dispatch(outcome);
    }
}

/// 记录回滚丢弃的消息数
pub fn record_discarded(discarded: usize) {
    counter!("courier_discarded_total").increment(discarded as u64);
}

/// 记录所有事务缓冲区的总深度
///
/// 不按事务打标签：事务 id 无界，每个 id 一条序列会让导出端无限增长。
pub fn record_pending_depth(total: usize) {
    gauge!("courier_pending_depth").set(total as f64);
}

/// 记录 processor 累计计数（来自 dispatcher 快照）
pub fn record_processor_counts(processor: &str, sent: u64, failed: u64) {
    gauge!("courier_processor_sent", "processor" => processor.to_string()).set(sent as f64);
    gauge!("courier_processor_failed", "processor" => processor.to_string()).set(failed as f64);
}

fn record_dispatch(outcome: &DispatchOutcome) {
    for name in &outcome.attempted {
        let status = if outcome.failed.contains(name) {
            "failure"
        } else {
            "success"
        };
        counter!(
            "courier_processor_calls_total",
            "processor" => name.to_string(),
            "status" => status
        )
        .increment(1);
    }
    if outcome.event_emitted {
        counter!("courier_events_emitted_total").increment(1);
    }
    if outcome.marked_read {
        counter!("courier_marked_read_total").increment(1);
    }
}

/// 分发指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DeliveryMetricsAggregator {
    /// 各路径的提交次数
    pub submissions: BTreeMap<&'static str, u64>,

    /// 重放的消息总数
    pub replayed: u64,

    /// 回滚丢弃的消息总数
    pub discarded: u64,

    /// 已提交的事务数
    pub commits: u64,

    /// 已回滚的事务数
    pub rollbacks: u64,

    pub events_emitted: u64,

    pub marked_read: u64,

    /// 各 processor (成功, 失败) 次数
    pub processor_calls: BTreeMap<String, (u64, u64)>,

    /// 每次提交的重放批量统计
    pub replay_batch: RunningStats,
}

impl DeliveryMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submit(&mut self, outcome: &SubmitOutcome) {
        *self.submissions.entry(outcome.path()).or_insert(0) += 1;
        match outcome {
            SubmitOutcome::Recorded {
                event_emitted,
                marked_read,
                ..
            } => {
                self.events_emitted += u64::from(*event_emitted);
                self.marked_read += u64::from(*marked_read);
            }
            SubmitOutcome::Buffered { .. } => {}
            SubmitOutcome::Dispatched(dispatch) => self.record_dispatch(dispatch),
        }
    }

    pub fn record_replay(&mut self, report: &ReplayReport) {
        self.commits += 1;
        self.replayed += report.replayed() as u64;
        self.replay_batch.push(report.replayed() as f64);
        for outcome in &report.outcomes {
            self.record_dispatch(outcome);
        }
    }

    pub fn record_rollback(&mut self, discarded: usize) {
        self.rollbacks += 1;
        self.discarded += discarded as u64;
    }

    fn record_dispatch(&mut self, outcome: &DispatchOutcome) {
        for name in &outcome.attempted {
            let entry = self.processor_calls.entry(name.to_string()).or_default();
            if outcome.failed.contains(name) {
                entry.1 += 1;
            } else {
                entry.0 += 1;
            }
        }
        self.events_emitted += u64::from(outcome.event_emitted);
        self.marked_read += u64::from(outcome.marked_read);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> DeliverySummary {
        let total_calls: u64 = self.processor_calls.values().map(|(ok, err)| ok + err).sum();
        let failed_calls: u64 = self.processor_calls.values().map(|(_, err)| err).sum();

        DeliverySummary {
            total_submissions: self.submissions.values().sum(),
            submissions: self.submissions.clone(),
            replayed: self.replayed,
            discarded: self.discarded,
            commits: self.commits,
            rollbacks: self.rollbacks,
            events_emitted: self.events_emitted,
            marked_read: self.marked_read,
            failure_rate: if total_calls > 0 {
                failed_calls as f64 / total_calls as f64 * 100.0
            } else {
                0.0
            },
            processor_calls: self.processor_calls.clone(),
            replay_batch: StatsSummary::from(&self.replay_batch),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 分发摘要
#[derive(Debug, Clone, Default)]
pub struct DeliverySummary {
    pub total_submissions: u64,
    pub submissions: BTreeMap<&'static str, u64>,
    pub replayed: u64,
    pub discarded: u64,
    pub commits: u64,
    pub rollbacks: u64,
    pub events_emitted: u64,
    pub marked_read: u64,
    /// 失败调用占比 (%)
    pub failure_rate: f64,
    pub processor_calls: BTreeMap<String, (u64, u64)>,
    pub replay_batch: StatsSummary,
}

impl std::fmt::Display for DeliverySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Delivery Summary ===")?;
        writeln!(f, "Submissions: {}", self.total_submissions)?;
        for (path, count) in &self.submissions {
            writeln!(f, "  {path}: {count}")?;
        }
        writeln!(
            f,
            "Transactions: {} committed, {} rolled back",
            self.commits, self.rollbacks
        )?;
        writeln!(
            f,
            "Replayed: {}, discarded: {}",
            self.replayed, self.discarded
        )?;
        writeln!(f, "Replay batch size: {}", self.replay_batch)?;
        writeln!(f, "Events emitted: {}", self.events_emitted)?;
        writeln!(f, "Marked read: {}", self.marked_read)?;
        writeln!(f, "Processor failure rate: {:.2}%", self.failure_rate)?;

        if !self.processor_calls.is_empty() {
            writeln!(f, "Processor calls (ok/failed):")?;
            for (name, (ok, failed)) in &self.processor_calls {
                writeln!(f, "  {name}: {ok}/{failed}")?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}
