//! 单个 source 的 producer 线程
//!
//! 每个 `SampleSource` 独占一个 OS 线程：poll → push → (无数据则 sleep) → 循环。
//! 线程退出时把 source 交还，停止后可以再次启动。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use broker::{ChannelRegistry, PushOutcome};
use contracts::{ChannelKind, SampleSource};
use tracing::{debug, trace, warn};

use crate::config::{IngestionMetrics, ProducerConfig};
use crate::error::{IngestionError, Result};

/// Producer 线程句柄
pub struct SourceProducer {
    name: String,
    kind: ChannelKind,
    config: ProducerConfig,
    source: Option<Box<dyn SampleSource>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<Box<dyn SampleSource>>>,
}

impl SourceProducer {
    /// 创建 producer (不启动线程)
    pub fn new(source: Box<dyn SampleSource>, config: ProducerConfig) -> Self {
        Self {
            name: source.name().to_string(),
            kind: source.kind(),
            config,
            source: Some(source),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// 启动 producer 线程
    ///
    /// 已在运行时直接返回 Ok。
    pub fn start(
        &mut self,
        registry: Arc<ChannelRegistry>,
        metrics: Arc<IngestionMetrics>,
    ) -> Result<()> {
        let Some(mut source) = self.source.take() else {
            return Ok(());
        };
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let name = self.name.clone();
        let idle_backoff = self.config.idle_backoff;

        let spawned = thread::Builder::new()
            .name(format!("producer-{}", self.name))
            .spawn(move || {
                debug!(source = %name, "producer started");
                while running.load(Ordering::Relaxed) {
                    match source.poll_sample() {
                        Some(sample) => {
                            let kind = sample.kind();
                            let timestamp_us = sample.timestamp_us();
                            metrics.record_received();
                            let outcome = registry.push(sample);
                            metrics.record_outcome(outcome);
                            observability::record_sample_pushed(kind, outcome_label(outcome));
                            trace!(source = %name, timestamp_us, ?outcome, "sample pushed");
                        }
                        None => {
                            metrics.record_idle();
                            thread::sleep(idle_backoff);
                        }
                    }
                }
                debug!(source = %name, "producer stopped");
                source
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                // spawn 失败时闭包(连同 source)已被丢弃，producer 不可再启动
                self.running.store(false, Ordering::SeqCst);
                Err(IngestionError::SpawnFailed {
                    name: self.name.clone(),
                    source: e,
                })
            }
        }
    }

    /// 停止并 join producer 线程
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(source) => self.source = Some(source),
                Err(_) => warn!(source = %self.name, "producer thread panicked"),
            }
        }
    }

    /// 是否正在运行
    pub fn is_running(&self) -> bool {
        self.handle.is_some() && self.running.load(Ordering::Relaxed)
    }
}

impl Drop for SourceProducer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn outcome_label(outcome: PushOutcome) -> &'static str {
    match outcome {
        PushOutcome::Stored => "stored",
        PushOutcome::Dropped => "dropped",
        PushOutcome::Discarded => "discarded",
    }
}
