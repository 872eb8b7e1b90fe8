// Live status streams: a bounded, fixed-interval loop per session that samples the
// host and emits StatusEvents until its duration elapses or it is cancelled.

use crate::history::CpuHistory;
use crate::models::{SessionKey, StatusEvent};
use crate::ranker::rank;
use crate::sampler::{self, Sampler};
use futures_util::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Duration, Instant, interval_at};
use tokio_util::sync::CancellationToken;

struct ActiveStream {
    id: u64,
    cancel: CancellationToken,
}

pub struct LiveReporter {
    sampler: Arc<dyn Sampler>,
    top_n: usize,
    history: Arc<CpuHistory>,
    started_at: Instant,
    next_id: AtomicU64,
    sessions: Arc<Mutex<HashMap<SessionKey, ActiveStream>>>,
}

impl LiveReporter {
    /// `history` supplies the peak/average shown with every event.
    pub fn new(sampler: Arc<dyn Sampler>, top_n: usize, history: Arc<CpuHistory>) -> Self {
        Self {
            sampler,
            top_n,
            history,
            started_at: Instant::now(),
            next_id: AtomicU64::new(1),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts a stream of `floor(total_duration / interval)` events, one every
    /// `interval`. Any stream already running for `session_key` is cancelled first.
    pub async fn run(
        &self,
        session_key: SessionKey,
        interval: Duration,
        total_duration: Duration,
    ) -> StatusStream {
        let count = emission_count(interval, total_duration);
        let cancel = CancellationToken::new();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut sessions = self.sessions.lock().await;
            let active = ActiveStream {
                id,
                cancel: cancel.clone(),
            };
            if let Some(previous) = sessions.insert(session_key.clone(), active) {
                previous.cancel.cancel();
                tracing::debug!(session = %session_key, "replaced running status stream");
            }
        }

        let (tx, rx) = mpsc::channel(1);
        let job = StreamJob {
            sampler: self.sampler.clone(),
            top_n: self.top_n,
            history: self.history.clone(),
            started_at: self.started_at,
            interval,
            count,
            tx,
            cancel: cancel.clone(),
        };
        let sessions = self.sessions.clone();
        let key = session_key.clone();
        tokio::spawn(async move {
            tracing::info!(session = %key, count, interval_ms = interval.as_millis() as u64, "status stream started");
            let emitted = job.run().await;
            let mut sessions = sessions.lock().await;
            if sessions.get(&key).is_some_and(|a| a.id == id) {
                sessions.remove(&key);
            }
            tracing::info!(session = %key, emitted, "status stream finished");
        });

        StatusStream {
            session_key,
            rx,
            cancel,
        }
    }

    /// Cancels the session's running stream, if any.
    pub async fn stop(&self, session_key: &SessionKey) -> bool {
        match self.sessions.lock().await.remove(session_key) {
            Some(active) => {
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of sessions with a running stream.
    pub async fn active(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

pub fn emission_count(interval: Duration, total_duration: Duration) -> u64 {
    if interval.is_zero() {
        return 0;
    }
    (total_duration.as_nanos() / interval.as_nanos()) as u64
}

struct StreamJob {
    sampler: Arc<dyn Sampler>,
    top_n: usize,
    history: Arc<CpuHistory>,
    started_at: Instant,
    interval: Duration,
    count: u64,
    tx: mpsc::Sender<StatusEvent>,
    cancel: CancellationToken,
}

impl StreamJob {
    /// Returns the number of events handed to the consumer.
    async fn run(self) -> u64 {
        let mut tick = interval_at(Instant::now() + self.interval, self.interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut emitted = 0u64;

        for seq in 1..=self.count {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tick.tick() => {}
            }
            let sample = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                s = sampler::capture(self.sampler.clone()) => s,
            };
            let sample = match sample {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, operation = "capture", seq, "status sample failed; skipping update");
                    continue;
                }
            };
            let summary = self.history.summary_or(sample.total_cpu_pct);
            let event = StatusEvent {
                timestamp: sample.timestamp,
                seq,
                total_cpu_pct: sample.total_cpu_pct,
                total_mem_pct: sample.total_mem_pct,
                top: rank(&sample, self.top_n),
                peak_cpu_pct: summary.peak_cpu_pct,
                avg_cpu_pct: summary.avg_cpu_pct,
                uptime_secs: self.started_at.elapsed().as_secs(),
            };
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                sent = self.tx.send(event) => {
                    if sent.is_err() {
                        break;
                    }
                    emitted += 1;
                }
            }
        }
        emitted
    }
}

/// Consumer side of a status stream. Yields `None` once the stream is finished
/// or cancelled; dropping it cancels the producer.
pub struct StatusStream {
    session_key: SessionKey,
    rx: mpsc::Receiver<StatusEvent>,
    cancel: CancellationToken,
}

impl StatusStream {
    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that stops this stream when cancelled (e.g. by a transport on disconnect).
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Stream for StatusStream {
    type Item = StatusEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StatusEvent>> {
        let this = self.get_mut();
        if this.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        this.rx.poll_recv(cx)
    }
}

impl Drop for StatusStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
