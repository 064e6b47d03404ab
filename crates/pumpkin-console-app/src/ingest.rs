//! Cross-thread log ingestion
//!
//! Server lines arrive on arbitrary threads. Each one is parsed on the
//! producer thread and pushed onto an [`IngestionQueue`]; the engine loop is
//! the only consumer and takes whole batches with [`IngestionQueue::drain`].
//!
//! The queue and its `drain_scheduled` flag live under one mutex, so a drain
//! wake is requested by exactly the enqueue that finds no drain pending, and
//! an entry enqueued after a drain took its batch always schedules a new one.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pumpkin_console_core::prelude::*;
use pumpkin_console_core::{LineParser, LogEntry};
use pumpkin_console_server::LogCallback;
use tokio::sync::mpsc;

use crate::message::Message;

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<LogEntry>,
    drain_scheduled: bool,
    high_water_mark: usize,
}

/// Unbounded FIFO shared between producers and the engine loop
#[derive(Debug, Clone, Default)]
pub struct IngestionQueue {
    inner: Arc<Mutex<QueueState>>,
}

impl IngestionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry.
    ///
    /// Returns true when this call scheduled a new drain cycle; the caller is
    /// then responsible for waking the consumer.
    pub fn enqueue(&self, entry: LogEntry) -> bool {
        let mut state = self.lock();
        state.pending.push_back(entry);
        state.high_water_mark = state.high_water_mark.max(state.pending.len());

        if state.drain_scheduled {
            false
        } else {
            state.drain_scheduled = true;
            true
        }
    }

    /// Take every pending entry in arrival order and end the drain cycle.
    pub fn drain(&self) -> Vec<LogEntry> {
        let mut state = self.lock();
        state.drain_scheduled = false;
        state.pending.drain(..).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Largest backlog observed so far
    pub fn high_water_mark(&self) -> usize {
        self.lock().high_water_mark
    }

    pub fn is_drain_scheduled(&self) -> bool {
        self.lock().drain_scheduled
    }
}

/// Raw lines received this session, for replay into a new view
#[derive(Debug, Clone, Default)]
pub struct LogHistory {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LogHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }

    /// All recorded lines joined with `\n`
    pub fn text(&self) -> String {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// The producer side: parse, enqueue, wake the engine
///
/// Registered with the server as its logger via [`LogSink::into_callback`].
#[derive(Debug, Clone)]
pub struct LogSink {
    queue: IngestionQueue,
    wake_tx: mpsc::Sender<Message>,
    parser: LineParser,
    history: LogHistory,
}

impl LogSink {
    pub fn new(queue: IngestionQueue, wake_tx: mpsc::Sender<Message>, history: LogHistory) -> Self {
        Self {
            queue,
            wake_tx,
            parser: LineParser::new(),
            history,
        }
    }

    /// Handle one raw server line. Never blocks on the consumer.
    pub fn push_line(&self, raw: &str) {
        let line = raw.trim_end_matches(['\r', '\n']);
        self.history.record(line);

        if line.trim().is_empty() {
            return;
        }

        let entry = self.parser.parse(line);
        if self.queue.enqueue(entry) {
            self.wake();
        }
    }

    /// Request a drain from the engine loop.
    ///
    /// A full channel means the engine has messages to process, and it
    /// drains after every message, so the entry is still delivered.
    fn wake(&self) {
        match self.wake_tx.try_send(Message::DrainLogs) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                trace!("Message channel full, drain will follow the backlog");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Engine gone, log line left in queue");
            }
        }
    }

    pub fn queue(&self) -> &IngestionQueue {
        &self.queue
    }

    pub fn history(&self) -> &LogHistory {
        &self.history
    }

    /// Wrap this sink as a server log callback
    pub fn into_callback(self) -> LogCallback {
        Arc::new(move |line: &str| self.push_line(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pumpkin_console_core::LogLevel;
    use std::thread;

    fn entry(message: &str) -> LogEntry {
        LogEntry::system(LogLevel::Info, message)
    }

    fn messages(entries: &[LogEntry]) -> Vec<String> {
        entries.iter().map(|e| e.message.clone()).collect()
    }

    #[test]
    fn test_first_enqueue_schedules_drain() {
        let queue = IngestionQueue::new();
        assert!(queue.enqueue(entry("a")));
        assert!(!queue.enqueue(entry("b")));
        assert!(!queue.enqueue(entry("c")));
        assert!(queue.is_drain_scheduled());
        assert_eq!(queue.pending_len(), 3);
    }

    #[test]
    fn test_drain_is_fifo_and_resets_cycle() {
        let queue = IngestionQueue::new();
        queue.enqueue(entry("a"));
        queue.enqueue(entry("b"));

        let batch = queue.drain();
        assert_eq!(messages(&batch), vec!["a", "b"]);
        assert!(!queue.is_drain_scheduled());
        assert_eq!(queue.pending_len(), 0);
    }

    #[test]
    fn test_enqueue_after_drain_is_not_stranded() {
        let queue = IngestionQueue::new();
        assert!(queue.enqueue(entry("a")));
        let _ = queue.drain();

        // A new cycle must be requested for the late entry
        assert!(queue.enqueue(entry("late")));
        assert_eq!(messages(&queue.drain()), vec!["late"]);
    }

    #[test]
    fn test_empty_drain() {
        let queue = IngestionQueue::new();
        assert!(queue.drain().is_empty());
        assert!(queue.enqueue(entry("x")));
    }

    #[test]
    fn test_high_water_mark() {
        let queue = IngestionQueue::new();
        for i in 0..5 {
            queue.enqueue(entry(&i.to_string()));
        }
        let _ = queue.drain();
        queue.enqueue(entry("x"));
        assert_eq!(queue.high_water_mark(), 5);
    }

    #[test]
    fn test_concurrent_producers_deliver_everything_once() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 500;

        let queue = IngestionQueue::new();
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let queue = queue.clone();
                thread::spawn(move || {
                    let mut wakes = 0;
                    for i in 0..PER_THREAD {
                        if queue.enqueue(entry(&format!("{t}:{i}"))) {
                            wakes += 1;
                        }
                    }
                    wakes
                })
            })
            .collect();

        // Consumer drains concurrently with the producers
        let mut received = Vec::new();
        while received.len() < THREADS * PER_THREAD {
            received.extend(queue.drain());
            thread::yield_now();
        }
        let wakes: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(received.len(), THREADS * PER_THREAD);
        assert!(wakes >= 1);

        // Per-producer order is preserved and nothing is duplicated
        let mut next = [0usize; THREADS];
        for e in &received {
            let (t, i) = e.message.split_once(':').unwrap();
            let (t, i): (usize, usize) = (t.parse().unwrap(), i.parse().unwrap());
            assert_eq!(i, next[t], "out of order or duplicated for producer {t}");
            next[t] += 1;
        }
        assert!(next.iter().all(|&n| n == PER_THREAD));
    }

    #[tokio::test]
    async fn test_sink_parses_and_wakes_once_per_cycle() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = LogSink::new(IngestionQueue::new(), tx, LogHistory::new());

        sink.push_line("[WARN] one\r\n");
        sink.push_line("[INFO] two");

        assert!(matches!(rx.try_recv(), Ok(Message::DrainLogs)));
        assert!(rx.try_recv().is_err());

        let batch = sink.queue().drain();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].level, LogLevel::Warn);
        assert_eq!(batch[0].message, "[WARN] one");

        sink.push_line("[INFO] three");
        assert!(matches!(rx.try_recv(), Ok(Message::DrainLogs)));
    }

    #[tokio::test]
    async fn test_sink_skips_blank_lines_but_records_history() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = LogSink::new(IngestionQueue::new(), tx, LogHistory::new());

        sink.push_line("   \n");
        assert_eq!(sink.queue().pending_len(), 0);
        assert!(rx.try_recv().is_err());

        sink.push_line("[INFO] ready");
        assert_eq!(sink.history().text(), "   \n[INFO] ready");
    }

    #[tokio::test]
    async fn test_sink_full_channel_keeps_entry_queued() {
        let (tx, _rx) = mpsc::channel(1);
        tx.try_send(Message::RefreshMetrics).unwrap();
        let sink = LogSink::new(IngestionQueue::new(), tx, LogHistory::new());

        sink.push_line("[INFO] kept");
        assert_eq!(sink.queue().pending_len(), 1);
    }

    #[tokio::test]
    async fn test_sink_as_callback() {
        let (tx, _rx) = mpsc::channel(8);
        let sink = LogSink::new(IngestionQueue::new(), tx, LogHistory::new());
        let queue = sink.queue().clone();

        let callback = sink.into_callback();
        callback("[ERROR] from another thread");

        let batch = queue.drain();
        assert_eq!(batch[0].level, LogLevel::Error);
    }
}
