//! The push channel: replays history to a new observer, then streams live entries.
use super::ViewerState;
use crate::logging::{HistoryBuffer, LogEntry, LogSubscriber};
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Capacity of the live channel per observer before it starts lagging.
const LIVE_CHANNEL_CAPACITY: usize = 1024;

/// Shared history plus the live fan-out channel.
///
/// Appending to history and broadcasting happen under the same lock that a
/// joining observer takes to snapshot history and subscribe, so every
/// observer sees each entry exactly once and in acceptance order.
pub struct LogHub {
    history: Mutex<HistoryBuffer>,
    broadcast_tx: broadcast::Sender<Arc<LogEntry>>,
}

impl LogHub {
    pub fn new(history_size: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(LIVE_CHANNEL_CAPACITY);
        Self {
            history: Mutex::new(HistoryBuffer::new(history_size)),
            broadcast_tx,
        }
    }

    /// Records an entry and pushes it to every connected observer.
    ///
    /// Never waits on observers; a slow observer lags on its own receiver.
    pub fn publish(&self, entry: Arc<LogEntry>) {
        let mut history = self.history.lock();
        history.append(entry.clone());
        // No receivers simply means no observers are connected.
        let _ = self.broadcast_tx.send(entry);
    }

    /// Returns the current history, oldest first.
    pub fn history(&self) -> Vec<Arc<LogEntry>> {
        self.history.lock().snapshot()
    }

    /// Snapshots history and subscribes to live entries in one step.
    pub fn join(&self) -> (Vec<Arc<LogEntry>>, broadcast::Receiver<Arc<LogEntry>>) {
        let history = self.history.lock();
        (history.snapshot(), self.broadcast_tx.subscribe())
    }

    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.history.lock().capacity()
    }

    /// Drops every retained entry.
    pub fn clear(&self) {
        self.history.lock().clear();
    }

    /// Number of observers currently connected.
    pub fn observer_count(&self) -> usize {
        self.broadcast_tx.receiver_count()
    }
}

impl LogSubscriber for LogHub {
    fn on_entry(&self, entry: &Arc<LogEntry>) -> anyhow::Result<()> {
        self.publish(entry.clone());
        Ok(())
    }
}

pub async fn ws_handler(
    State(state): State<Arc<ViewerState>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state)),
        Err(rejection) => {
            debug!("[LOG-VIEWER] rejected upgrade: {}", rejection);
            (StatusCode::BAD_REQUEST, "WebSocket upgrade failed").into_response()
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<ViewerState>) {
    let (mut sender, mut receiver) = socket.split();

    let (history, mut live_rx) = state.hub.join();
    for entry in history {
        if send_entry(&mut sender, &entry).await.is_err() {
            return;
        }
    }

    let mut shutdown = state.shutdown.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                received = live_rx.recv() => match received {
                    Ok(entry) => {
                        if send_entry(&mut sender, &entry).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("[LOG-VIEWER] observer lagged, skipped {} entries", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = shutdown.changed() => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Observers have nothing to say; only watch for the connection ending.
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    debug!("[LOG-VIEWER] observer disconnected");
                    break;
                }
                Err(e) => {
                    debug!("[LOG-VIEWER] observer connection error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

async fn send_entry(
    sender: &mut SplitSink<WebSocket, Message>,
    entry: &LogEntry,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(&entry.redacted()) {
        Ok(json) => json,
        Err(e) => {
            warn!("[LOG-VIEWER] failed to serialize entry: {}", e);
            return Ok(());
        }
    };
    sender.send(Message::Text(json)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use std::time::{Duration, Instant};

    fn entry(message: &str) -> Arc<LogEntry> {
        Arc::new(LogEntry {
            timestamp: "2025-01-01T00:00:00.000Z".into(),
            level: LogLevel::Info,
            message: message.into(),
            tool: None,
            duration_ms: None,
            raw: message.into(),
        })
    }

    #[tokio::test]
    async fn join_sees_history_then_only_newer_entries() {
        let hub = LogHub::new(10);
        hub.publish(entry("A"));
        hub.publish(entry("B"));

        let (history, mut rx) = hub.join();
        hub.publish(entry("C"));

        let replayed: Vec<&str> = history.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(replayed, ["A", "B"]);
        assert_eq!(rx.recv().await.unwrap().message, "C");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn publish_without_observers_still_records_history() {
        let hub = LogHub::new(2);
        for m in ["A", "B", "C"] {
            hub.publish(entry(m));
        }
        let messages: Vec<String> = hub.history().iter().map(|e| e.message.clone()).collect();
        assert_eq!(messages, ["B", "C"]);
        assert_eq!(hub.len(), 2);
        assert_eq!(hub.capacity(), 2);
        assert_eq!(hub.observer_count(), 0);

        hub.clear();
        assert!(hub.history().is_empty());
    }

    #[test]
    fn idle_observer_lags_without_slowing_others() {
        let hub = LogHub::new(10);
        let (_, mut idle) = hub.join();
        let (_, mut active) = hub.join();
        let overflow = 100;
        let total = LIVE_CHANNEL_CAPACITY + overflow;
        let expected: Vec<String> = (0..total).map(|i| format!("entry {i}")).collect();

        let started = Instant::now();
        let mut seen = Vec::with_capacity(total);
        for message in &expected {
            hub.publish(entry(message));
            seen.push(active.try_recv().unwrap().message.clone());
        }
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(seen, expected);

        match idle.try_recv() {
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                assert_eq!(skipped, overflow as u64)
            }
            other => panic!("expected the idle observer to lag, got {other:?}"),
        }
        let resumed: Vec<String> = std::iter::from_fn(|| idle.try_recv().ok())
            .map(|e| e.message.clone())
            .collect();
        assert_eq!(resumed, &expected[overflow..]);
    }
}
