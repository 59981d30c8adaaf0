use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::backend::BackendClient;
use crate::extractor::PageExtractor;

/// A document the frame finished loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug)]
pub enum FrameSignal {
    Loaded(Page),
    Failed { url: String, reason: String },
}

/// Stand-in for the embedded browsing context: each `load` runs as a spawned
/// fetch task that reports Loaded or Failed over a channel. Starting a new
/// load (or clearing the frame) aborts the previous task, and a generation
/// counter drops any signal that still slips through.
pub struct ContentFrame {
    tx: UnboundedSender<(u64, FrameSignal)>,
    rx: UnboundedReceiver<(u64, FrameSignal)>,
    task: Option<JoinHandle<()>>,
    generation: u64,
}

impl ContentFrame {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            task: None,
            generation: 0,
        }
    }

    /// Starts loading `url` through the backend proxy, replacing any load
    /// already in flight.
    pub fn load(&mut self, backend: &BackendClient, url: &str) {
        self.clear();
        let generation = self.generation;
        let proxy_url = backend.proxy_url(url);
        log::debug!("frame load {} via {}", url, proxy_url);

        let backend = backend.clone();
        let tx = self.tx.clone();
        let url = url.to_string();
        self.task = Some(tokio::spawn(async move {
            let signal = match backend.fetch(&proxy_url).await {
                Ok(html) => {
                    let (title, body) = PageExtractor::new().extract(&html);
                    FrameSignal::Loaded(Page { url, title, body })
                }
                Err(e) => FrameSignal::Failed {
                    url,
                    reason: e.to_string(),
                },
            };
            let _ = tx.send((generation, signal));
        }));
    }

    /// Next signal from the current load, if one arrived. Signals from
    /// superseded loads are discarded.
    pub fn poll(&mut self) -> Option<FrameSignal> {
        while let Ok((generation, signal)) = self.rx.try_recv() {
            if generation == self.generation {
                return Some(signal);
            }
            log::debug!("dropping stale frame signal from generation {}", generation);
        }
        None
    }

    /// Aborts any in-flight load and invalidates its signals.
    pub fn clear(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation += 1;
    }

    #[cfg(test)]
    pub(crate) fn inject(&mut self, signal: FrameSignal) {
        let _ = self.tx.send((self.generation, signal));
    }
}

impl Drop for ContentFrame {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
