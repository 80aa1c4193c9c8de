//! Fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use http::{Request, Response, StatusCode};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use crate::api::{ApiError, HttpTransport};
use crate::auth::{Credential, Navigator, TokenStore};

/// Canned backend behaviour for a single request
pub enum Reply {
    Status(StatusCode, &'static str),
    Fail(&'static str),
    Hang,
}

/// Backend stand-in that replays queued replies and records every request
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Request<Vec<u8>>>>,
}

impl FakeTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Inspect the nth recorded request
    pub fn with_request<R>(&self, index: usize, f: impl FnOnce(&Request<Vec<u8>>) -> R) -> R {
        let requests = self.requests.lock().unwrap();
        f(&requests[index])
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn execute(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, ApiError> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Status(StatusCode::OK, ""));

        match reply {
            Reply::Status(status, body) => Ok(Response::builder()
                .status(status)
                .body(body.as_bytes().to_vec())
                .unwrap()),
            Reply::Fail(msg) => Err(ApiError::Network(msg.to_string())),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ApiError::Network("never answered".to_string()))
            }
        }
    }
}

/// Navigator that remembers where it was sent
#[derive(Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, path: &str) {
        self.visits.lock().unwrap().push(path.to_string());
    }
}

/// Store whose backing medium is unreadable
pub struct UnreadableStore;

impl TokenStore for UnreadableStore {
    fn get(&self) -> anyhow::Result<Option<Credential>> {
        Err(anyhow!("keychain locked"))
    }

    fn save(&self, _credential: &Credential) -> anyhow::Result<()> {
        Err(anyhow!("keychain locked"))
    }

    fn remove(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Counts events emitted at a given level on the current thread
#[derive(Clone)]
pub struct LevelCounter {
    level: Level,
    count: Arc<AtomicUsize>,
}

impl LevelCounter {
    /// Install as the thread default; events are counted until the guard drops
    pub fn install(level: Level) -> (Self, DefaultGuard) {
        let counter = Self {
            level,
            count: Arc::new(AtomicUsize::new(0)),
        };
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (counter, guard)
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for LevelCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == self.level {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}
