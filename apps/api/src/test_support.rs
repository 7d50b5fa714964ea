//! Scripted fakes for the pipeline's collaborators. Compiled only for tests.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use crate::config::{Config, PipelineConfig};
use crate::content::history::ContentHistory;
use crate::content::models::{ContentPage, Cover, EngagementHooks, StructuredContent};
use crate::content::service::ContentService;
use crate::content::ContentError;
use crate::layout::controller::RenderedImage;
use crate::layout::filler::FilledTemplate;
use crate::layout::raster::{RasterBackend, RasterError, Rasterizer};
use crate::layout::templates::TemplateId;
use crate::llm_client::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::notify::{Notifier, NotifyError, NotifyReceipt};
use crate::pipeline::machine::Collaborators;
use crate::pipeline::orchestrator::JobOrchestrator;
use crate::state::AppState;
use crate::storage::{BlobStore, StoreBackend, StoreError};

// ────────────────────────────────────────────────────────────────────────────
// Content
// ────────────────────────────────────────────────────────────────────────────

/// Content that fits every render budget: `pages` pages and a caption above the minimum.
pub fn sample_content(pages: usize) -> StructuredContent {
    StructuredContent {
        content_type: "ai_news".to_string(),
        search_decision: None,
        cover: Cover {
            hashtag: "AI".to_string(),
            heading_line1: "AI Ethics".to_string(),
            heading_line2: "Why it matters".to_string(),
            grey_box_text: "Swipe to learn more".to_string(),
        },
        content_pages: (1..=pages)
            .map(|i| ContentPage {
                title: format!("Point {i}"),
                main_point: format!("Short takeaway number {i}."),
            })
            .collect(),
        caption: "Responsible AI starts with the people who build it. "
            .repeat(3)
            .trim_end()
            .to_string(),
        engagement_hooks: EngagementHooks {
            question_for_comments: "Where do you draw the line?".to_string(),
            sharing_incentive: "Share with a teammate who ships models.".to_string(),
        },
        sources: vec![],
    }
}

/// Returns queued responses in order; errors once the queue is empty.
pub struct ScriptedContentService {
    responses: Mutex<VecDeque<Result<StructuredContent, ContentError>>>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedContentService {
    pub fn new(responses: Vec<Result<StructuredContent, ContentError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(request, history)` for each call, in order.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentService for ScriptedContentService {
    async fn generate(
        &self,
        request: &str,
        history: &[String],
    ) -> Result<StructuredContent, ContentError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.to_string(), history.to_vec()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ContentError::Unavailable("script exhausted".to_string())))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Blob store
// ────────────────────────────────────────────────────────────────────────────

/// In-memory store. Optionally rejects keys containing a given fragment.
pub struct MemoryBlobStore {
    objects: Mutex<BTreeMap<String, (Bytes, String)>>,
    reject: Option<String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            reject: None,
        }
    }

    /// Rejects every write.
    pub fn failing() -> Self {
        Self::failing_on("")
    }

    /// Rejects writes whose key contains `fragment`.
    pub fn failing_on(fragment: &str) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            reject: Some(fragment.to_string()),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    /// Stored bytes and content type for `key`.
    pub fn object(&self, key: &str) -> Option<(Bytes, String)> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StoreError> {
        if let Some(fragment) = &self.reject {
            if key.contains(fragment.as_str()) {
                return Err(StoreError::S3 {
                    key: key.to_string(),
                    message: "simulated outage".to_string(),
                });
            }
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(bytes, _)| bytes.clone()))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rasterizer
// ────────────────────────────────────────────────────────────────────────────

/// Returns placeholder bytes. Fails always for chosen templates, or for the first N calls.
pub struct StubRasterizer {
    fail_for: HashSet<TemplateId>,
    fail_first: usize,
    calls: AtomicUsize,
    rendered: Mutex<Vec<FilledTemplate>>,
}

impl StubRasterizer {
    pub fn new() -> Self {
        Self {
            fail_for: HashSet::new(),
            fail_first: 0,
            calls: AtomicUsize::new(0),
            rendered: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_for(templates: &[TemplateId]) -> Self {
        Self {
            fail_for: templates.iter().copied().collect(),
            ..Self::new()
        }
    }

    pub fn failing_first(n: usize) -> Self {
        Self {
            fail_first: n,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Templates that rendered successfully, in call order.
    pub fn rendered(&self) -> Vec<FilledTemplate> {
        self.rendered.lock().unwrap().clone()
    }
}

impl Rasterizer for StubRasterizer {
    fn render(&self, filled: &FilledTemplate) -> Result<Vec<u8>, RasterError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first || self.fail_for.contains(&filled.template) {
            return Err(RasterError::MalformedInput(format!(
                "stub refuses {}",
                filled.template
            )));
        }
        self.rendered.lock().unwrap().push(filled.clone());
        Ok(format!("png:{}", filled.template).into_bytes())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Notifier
// ────────────────────────────────────────────────────────────────────────────

pub struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<(String, usize)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// `(recipient, image count)` per send.
    pub fn sent(&self) -> Vec<(String, usize)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        recipient: &str,
        content: &StructuredContent,
        images: &[RenderedImage],
    ) -> Result<NotifyReceipt, NotifyError> {
        if self.fail {
            return Err(NotifyError::Transport("simulated SMTP outage".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), images.len()));
        Ok(NotifyReceipt {
            recipient: recipient.to_string(),
            subject: content.headline(),
            sent_at: Utc::now(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wiring
// ────────────────────────────────────────────────────────────────────────────

pub struct Fakes {
    pub content: Arc<ScriptedContentService>,
    pub store: Arc<MemoryBlobStore>,
    pub rasterizer: Arc<StubRasterizer>,
    pub notifier: Option<Arc<RecordingNotifier>>,
    pub history: Arc<ContentHistory>,
}

impl Fakes {
    pub fn new(content: ScriptedContentService) -> Self {
        Self {
            content: Arc::new(content),
            store: Arc::new(MemoryBlobStore::new()),
            rasterizer: Arc::new(StubRasterizer::new()),
            notifier: None,
            history: Arc::new(ContentHistory::default()),
        }
    }

    pub fn with_store(mut self, store: MemoryBlobStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: StubRasterizer) -> Self {
        self.rasterizer = Arc::new(rasterizer);
        self
    }

    pub fn with_notifier(mut self, notifier: RecordingNotifier) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            content: self.content.clone(),
            store: self.store.clone(),
            rasterizer: self.rasterizer.clone(),
            notifier: self
                .notifier
                .clone()
                .map(|n| n as Arc<dyn Notifier>),
            history: self.history.clone(),
        }
    }

    pub fn orchestrator(&self, config: PipelineConfig) -> JobOrchestrator {
        JobOrchestrator::new(self.collaborators(), config)
    }
}

pub fn test_config() -> Config {
    Config {
        port: 0,
        rust_log: "debug".to_string(),
        xai_api_key: "test-key".to_string(),
        llm_base_url: DEFAULT_BASE_URL.to_string(),
        llm_model: DEFAULT_MODEL.to_string(),
        storage_backend: StoreBackend::Local,
        output_dir: "output".to_string(),
        s3: None,
        raster_backend: RasterBackend::Basic,
        smtp: None,
        pipeline: PipelineConfig::default(),
    }
}

/// Router state over fakes. Returns the store for assertions.
pub fn test_app_state(content: ScriptedContentService) -> (AppState, Arc<MemoryBlobStore>) {
    let fakes = Fakes::new(content);
    let config = test_config();
    let state = AppState {
        orchestrator: Arc::new(fakes.orchestrator(config.pipeline.clone())),
        config: Arc::new(config),
    };
    (state, fakes.store)
}
