//! Test helpers for sluice.
//!
//! Fixtures for unit and integration tests: a temporary admin/public tree,
//! deterministic collaborators and ready-made offline pipelines. These APIs
//! are intended for test-only code paths and panic on setup failure.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

use crate::agent::ScopedAgent;
use crate::bridge::Bridge;
use crate::classifier::{ClassificationError, ClassificationRequest, Classifier, Intent};
use crate::config::AppConfig;
use crate::model::{AgentRole, AgentTurn, ModelError, OfflineResponder, Responder};
use crate::pipeline::{CustomerPipeline, SupervisorPipeline};
use crate::router::Router;
use crate::runtime::{ADMIN_ROOT_ID, PUBLIC_ROOT_ID};
use crate::sandbox::VirtualRoot;
use crate::worker::ScopedFsWorker;

/// A temp dir holding disjoint `admin/` and `public/` trees:
///
/// ```text
/// admin/secrets.txt        ADMIN_SECRET
/// admin/README.md          ADMIN_README
/// public/guide.txt         PUBLIC_GUIDE
/// public/research/note.md  PUBLIC_NOTE
/// ```
pub struct RootFixture {
    temp: TempDir,
    admin: PathBuf,
    public: PathBuf,
}

impl RootFixture {
    pub const ADMIN_SECRET: &'static str = "admin-secret-7f3a";
    pub const ADMIN_README: &'static str = "internal runbook: rotate keys monthly";
    pub const PUBLIC_GUIDE: &'static str = "public-doc-content";
    pub const PUBLIC_NOTE: &'static str = "research notes for customers";

    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let admin = temp.path().join("admin");
        let public = temp.path().join("public");
        std::fs::create_dir_all(public.join("research")).expect("create public tree");
        std::fs::create_dir_all(&admin).expect("create admin tree");

        std::fs::write(admin.join("secrets.txt"), Self::ADMIN_SECRET).expect("write secrets");
        std::fs::write(admin.join("README.md"), Self::ADMIN_README).expect("write readme");
        std::fs::write(public.join("guide.txt"), Self::PUBLIC_GUIDE).expect("write guide");
        std::fs::write(public.join("research/note.md"), Self::PUBLIC_NOTE).expect("write note");

        Self {
            temp,
            admin,
            public,
        }
    }

    pub fn base(&self) -> &Path {
        self.temp.path()
    }

    pub fn admin_dir(&self) -> &Path {
        &self.admin
    }

    pub fn public_dir(&self) -> &Path {
        &self.public
    }

    pub fn admin_root(&self) -> VirtualRoot {
        VirtualRoot::bind(ADMIN_ROOT_ID, &self.admin).expect("bind admin root")
    }

    pub fn public_root(&self) -> VirtualRoot {
        VirtualRoot::bind(PUBLIC_ROOT_ID, &self.public).expect("bind public root")
    }

    pub fn offline_config(&self) -> AppConfig {
        AppConfig::offline(&self.admin, &self.public)
    }
}

impl Default for RootFixture {
    fn default() -> Self {
        Self::new()
    }
}

enum Script {
    Always(Intent),
    Fail,
}

/// Deterministic classifier with a call counter.
pub struct ScriptedClassifier {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn always(intent: Intent) -> Self {
        Self {
            script: Script::Always(intent),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails with [`ClassificationError::Unavailable`].
    pub fn failing() -> Self {
        Self {
            script: Script::Fail,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(
        &self,
        _request: ClassificationRequest<'_>,
    ) -> Result<Intent, ClassificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::Always(intent) => Ok(intent),
            Script::Fail => Err(ClassificationError::Unavailable(
                "scripted classifier failure".to_string(),
            )),
        }
    }
}

/// Responder that always fails, for collaborator-failure paths.
#[derive(Debug, Default)]
pub struct FailingResponder;

#[async_trait]
impl Responder for FailingResponder {
    async fn respond(&self, _turn: &AgentTurn<'_>) -> Result<String, ModelError> {
        Err(ModelError::Unavailable("scripted responder failure".to_string()))
    }
}

/// Customer pipeline on the fixture's public root with an offline responder.
pub fn offline_customer(fixture: &RootFixture) -> CustomerPipeline {
    CustomerPipeline::new(ScopedAgent::new(
        AgentRole::CustomerService,
        ScopedFsWorker::new(fixture.public_root()),
        Arc::new(OfflineResponder),
    ))
}

/// Supervisor pipeline on the fixture's admin root, bridged to
/// [`offline_customer`], routed by `classifier`.
pub fn offline_supervisor(
    fixture: &RootFixture,
    classifier: Arc<dyn Classifier>,
) -> SupervisorPipeline {
    SupervisorPipeline::new(
        Router::new(classifier),
        ScopedAgent::new(
            AgentRole::Supervisor,
            ScopedFsWorker::new(fixture.admin_root()),
            Arc::new(OfflineResponder),
        ),
        Bridge::new(Arc::new(offline_customer(fixture))),
    )
}
