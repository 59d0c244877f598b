//! # Scoped Agent
//!
//! A [`ScopedAgent`] is the worker-running half of a pipeline: it pulls file
//! directives out of an instruction, carries them out through its
//! [`ScopedFsWorker`], and hands the instruction plus the results to its
//! [`Responder`].
//!
//! Sandbox violations become [`Observation::Blocked`] entries; they never
//! abort the turn. Only a responder failure does.

mod directive;

pub use directive::{Directive, extract_directives, normalize_scope_path};

use std::sync::Arc;

use crate::model::{AgentRole, AgentTurn, ModelError, Responder};
use crate::worker::{ListedEntry, ScopedFsWorker, WorkerError, WorkerOp};

/// Result of one directive, as shown to the responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Read { path: String, content: String },
    Listed { path: String, entries: Vec<ListedEntry> },
    Wrote { path: String, bytes: usize },
    /// Denied by the sandbox. `reason` never names a real directory.
    Blocked { op: WorkerOp, path: String, reason: String },
    Failed { op: WorkerOp, path: String, reason: String },
}

impl Observation {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Observation::Blocked { .. })
    }

    pub fn render(&self) -> String {
        match self {
            Observation::Read { path, content } => format!("read {path}:\n{content}"),
            Observation::Listed { path, entries } => {
                let names: Vec<String> = entries
                    .iter()
                    .map(|e| {
                        if e.is_dir {
                            format!("{}/", e.name)
                        } else {
                            e.name.clone()
                        }
                    })
                    .collect();
                format!("listed {path}: {}", names.join(", "))
            }
            Observation::Wrote { path, bytes } => format!("wrote {path} ({bytes} bytes)"),
            Observation::Blocked { reason, .. } => reason.clone(),
            Observation::Failed { reason, .. } => reason.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    pub text: String,
    pub observations: Vec<Observation>,
}

impl AgentReply {
    pub fn blocked_actions(&self) -> usize {
        self.observations.iter().filter(|o| o.is_blocked()).count()
    }
}

pub struct ScopedAgent {
    role: AgentRole,
    worker: ScopedFsWorker,
    responder: Arc<dyn Responder>,
}

impl std::fmt::Debug for ScopedAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedAgent")
            .field("role", &self.role)
            .field("root", &self.worker.root_id())
            .finish_non_exhaustive()
    }
}

impl ScopedAgent {
    pub fn new(role: AgentRole, worker: ScopedFsWorker, responder: Arc<dyn Responder>) -> Self {
        Self {
            role,
            worker,
            responder,
        }
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn root_id(&self) -> &str {
        self.worker.root_id()
    }

    pub async fn respond(&self, instruction: &str) -> Result<AgentReply, ModelError> {
        let directives = extract_directives(instruction, self.worker.root_id());
        let mut observations = Vec::with_capacity(directives.len());
        for directive in &directives {
            observations.push(self.execute(directive).await);
        }

        let turn = AgentTurn {
            role: self.role,
            instruction,
            observations: &observations,
        };
        let text = self.responder.respond(&turn).await?;
        Ok(AgentReply { text, observations })
    }

    async fn execute(&self, directive: &Directive) -> Observation {
        let path = directive.path().to_string();
        let result = match directive {
            Directive::Read { path: p } => self
                .worker
                .read(p)
                .await
                .map(|content| Observation::Read {
                    path: path.clone(),
                    content,
                }),
            Directive::List { path: p } => {
                self.worker
                    .list(p)
                    .await
                    .map(|entries| Observation::Listed {
                        path: path.clone(),
                        entries,
                    })
            }
            Directive::Write { path: p, content } => self
                .worker
                .write(p, content.as_bytes())
                .await
                .map(|()| Observation::Wrote {
                    path: path.clone(),
                    bytes: content.len(),
                }),
        };

        result.unwrap_or_else(|err| match err {
            WorkerError::SandboxViolation { op, .. } => Observation::Blocked {
                op,
                path,
                reason: err.to_string(),
            },
            WorkerError::Io { op, .. } | WorkerError::Unavailable { op, .. } => {
                Observation::Failed {
                    op,
                    path,
                    reason: err.to_string(),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OfflineResponder;
    use crate::sandbox::VirtualRoot;
    use tempfile::TempDir;

    fn agent(temp: &TempDir) -> ScopedAgent {
        let root = VirtualRoot::bind("public", temp.path()).unwrap();
        ScopedAgent::new(
            AgentRole::CustomerService,
            ScopedFsWorker::new(root),
            Arc::new(OfflineResponder),
        )
    }

    #[tokio::test]
    async fn reads_file_from_own_scope_prefix() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("guide.txt"), "public-doc-content").unwrap();
        let reply = agent(&temp).respond("read_file /public/guide.txt").await.unwrap();
        assert!(reply.text.contains("public-doc-content"));
        assert_eq!(reply.blocked_actions(), 0);
    }

    #[tokio::test]
    async fn blocked_read_does_not_abort_turn() {
        let temp = TempDir::new().unwrap();
        let reply = agent(&temp)
            .respond("read ../secrets.txt then list .")
            .await
            .unwrap();
        assert_eq!(reply.blocked_actions(), 1);
        assert!(matches!(reply.observations[1], Observation::Listed { .. }));
        assert!(reply.text.starts_with("customer-service handled:"));
    }

    #[tokio::test]
    async fn missing_file_is_reported_as_failure() {
        let temp = TempDir::new().unwrap();
        let reply = agent(&temp).respond("cat missing.md").await.unwrap();
        assert!(matches!(
            reply.observations[0],
            Observation::Failed {
                op: WorkerOp::Read,
                ..
            }
        ));
        assert_eq!(reply.blocked_actions(), 0);
    }
}
