// ABOUTME: Test support utilities.
// ABOUTME: Deterministic doubles for the runtime CLI, tag file, health gate and task spawner.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use updater::config::Config;
use updater::deploy::{Collaborators, Orchestrator, StateStore, Status, TaskSpawner};
use updater::envfile::{TagFileError, TagStore};
use updater::health::{HealthError, HealthGate};
use updater::runtime::{CommandEnv, CommandError, CommandRunner};
use updater::types::ImageTag;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("updater=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A failed command whose output is `output`.
pub fn failure(command: &str, output: &str) -> CommandError {
    CommandError::Failed {
        command: command.to_string(),
        status: "exit status: 1".to_string(),
        output: output.to_string(),
    }
}

/// Docker's wording for a fixed-name clash.
pub fn name_conflict(name: &str) -> CommandError {
    failure(
        "docker compose up -d --no-deps app",
        &format!(
            "Error response from daemon: Conflict. The container name \"/{name}\" is already in use by container \"3f2a\". You have to remove (or rename) that container to be able to reuse that name."
        ),
    )
}

pub fn not_found(name: &str) -> CommandError {
    failure(
        "docker inspect",
        &format!("Error: No such object: {name}"),
    )
}

/// State observed by a double at the moment it was called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub at: String,
    pub status: Status,
    pub progress: u8,
}

/// Shared record of what the state was whenever a double was called.
pub struct Timeline {
    state: Arc<StateStore>,
    observations: Mutex<Vec<Observation>>,
}

impl Timeline {
    pub fn new(state: Arc<StateStore>) -> Arc<Self> {
        Arc::new(Self {
            state,
            observations: Mutex::new(Vec::new()),
        })
    }

    fn record(&self, at: &str) {
        let snapshot = self.state.snapshot();
        self.observations.lock().push(Observation {
            at: at.to_string(),
            status: snapshot.status,
            progress: snapshot.progress,
        });
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.observations.lock().clone()
    }

    /// (status, progress) seen by calls whose label starts with `prefix`.
    pub fn seen_at(&self, prefix: &str) -> Vec<(Status, u8)> {
        self.observations()
            .into_iter()
            .filter(|o| o.at.starts_with(prefix))
            .map(|o| (o.status, o.progress))
            .collect()
    }
}

#[derive(Default)]
struct Watch(Mutex<Option<Arc<Timeline>>>);

impl Watch {
    fn attach(&self, timeline: &Arc<Timeline>) {
        *self.0.lock() = Some(Arc::clone(timeline));
    }

    fn record(&self, at: &str) {
        let timeline = self.0.lock().clone();
        if let Some(timeline) = timeline {
            timeline.record(at);
        }
    }
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub args: Vec<String>,
    pub env: CommandEnv,
}

impl Call {
    pub fn line(&self) -> String {
        self.args.join(" ")
    }
}

type Response = Result<String, CommandError>;

/// Replies by argument prefix; queued replies are consumed in order, the
/// last one for a prefix repeats. Unmatched commands succeed with no output.
#[derive(Default)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<Call>>,
    scripts: Mutex<Vec<(String, VecDeque<Response>)>>,
    watch: Watch,
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue `response` for commands whose joined args start with `prefix`.
    pub fn on(&self, prefix: &str, response: Response) -> &Self {
        let mut scripts = self.scripts.lock();
        match scripts.iter_mut().find(|(p, _)| p == prefix) {
            Some((_, queue)) => queue.push_back(response),
            None => scripts.push((prefix.to_string(), VecDeque::from([response]))),
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.calls().iter().map(Call::line).collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.lines().iter().filter(|l| l.starts_with(prefix)).count()
    }

    fn respond(&self, line: &str) -> Response {
        let mut scripts = self.scripts.lock();
        let Some((_, queue)) = scripts.iter_mut().find(|(p, _)| line.starts_with(p.as_str())) else {
            return Ok(String::new());
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap_or_else(|| Ok(String::new()))
        } else {
            match queue.front() {
                Some(Ok(out)) => Ok(out.clone()),
                Some(Err(e)) => Err(clone_error(e)),
                None => Ok(String::new()),
            }
        }
    }
}

fn clone_error(err: &CommandError) -> CommandError {
    match err {
        CommandError::Failed {
            command,
            status,
            output,
        } => CommandError::Failed {
            command: command.clone(),
            status: status.clone(),
            output: output.clone(),
        },
        CommandError::Spawn { command, source } => CommandError::Spawn {
            command: command.clone(),
            source: std::io::Error::new(source.kind(), source.to_string()),
        },
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, args: &[String], env: &CommandEnv) -> Result<String, CommandError> {
        let call = Call {
            args: args.to_vec(),
            env: env.clone(),
        };
        let line = call.line();
        self.watch.record(&line);
        self.calls.lock().push(call);
        self.respond(&line)
    }
}

/// In-memory tag file that records every write.
#[derive(Default)]
pub struct RecordingTagStore {
    current: Mutex<Option<String>>,
    writes: Mutex<Vec<String>>,
    fail_writes: bool,
    watch: Watch,
}

impl RecordingTagStore {
    pub fn with_tag(tag: &str) -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(Some(tag.to_string())),
            ..Self::default()
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every write fails; reads still return `tag`.
    pub fn failing(tag: &str) -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(Some(tag.to_string())),
            fail_writes: true,
            ..Self::default()
        })
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl TagStore for RecordingTagStore {
    async fn read_tag(&self) -> Result<Option<String>, TagFileError> {
        self.watch.record("read_tag");
        Ok(self.current.lock().clone())
    }

    async fn write_tag(&self, tag: &ImageTag) -> Result<(), TagFileError> {
        self.watch.record(&format!("write_tag {tag}"));
        if self.fail_writes {
            return Err(TagFileError::Write {
                path: "/deploy/.env".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.writes.lock().push(tag.to_string());
        *self.current.lock() = Some(tag.to_string());
        Ok(())
    }
}

/// Health gate answering from a script, then healthy.
#[derive(Default)]
pub struct StubHealth {
    outcomes: Mutex<VecDeque<bool>>,
    deadlines: Mutex<Vec<Duration>>,
    watch: Watch,
}

impl StubHealth {
    pub fn healthy() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn unhealthy() -> Arc<Self> {
        Self::scripted(&[false])
    }

    pub fn scripted(outcomes: &[bool]) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.iter().copied().collect()),
            ..Self::default()
        })
    }

    pub fn deadlines(&self) -> Vec<Duration> {
        self.deadlines.lock().clone()
    }
}

#[async_trait]
impl HealthGate for StubHealth {
    async fn wait_until_healthy(&self, deadline: Duration) -> Result<(), HealthError> {
        self.watch.record("health");
        self.deadlines.lock().push(deadline);
        match self.outcomes.lock().pop_front() {
            Some(false) => Err(HealthError::Timeout(deadline)),
            _ => Ok(()),
        }
    }
}

/// Collects dispatched sequences for the test to drive.
#[derive(Default)]
pub struct QueuedSpawner {
    tasks: Mutex<Vec<BoxFuture<'static, ()>>>,
}

impl QueuedSpawner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Await every queued task in dispatch order.
    pub async fn run_all(&self) {
        loop {
            let next = {
                let mut tasks = self.tasks.lock();
                if tasks.is_empty() {
                    None
                } else {
                    Some(tasks.remove(0))
                }
            };
            match next {
                Some(task) => task.await,
                None => break,
            }
        }
    }
}

impl TaskSpawner for QueuedSpawner {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        self.tasks.lock().push(task);
    }
}

/// An orchestrator wired to doubles, with handles to inspect them.
pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub state: Arc<StateStore>,
    pub runner: Arc<ScriptedRunner>,
    pub tags: Arc<RecordingTagStore>,
    pub health: Arc<StubHealth>,
    pub spawner: Arc<QueuedSpawner>,
    pub timeline: Arc<Timeline>,
}

impl Harness {
    pub fn new(
        config: Config,
        runner: Arc<ScriptedRunner>,
        tags: Arc<RecordingTagStore>,
        health: Arc<StubHealth>,
    ) -> Self {
        Self::with_self_id(config, runner, tags, health, None)
    }

    pub fn with_self_id(
        config: Config,
        runner: Arc<ScriptedRunner>,
        tags: Arc<RecordingTagStore>,
        health: Arc<StubHealth>,
        self_id: Option<&str>,
    ) -> Self {
        init_tracing();
        let state = Arc::new(StateStore::new());
        let spawner = QueuedSpawner::new();
        let timeline = Timeline::new(Arc::clone(&state));
        runner.watch.attach(&timeline);
        tags.watch.attach(&timeline);
        health.watch.attach(&timeline);
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(config),
            Arc::clone(&state),
            Collaborators {
                runner: runner.clone(),
                tags: tags.clone(),
                health: health.clone(),
                spawner: spawner.clone(),
                self_id: self_id.map(str::to_string),
            },
        ));

        Self {
            orchestrator,
            state,
            runner,
            tags,
            health,
            spawner,
            timeline,
        }
    }
}

pub fn tag(value: &str) -> ImageTag {
    ImageTag::new(value).unwrap()
}
