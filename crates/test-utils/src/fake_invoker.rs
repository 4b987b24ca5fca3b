use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use eclair_tasks::exec::{
    LogPaths, OperationHandle, OperationInvoker, OperationRequest, ProcessExit, RawResult,
};

/// What a fake operation does once started.
#[derive(Debug, Clone)]
pub enum FakeBehaviour {
    /// Exit after `polls` calls to `try_wait`, yielding `result`.
    CompleteAfter { polls: u64, result: RawResult },
    /// Run until terminated.
    NeverComplete,
    /// `start` itself fails with this message.
    FailToLaunch(String),
    /// `try_wait` returns an error on the given poll.
    FailOnPoll { poll: u64 },
    /// `try_wait` panics on the given poll.
    PanicOnPoll { poll: u64 },
    /// Completion is driven by the test through the control.
    Manual(FakeProcessControl),
}

/// Test-side control of a [`FakeBehaviour::Manual`] process.
#[derive(Debug, Clone, Default)]
pub struct FakeProcessControl {
    result: Arc<Mutex<Option<RawResult>>>,
}

impl FakeProcessControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the process exit with `result`; the next poll observes it.
    pub fn complete(&self, result: RawResult) {
        *self.result.lock().unwrap() = Some(result);
    }

    fn finished(&self) -> Option<RawResult> {
        self.result.lock().unwrap().clone()
    }
}

/// An invoker that never spawns anything.
///
/// - records every request it receives
/// - counts terminate calls across all its processes
/// - hands out behaviours in order, falling back to a default
#[derive(Debug, Clone)]
pub struct FakeInvoker {
    queued: Arc<Mutex<VecDeque<FakeBehaviour>>>,
    default: FakeBehaviour,
    requests: Arc<Mutex<Vec<OperationRequest>>>,
    terminations: Arc<AtomicUsize>,
}

impl FakeInvoker {
    pub fn new(default: FakeBehaviour) -> Self {
        Self {
            queued: Arc::new(Mutex::new(VecDeque::new())),
            default,
            requests: Arc::new(Mutex::new(Vec::new())),
            terminations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every operation succeeds after `polls` polls with `result`.
    pub fn completing(polls: u64, result: RawResult) -> Self {
        Self::new(FakeBehaviour::CompleteAfter { polls, result })
    }

    /// Use `behaviour` for the next started operation.
    pub fn push(&self, behaviour: FakeBehaviour) -> &Self {
        self.queued.lock().unwrap().push_back(behaviour);
        self
    }

    pub fn requests(&self) -> Vec<OperationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

impl OperationInvoker for FakeInvoker {
    fn start(&self, request: &OperationRequest) -> Result<Box<dyn OperationHandle>> {
        self.requests.lock().unwrap().push(request.clone());
        let behaviour = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.clone());

        if let FakeBehaviour::FailToLaunch(message) = &behaviour {
            return Err(anyhow!("{message}"));
        }

        let name = format!("{}_{}", request.kind, request.task_id);
        Ok(Box::new(FakeProcess {
            behaviour,
            polls: 0,
            exit: None,
            paths: LogPaths {
                stdout: PathBuf::from(format!("fake/{name}_stdout.log")),
                stderr: PathBuf::from(format!("fake/{name}_stderr.log")),
            },
            terminations: Arc::clone(&self.terminations),
        }))
    }
}

#[derive(Debug)]
struct FakeProcess {
    behaviour: FakeBehaviour,
    polls: u64,
    exit: Option<ProcessExit>,
    paths: LogPaths,
    terminations: Arc<AtomicUsize>,
}

impl FakeProcess {
    fn result(&self) -> RawResult {
        match &self.behaviour {
            FakeBehaviour::CompleteAfter { result, .. } => result.clone(),
            FakeBehaviour::Manual(control) => control.finished().unwrap_or_default(),
            _ => RawResult::default(),
        }
    }
}

impl OperationHandle for FakeProcess {
    fn pid(&self) -> Option<u32> {
        None
    }

    fn log_paths(&self) -> &LogPaths {
        &self.paths
    }

    fn try_wait(&mut self) -> Result<Option<ProcessExit>> {
        if self.exit.is_some() {
            return Ok(self.exit);
        }
        self.polls += 1;
        self.exit = match &self.behaviour {
            FakeBehaviour::CompleteAfter { polls, result } if self.polls >= *polls => {
                Some(ProcessExit {
                    code: result.exit_code,
                })
            }
            FakeBehaviour::Manual(control) => control.finished().map(|r| ProcessExit {
                code: r.exit_code,
            }),
            FakeBehaviour::FailOnPoll { poll } if self.polls >= *poll => {
                return Err(anyhow!("fake poll failure"));
            }
            FakeBehaviour::PanicOnPoll { poll } if self.polls >= *poll => {
                panic!("fake process panicked on poll {poll}");
            }
            _ => None,
        };
        Ok(self.exit)
    }

    fn terminate(&mut self) -> Pin<Box<dyn Future<Output = Result<ProcessExit>> + Send + '_>> {
        Box::pin(async move {
            if let Some(exit) = self.exit {
                return Ok(exit);
            }
            self.terminations.fetch_add(1, Ordering::SeqCst);
            let exit = ProcessExit { code: None };
            self.exit = Some(exit);
            Ok(exit)
        })
    }

    fn collect(&mut self, exit: ProcessExit) -> Result<RawResult> {
        Ok(RawResult {
            exit_code: exit.code,
            ..self.result()
        })
    }
}
