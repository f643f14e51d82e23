//! Stage progress reporting

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Clean,
    Build,
    Test,
    TestLegacy,
    Package,
    Publish,
    Bump,
    Extensions,
    Generate,
}

impl Stage {
    /// Get the stage name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Build => "build",
            Self::Test => "test",
            Self::TestLegacy => "test-legacy",
            Self::Package => "package",
            Self::Publish => "publish",
            Self::Bump => "bump",
            Self::Extensions => "make-extensions",
            Self::Generate => "generate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted while a stage runs
#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    /// A stage is starting
    StageStarted { stage: Stage, tasks: usize },
    /// Work on one task is starting
    TaskStarted { stage: Stage, task: String },
    /// A step within the current task or stage
    Step { message: String },
    /// A shared module is being built
    ModuleStarted { module: String },
    /// Work on one task finished
    TaskCompleted {
        stage: Stage,
        task: String,
        duration: Duration,
    },
    /// The stage finished successfully
    StageCompleted {
        stage: Stage,
        tasks: usize,
        duration: Duration,
    },
}

impl StageEvent {
    /// Shorthand for a step event
    pub fn step(message: impl Into<String>) -> Self {
        Self::Step {
            message: message.into(),
        }
    }
}

/// Trait for reporting stage progress
pub trait StageReporter: Send + Sync {
    /// Handle a stage event
    fn report(&self, event: &StageEvent);
}

/// Reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl StageReporter for TracingReporter {
    fn report(&self, event: &StageEvent) {
        match event {
            StageEvent::StageStarted { stage, tasks } => {
                tracing::info!("Starting {} ({} tasks)", stage, tasks);
            }
            StageEvent::TaskStarted { stage, task } => {
                tracing::info!("{}: {}", stage, task);
            }
            StageEvent::Step { message } => {
                tracing::debug!("> {}", message);
            }
            StageEvent::ModuleStarted { module } => {
                tracing::info!("Building module {}", module);
            }
            StageEvent::TaskCompleted {
                stage,
                task,
                duration,
            } => {
                tracing::info!("{} {} done in {:.1}s", stage, task, duration.as_secs_f64());
            }
            StageEvent::StageCompleted {
                stage,
                tasks,
                duration,
            } => {
                tracing::info!(
                    "{} complete: {} tasks ({:.1}s)",
                    stage,
                    tasks,
                    duration.as_secs_f64()
                );
            }
        }
    }
}

/// Reporter that collects events for later inspection
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<StageEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<StageEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl StageReporter for CollectingReporter {
    fn report(&self, event: &StageEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Registry of stage reporters
pub struct StageReporterRegistry {
    reporters: Vec<Arc<dyn StageReporter>>,
}

impl StageReporterRegistry {
    pub fn new() -> Self {
        Self {
            reporters: vec![Arc::new(TracingReporter)],
        }
    }

    pub fn empty() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn register<R: StageReporter + 'static>(&mut self, reporter: R) {
        self.reporters.push(Arc::new(reporter));
    }

    /// Register a reporter that the caller keeps a handle to
    pub fn register_shared(&mut self, reporter: Arc<dyn StageReporter>) {
        self.reporters.push(reporter);
    }

    pub fn all(&self) -> &[Arc<dyn StageReporter>] {
        &self.reporters
    }

    /// Broadcast an event to all registered reporters
    pub fn broadcast(&self, event: &StageEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}

impl Default for StageReporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_reporter() {
        let reporter = CollectingReporter::default();
        reporter.report(&StageEvent::TaskStarted {
            stage: Stage::Build,
            task: "Alpha".to_string(),
        });
        reporter.report(&StageEvent::step("copying task resources"));

        let events = reporter.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], StageEvent::step("copying task resources"));
    }

    #[test]
    fn test_broadcast() {
        let collecting = Arc::new(CollectingReporter::default());
        let mut registry = StageReporterRegistry::empty();
        registry.register_shared(collecting.clone());
        registry.register(TracingReporter);

        registry.broadcast(&StageEvent::StageStarted {
            stage: Stage::Package,
            tasks: 0,
        });

        assert_eq!(registry.all().len(), 2);
        assert_eq!(collecting.events().len(), 1);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::TestLegacy.to_string(), "test-legacy");
        assert_eq!(Stage::Extensions.as_str(), "make-extensions");
    }
}
