//! Shared state of one pipeline run

use std::path::PathBuf;
use std::time::Instant;

use taskpack_core::config::Config;
use taskpack_core::error::Result;
use taskpack_core::options::MakeOptions;
use taskpack_core::{resolve_tasks, Layout, ToolKind};
use taskpack_tools::{ensure_tool, ToolRunner, ToolStatus};

use crate::reporter::{Stage, StageEvent, StageReporterRegistry};

/// Everything a stage needs: where things are, how tools are configured,
/// who runs them and who hears about progress
pub struct PipelineContext<'a> {
    pub layout: Layout,
    pub config: Config,
    pub runner: &'a dyn ToolRunner,
    pub reporters: StageReporterRegistry,
}

impl<'a> PipelineContext<'a> {
    /// Create a context for the repository at `root`
    pub fn new(root: impl Into<PathBuf>, config: Config, runner: &'a dyn ToolRunner) -> Self {
        let layout = Layout::new(root, &config.paths);
        Self {
            layout,
            config,
            runner,
            reporters: StageReporterRegistry::new(),
        }
    }

    /// Replace the reporter registry
    pub fn with_reporters(mut self, reporters: StageReporterRegistry) -> Self {
        self.reporters = reporters;
        self
    }

    /// Check a tool against its configured requirement
    pub fn ensure(&self, kind: ToolKind) -> Result<ToolStatus> {
        ensure_tool(self.runner, kind, self.config.tools.get(kind))
    }

    /// Resolve the task list for a `--task` pattern
    pub fn resolve(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        resolve_tasks(&self.layout, pattern)
    }

    /// The options file, or defaults when it does not exist
    pub fn options_or_default(&self) -> Result<MakeOptions> {
        if self.layout.options_file.is_file() {
            MakeOptions::load(&self.layout.options_file)
        } else {
            Ok(MakeOptions::default())
        }
    }

    pub fn report(&self, event: StageEvent) {
        self.reporters.broadcast(&event);
    }

    pub fn step(&self, message: impl Into<String>) {
        self.report(StageEvent::step(message));
    }

    /// Start timing a stage over `tasks` tasks
    pub fn start_stage(&self, stage: Stage, tasks: usize) -> StageTimer {
        self.report(StageEvent::StageStarted { stage, tasks });
        StageTimer {
            stage,
            tasks,
            started: Instant::now(),
        }
    }

    /// Run `work` for one task between start and completion events
    pub fn run_task<T>(
        &self,
        stage: Stage,
        task: &str,
        work: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let started = Instant::now();
        self.report(StageEvent::TaskStarted {
            stage,
            task: task.to_string(),
        });
        let value = work()?;
        self.report(StageEvent::TaskCompleted {
            stage,
            task: task.to_string(),
            duration: started.elapsed(),
        });
        Ok(value)
    }
}

/// Running stage; `finish` reports completion
#[derive(Debug)]
pub struct StageTimer {
    stage: Stage,
    tasks: usize,
    started: Instant,
}

impl StageTimer {
    pub fn finish(self, ctx: &PipelineContext<'_>) {
        ctx.report(StageEvent::StageCompleted {
            stage: self.stage,
            tasks: self.tasks,
            duration: self.started.elapsed(),
        });
    }
}
