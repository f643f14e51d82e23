//! Stage banners on the terminal

use console::style;
use taskpack_tasks::{Stage, StageEvent, StageReporter};

use super::{task as task_name, DONE, STARTED};

/// Prints stage and task banners; steps only when verbose
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Line for an event, or `None` when it is not shown
    pub fn render(&self, event: &StageEvent) -> Option<String> {
        match event {
            StageEvent::StageStarted { stage, tasks } => Some(match tasks {
                0 => format!("{}", style(stage).bold()),
                1 => format!("{} {}", style(stage).bold(), style("(1 task)").dim()),
                n => format!("{} {}", style(stage).bold(), style(format!("({} tasks)", n)).dim()),
            }),
            StageEvent::TaskStarted { stage, task } => Some(format!(
                "{} {}: {}",
                style(STARTED).blue(),
                task_verb(*stage),
                task_name(task)
            )),
            StageEvent::Step { message } if self.verbose => {
                Some(format!("  {} {}", style(">").dim(), style(message).dim()))
            }
            StageEvent::Step { .. } => None,
            StageEvent::ModuleStarted { module } => Some(format!(
                "  {} module {}",
                style(STARTED).blue(),
                task_name(module)
            )),
            StageEvent::TaskCompleted { task, duration, .. } => Some(format!(
                "{} {} {}",
                style(DONE).green().bold(),
                task,
                style(format!("({:.1}s)", duration.as_secs_f64())).dim()
            )),
            StageEvent::StageCompleted { stage, duration, .. } => Some(format!(
                "{} {} completed {}",
                style(DONE).green().bold(),
                stage,
                style(format!("in {:.1}s", duration.as_secs_f64())).dim()
            )),
        }
    }
}

fn task_verb(stage: Stage) -> &'static str {
    match stage {
        Stage::Clean => "Cleaning",
        Stage::Build => "Building",
        Stage::Test | Stage::TestLegacy => "Testing",
        Stage::Package => "Packaging",
        Stage::Publish => "Publishing",
        Stage::Bump => "Bumping",
        Stage::Extensions => "Creating extension",
        Stage::Generate => "Generating",
    }
}

impl StageReporter for ConsoleReporter {
    fn report(&self, event: &StageEvent) {
        if let Some(line) = self.render(event) {
            println!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_steps_hidden_unless_verbose() {
        let step = StageEvent::step("copying resources");
        assert!(ConsoleReporter::new(false).render(&step).is_none());
        let line = ConsoleReporter::new(true).render(&step).unwrap();
        assert!(console::strip_ansi_codes(&line).contains("copying resources"));
    }

    #[test]
    fn test_task_banner() {
        let reporter = ConsoleReporter::default();
        let line = reporter
            .render(&StageEvent::TaskStarted {
                stage: Stage::Build,
                task: "Alpha".to_string(),
            })
            .unwrap();
        assert_eq!(console::strip_ansi_codes(&line), "→ Building: Alpha");

        let done = reporter
            .render(&StageEvent::TaskCompleted {
                stage: Stage::Build,
                task: "Alpha".to_string(),
                duration: Duration::from_millis(1500),
            })
            .unwrap();
        assert_eq!(console::strip_ansi_codes(&done), "✓ Alpha (1.5s)");
    }
}
