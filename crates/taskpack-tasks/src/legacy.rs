//! Legacy test stage
//!
//! Copies the built tasks into an isolated `_test` tree, compiles the
//! repository `Tests/` project next to them and runs every discovered
//! `_suite.js` through a single wrapper spec. The wrapper counts failed
//! tests itself and reports them with build-log commands, since the runner
//! does not always exit non-zero when one of several suites fails.

use std::path::{Path, PathBuf};

use taskpack_core::error::{NotFoundError, Result};
use taskpack_core::fsutil::{
    copy_dir_recursive, copy_matching, copy_matching_recursive, find_paths, remove_dir_if_exists,
    CopyFilter,
};
use taskpack_core::ToolKind;
use taskpack_tools::{CompileRequest, Invocation};
use tracing::info;

use crate::context::PipelineContext;
use crate::reporter::Stage;

/// Environment variable naming the per-run temp directory for suites
pub const TEST_TEMP_VAR: &str = "TASK_TEST_TEMP";

const WRAPPER_FILE: &str = "testsSpec.js";

/// Legacy test stage options
#[derive(Debug, Clone, Default)]
pub struct LegacyTestOptions {
    /// Suite path under the compiled tests; defaults to every `L0` suite
    pub suite: Option<String>,
}

/// Run the legacy suites; returns the suite files included in the wrapper
pub fn run_legacy_tests(ctx: &PipelineContext<'_>, options: &LegacyTestOptions) -> Result<Vec<PathBuf>> {
    ctx.ensure(ToolKind::Compiler)?;
    ctx.ensure(ToolKind::TestRunner)?;

    let layout = &ctx.layout;
    let timer = ctx.start_stage(Stage::TestLegacy, 0);

    ctx.step("removing test tree");
    remove_dir_if_exists(&layout.test_root)?;

    if !layout.build_dir.is_dir() {
        return Err(NotFoundError::Path(layout.build_dir.clone()).into());
    }
    ctx.step("copying tasks");
    copy_dir_recursive(&layout.build_dir, &layout.test_tasks_dir())?;

    let test_out = layout.test_output_dir();
    ctx.step("compiling tests");
    ctx.runner.compile(
        &Invocation::in_dir(&layout.tests_dir),
        &CompileRequest::project(&layout.tests_dir, &test_out),
    )?;

    ctx.step("copying L0 resources");
    let l0 = CopyFilter::new(&strings(&["data", "*.ps1", "*.json"]))?;
    copy_matching_recursive(&layout.tests_dir.join("L0"), &test_out.join("L0"), &l0)?;

    ctx.step("copying lib resources");
    let lib = CopyFilter::new(&strings(&["*.ps1", "*.psm1", "package.json"]))?;
    copy_matching(&layout.tests_dir.join("lib"), &test_out.join("lib"), &lib)?;

    let temp_dir = test_out.join("Temp");
    std::fs::create_dir_all(&temp_dir)?;

    let suite = options.suite.as_deref().unwrap_or("L0/**");
    let pattern = test_out.join(suite).join("_suite.js").to_string_lossy().to_string();
    let suites = find_paths(&pattern)?;
    if suites.is_empty() {
        return Err(NotFoundError::NoTestSpecs {
            patterns: vec![pattern],
        }
        .into());
    }

    let wrapper = test_out.join(WRAPPER_FILE);
    std::fs::write(&wrapper, wrapper_spec(&suites))?;
    info!(suites = suites.len(), wrapper = %wrapper.display(), "running legacy suites");

    let invocation = Invocation::in_dir(&layout.root)
        .with_env(TEST_TEMP_VAR, temp_dir.to_string_lossy().to_string());
    ctx.runner.run_tests(&invocation, &[wrapper])?;

    timer.finish(ctx);
    Ok(suites)
}

/// Wrapper suite that requires every suite and reports the failed count
fn wrapper_spec(suites: &[PathBuf]) -> String {
    let mut contents = String::from(
        r###"var __suite_to_run;
describe('Legacy L0', function (__outer_done) {
    after(function (done) {
        var failedCount = 0;
        var suites = [ this._runnable.parent ];
        while (suites.length) {
            var s = suites.pop();
            suites = suites.concat(s.suites);
            failedCount += s.tests.filter(function (test) { return test.state != "passed" }).length;
        }

        if (failedCount && process.env.TF_BUILD) {
            console.log("##vso[task.logissue type=error]" + failedCount + " test(s) failed");
            console.log("##vso[task.complete result=Failed]" + failedCount + " test(s) failed");
        }

        done();
    });
"###,
    );
    for suite in suites {
        contents.push_str(&format!(
            "    __suite_to_run = require({});\n",
            js_string(suite)
        ));
    }
    contents.push_str("});\n");
    contents
}

fn js_string(path: &Path) -> String {
    serde_json::Value::String(path.to_string_lossy().to_string()).to_string()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{context, write};
    use taskpack_core::TaskpackError;
    use taskpack_tools::{RecordingToolRunner, ToolCall};
    use tempfile::TempDir;

    fn repo(root: &Path) {
        write(&root.join("_build/Tasks/Alpha/alpha.js"), "");
        write(&root.join("Tests/L0/Alpha/_suite.ts"), "");
        write(&root.join("Tests/L0/Alpha/run.ps1"), "");
        write(&root.join("Tests/L0/Alpha/data/input.txt"), "");
        write(&root.join("Tests/L0/Alpha/.hidden.json"), "{}");
        write(&root.join("Tests/L0/Beta/_suite.ts"), "");
        write(&root.join("Tests/lib/package.json"), "{}");
    }

    #[test]
    fn test_wrapper_requires_every_suite() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        repo(root);

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        let suites = run_legacy_tests(&ctx, &LegacyTestOptions::default()).unwrap();
        assert_eq!(suites.len(), 2);

        let test_out = root.join("_test/Tests");
        assert!(root.join("_test/Tasks/Alpha/alpha.js").is_file());
        assert!(test_out.join("L0/Alpha/run.ps1").is_file());
        assert!(test_out.join("L0/Alpha/data/input.txt").is_file());
        assert!(test_out.join("L0/Alpha/.hidden.json").is_file());
        assert!(test_out.join("lib/package.json").is_file());
        assert!(test_out.join("Temp").is_dir());

        let wrapper = std::fs::read_to_string(test_out.join("testsSpec.js")).unwrap();
        assert_eq!(wrapper.matches("__suite_to_run = require(").count(), 2);
        assert!(wrapper.contains("test(s) failed"));

        let runs = runner.calls_to(ToolKind::TestRunner);
        assert_eq!(runs.len(), 1);
        match &runs[0] {
            ToolCall::RunTests { invocation, specs } => {
                assert_eq!(specs, &vec![test_out.join("testsSpec.js")]);
                assert_eq!(invocation.env[0].0, TEST_TEMP_VAR);
                assert!(invocation.env[0].1.ends_with("Temp"));
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[test]
    fn test_suite_filter() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        repo(root);

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        let options = LegacyTestOptions {
            suite: Some("L0/Beta".to_string()),
        };
        let suites = run_legacy_tests(&ctx, &options).unwrap();
        assert_eq!(suites, vec![root.join("_test/Tests/L0/Beta/_suite.js")]);
    }

    #[test]
    fn test_no_suites_names_pattern() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        repo(root);

        let runner = RecordingToolRunner::new();
        let (ctx, _) = context(root, &runner);
        let options = LegacyTestOptions {
            suite: Some("L0/Nothing".to_string()),
        };
        let err = run_legacy_tests(&ctx, &options).unwrap_err();
        assert!(matches!(err, TaskpackError::NotFound(NotFoundError::NoTestSpecs { .. })));
        assert!(err.to_string().contains("_suite.js"));
    }

    #[test]
    fn test_wrapper_reports_failures_to_the_agent() {
        let wrapper = wrapper_spec(&[PathBuf::from("/t/L0/Alpha/_suite.js")]);
        assert!(wrapper.contains("console.log(\"##vso[task.complete result=Failed]\""));
        let require = wrapper.find("__suite_to_run = require(").unwrap();
        assert!(wrapper.find("after(function (done)").unwrap() < require);
    }

    #[test]
    fn test_js_string_escapes() {
        assert_eq!(js_string(Path::new("C:\\t\\_suite.js")), r#""C:\\t\\_suite.js""#);
    }
}
