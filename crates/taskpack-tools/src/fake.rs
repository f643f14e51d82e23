//! Recording tool runner for tests
//!
//! `RecordingToolRunner` never starts a process. It records every call and
//! leaves behind the files the real tools would produce (compiled `.js`
//! files, installed `node_modules` entries, package files) so pipeline
//! stages can be exercised end to end in a temporary directory.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use taskpack_core::error::{Result, ToolError};
use taskpack_core::ToolKind;
use walkdir::WalkDir;

use crate::traits::{CompileRequest, CompressRequest, Invocation, ToolRunner};

/// One recorded tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Version(ToolKind),
    Compile {
        invocation: Invocation,
        request: CompileRequest,
    },
    Install {
        invocation: Invocation,
        package: Option<PathBuf>,
    },
    RunTests {
        invocation: Invocation,
        specs: Vec<PathBuf>,
    },
    Compress(CompressRequest),
    Pack {
        nuspec: PathBuf,
        out_dir: PathBuf,
    },
    Push {
        package: PathBuf,
        server: String,
        api_key: Option<String>,
    },
    Bundle {
        invocation: Invocation,
        manifest: String,
    },
    Fetch {
        url: String,
        dest: PathBuf,
    },
}

impl ToolCall {
    /// Tool kind that served this call, if any
    pub fn kind(&self) -> Option<ToolKind> {
        match self {
            Self::Version(kind) => Some(*kind),
            Self::Compile { .. } => Some(ToolKind::Compiler),
            Self::Install { .. } => Some(ToolKind::PackageManager),
            Self::RunTests { .. } => Some(ToolKind::TestRunner),
            Self::Compress(_) => Some(ToolKind::Compressor),
            Self::Pack { .. } => Some(ToolKind::Packager),
            Self::Push { .. } => Some(ToolKind::Publisher),
            Self::Bundle { .. } => Some(ToolKind::Bundler),
            Self::Fetch { .. } => None,
        }
    }
}

/// Tool runner that records calls instead of running processes
#[derive(Debug)]
pub struct RecordingToolRunner {
    versions: HashMap<ToolKind, Option<String>>,
    failing: HashSet<ToolKind>,
    payloads: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<ToolCall>>,
}

impl RecordingToolRunner {
    /// Every tool present with a recent version
    pub fn new() -> Self {
        let versions = ToolKind::ALL
            .iter()
            .map(|kind| (*kind, Some("99.0.0".to_string())))
            .collect();
        Self {
            versions,
            failing: HashSet::new(),
            payloads: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Report this version output for a tool
    pub fn with_version(mut self, kind: ToolKind, output: impl Into<String>) -> Self {
        self.versions.insert(kind, Some(output.into()));
        self
    }

    /// Report a tool as not installed
    pub fn without_tool(mut self, kind: ToolKind) -> Self {
        self.versions.insert(kind, None);
        self
    }

    /// Make every invocation of a tool exit non-zero
    pub fn failing(mut self, kind: ToolKind) -> Self {
        self.failing.insert(kind);
        self
    }

    /// Content served for a download URL
    pub fn with_payload(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.payloads.insert(url.into(), bytes);
        self
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Non-probe calls served by one tool
    pub fn calls_to(&self, kind: ToolKind) -> Vec<ToolCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, ToolCall::Version(_)) && c.kind() == Some(kind))
            .collect()
    }

    /// Downloads so far
    pub fn fetches(&self) -> Vec<ToolCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, ToolCall::Fetch { .. }))
            .collect()
    }

    fn record(&self, call: ToolCall) -> Result<()> {
        let kind = call.kind();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        match kind {
            Some(kind) if self.failing.contains(&kind) => Err(ToolError::Failed {
                tool: kind.as_str().to_string(),
                command: format!("{} (recorded)", kind),
                code: Some(1),
            }
            .into()),
            _ => Ok(()),
        }
    }
}

impl Default for RecordingToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRunner for RecordingToolRunner {
    fn version(&self, kind: ToolKind) -> Result<Option<String>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(ToolCall::Version(kind));
        }
        Ok(self.versions.get(&kind).cloned().flatten())
    }

    fn compile(&self, invocation: &Invocation, request: &CompileRequest) -> Result<()> {
        self.record(ToolCall::Compile {
            invocation: invocation.clone(),
            request: request.clone(),
        })?;

        if !request.sources.is_empty() {
            for source in &request.sources {
                if let Some(stem) = source.file_stem() {
                    let target = request.out_dir.join(stem).with_extension("js");
                    write_file(&target, b"// compiled")?;
                }
            }
            return Ok(());
        }

        let root = request.root_dir.as_deref().unwrap_or(&invocation.cwd);
        let walker = WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| e.file_name() != "node_modules");
        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy();
            if !entry.file_type().is_file() || !name.ends_with(".ts") || name.ends_with(".d.ts") {
                continue;
            }
            if let Ok(relative) = path.strip_prefix(root) {
                let target = request.out_dir.join(relative).with_extension("js");
                write_file(&target, b"// compiled")?;
            }
        }
        Ok(())
    }

    fn install(&self, invocation: &Invocation, package: Option<&Path>) -> Result<()> {
        self.record(ToolCall::Install {
            invocation: invocation.clone(),
            package: package.map(Path::to_path_buf),
        })?;

        let modules = invocation.cwd.join("node_modules");
        std::fs::create_dir_all(&modules)?;

        let names: Vec<String> = match package {
            Some(package) => package
                .file_name()
                .map(|n| vec![n.to_string_lossy().to_string()])
                .unwrap_or_default(),
            None => declared_dependencies(&invocation.cwd.join("package.json")),
        };
        for name in names {
            let manifest = format!("{{\"name\": \"{}\"}}", name);
            write_file(&modules.join(&name).join("package.json"), manifest.as_bytes())?;
        }
        Ok(())
    }

    fn run_tests(&self, invocation: &Invocation, specs: &[PathBuf]) -> Result<()> {
        self.record(ToolCall::RunTests {
            invocation: invocation.clone(),
            specs: specs.to_vec(),
        })
    }

    fn compress(&self, _invocation: &Invocation, request: &CompressRequest) -> Result<()> {
        self.record(ToolCall::Compress(request.clone()))?;
        write_file(&request.zip, b"PK")
    }

    fn pack(&self, _invocation: &Invocation, nuspec: &Path, out_dir: &Path) -> Result<()> {
        self.record(ToolCall::Pack {
            nuspec: nuspec.to_path_buf(),
            out_dir: out_dir.to_path_buf(),
        })?;

        let content = std::fs::read_to_string(nuspec)?;
        let id = element_text(&content, "id").unwrap_or("package");
        let version = element_text(&content, "version").unwrap_or("0.0.0");
        write_file(&out_dir.join(format!("{}.{}.nupkg", id, version)), b"PK")
    }

    fn push(
        &self,
        _invocation: &Invocation,
        package: &Path,
        server: &str,
        api_key: Option<&str>,
    ) -> Result<()> {
        self.record(ToolCall::Push {
            package: package.to_path_buf(),
            server: server.to_string(),
            api_key: api_key.map(str::to_string),
        })
    }

    fn bundle(&self, invocation: &Invocation, manifest: &str) -> Result<()> {
        self.record(ToolCall::Bundle {
            invocation: invocation.clone(),
            manifest: manifest.to_string(),
        })
    }

    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        self.record(ToolCall::Fetch {
            url: url.to_string(),
            dest: dest.to_path_buf(),
        })?;
        let bytes = self
            .payloads
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.as_bytes().to_vec());
        write_file(dest, &bytes)
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

fn declared_dependencies(package_json: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(package_json) else {
        return Vec::new();
    };
    serde_json::from_str::<Value>(&content)
        .ok()
        .and_then(|v| v.get("dependencies").and_then(Value::as_object).cloned())
        .map(|deps| deps.keys().cloned().collect())
        .unwrap_or_default()
}

fn element_text<'a>(xml: &'a str, element: &str) -> Option<&'a str> {
    let open = format!("<{}>", element);
    let close = format!("</{}>", element);
    let start = xml.find(&open)? + open.len();
    let end = start + xml[start..].find(&close)?;
    Some(&xml[start..end])
}
