// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed project fixture plus scripted
// stand-ins for the process executor and the interactive prompter, so the
// pipeline can run end to end without real tar, pigz, git, or a terminal.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use debpack::config;
use debpack::error::BuildError;
use debpack::exec::{ExecResult, Executor};
use debpack::prompt::Prompter;

/// An isolated package source tree backed by a [`tempfile::TempDir`].
///
/// The project directory sits one level below the temp root so its
/// basename, which becomes the package name, is chosen by the test rather
/// than randomized.
pub struct ProjectFixture {
    _tmp: tempfile::TempDir,
    root: PathBuf,
}

impl ProjectFixture {
    /// Create a project named `package` with an empty configuration
    /// directory.
    pub fn new(package: &str) -> Self {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let root = tmp.path().join(package);
        fs::create_dir_all(root.join(config::PACK_DIR)).expect("create config dir");
        Self { _tmp: tmp, root }
    }

    /// Path to the project root.
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Write the manifest file.
    pub fn with_manifest(self, manifest: &serde_json::Value) -> Self {
        let text = serde_json::to_string_pretty(manifest).expect("serialize manifest");
        fs::write(config::manifest_path(&self.root), text).expect("write manifest");
        self
    }

    /// Write a file below the project root, creating parent directories.
    pub fn with_source_file(self, rel: &str, contents: &str) -> Self {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(path, contents).expect("write source file");
        self
    }

    /// Write a maintainer script into the hooks directory.
    pub fn with_hook_script(self, name: &str, contents: &str) -> Self {
        let hooks = config::hooks_dir(&self.root);
        fs::create_dir_all(&hooks).expect("create hooks dir");
        fs::write(hooks.join(name), contents).expect("write hook script");
        self
    }

    /// Mark the project as a git repository.
    pub fn with_git_dir(self) -> Self {
        fs::create_dir_all(self.root.join(".git")).expect("create git dir");
        self
    }

    /// Names currently present in the project root, sorted.
    pub fn root_listing(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.root)
            .expect("list project root")
            .map(|entry| {
                entry
                    .expect("read dir entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }
}

/// Scripted [`Executor`] for integration tests.
///
/// Invocations are recorded as rendered command lines and answered from an
/// ordered `(success, stdout)` script; with no script left, calls succeed
/// with empty output. A `tar` run additionally materializes its `-cf`
/// output file in the working directory, which is all the assembly step
/// needs to proceed.
#[derive(Default)]
pub struct StubExecutor {
    responses: Mutex<VecDeque<(bool, String)>>,
    calls: Mutex<Vec<String>>,
    missing_programs: Vec<String>,
}

impl StubExecutor {
    /// An executor whose every call succeeds with empty output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a `(success, stdout)` response for the next invocation.
    pub fn with_response(self, success: bool, stdout: &str) -> Self {
        self.responses
            .lock()
            .expect("lock responses")
            .push_back((success, stdout.to_string()));
        self
    }

    /// Report `program` as absent from PATH.
    pub fn without_program(mut self, program: &str) -> Self {
        self.missing_programs.push(program.to_string());
        self
    }

    /// Rendered command lines of every invocation so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock calls").clone()
    }

    fn record(&self, program: &str, args: &[&str]) {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.lock().expect("lock calls").push(line);
    }

    fn next(&self, program: &str) -> Result<ExecResult, BuildError> {
        let scripted = self.responses.lock().expect("lock responses").pop_front();
        let (success, stdout) = scripted.unwrap_or((true, String::new()));
        if success {
            Ok(ExecResult {
                stdout,
                stderr: String::new(),
                success: true,
                code: Some(0),
            })
        } else {
            Err(BuildError::CommandFailed {
                program: program.to_string(),
                code: 1,
                stderr: stdout,
            })
        }
    }
}

impl Executor for StubExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult, BuildError> {
        self.record(program, args);
        self.next(program)
    }

    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult, BuildError> {
        self.record(program, args);
        if program == "tar" {
            materialize_tar_output(dir, args);
        }
        self.next(program)
    }

    fn run_in_with_env(
        &self,
        _dir: &Path,
        program: &str,
        args: &[&str],
        _env: &[(&str, &str)],
    ) -> Result<ExecResult, BuildError> {
        self.record(program, args);
        self.next(program)
    }

    fn which(&self, program: &str) -> bool {
        !self.missing_programs.iter().any(|missing| missing == program)
    }
}

/// Create the `-cf` target so the staging root looks like tar ran.
fn materialize_tar_output(dir: &Path, args: &[&str]) {
    let Some(pos) = args.iter().position(|arg| *arg == "-cf") else {
        return;
    };
    if let Some(name) = args.get(pos + 1) {
        fs::write(dir.join(name), b"stub tarball").expect("materialize tar output");
    }
}

/// Scripted [`Prompter`] replaying canned answers.
#[derive(Default)]
pub struct CannedPrompter {
    answers: VecDeque<String>,
    confirms: VecDeque<bool>,
    /// Every prompt text shown, in order.
    pub prompts: Vec<String>,
}

impl CannedPrompter {
    /// A prompter with nothing queued; unanswered prompts yield empty
    /// text and declined confirmations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a multiline answer.
    pub fn with_answer(mut self, answer: &str) -> Self {
        self.answers.push_back(answer.to_string());
        self
    }

    /// Queue a confirmation answer.
    pub fn with_confirm(mut self, yes: bool) -> Self {
        self.confirms.push_back(yes);
        self
    }
}

impl Prompter for CannedPrompter {
    fn read_multiline(&mut self, prompt: &str) -> std::io::Result<String> {
        self.prompts.push(prompt.to_string());
        Ok(self.answers.pop_front().unwrap_or_default())
    }

    fn confirm(&mut self, prompt: &str) -> std::io::Result<bool> {
        self.prompts.push(prompt.to_string());
        Ok(self.confirms.pop_front().unwrap_or(false))
    }
}
