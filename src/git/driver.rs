//! Thin wrapper around the `git` binary
//!
//! All repository access goes through subprocess calls so the log parser
//! sees exactly the text git prints. Any non-zero exit is fatal: there is
//! no partial or best-effort mode anywhere in the pipeline.

use anyhow::{bail, Context, Result};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::debug;

/// Fixed `git log` arguments the parser depends on.
///
/// - `--format=commit %H %P` puts the hash and real (unrewritten) parent
///   hashes on every `commit` line.
/// - `--unified=0` means every diff line belongs to a hunk, so hunk headers
///   alone carry the full line accounting.
/// - Histogram is the diff algorithm best suited to source code.
/// - Merges and renames are excluded; a rename shows up as delete + add.
/// - `--diff-filter=AMD` restricts changes to the three kinds the model
///   represents.
pub const GIT_LOG_ARGS: &[&str] = &[
    "--format=commit %H %P",
    "--unified=0",
    "--diff-algorithm=histogram",
    "--no-merges",
    "--no-renames",
    "--diff-filter=AMD",
];

/// Runs git subcommands against one repository.
pub struct GitDriver {
    git_bin: String,
    repo: PathBuf,
    extra_log_args: Vec<String>,
}

impl GitDriver {
    pub fn new(git_bin: impl Into<String>, repo: impl Into<PathBuf>, extra_log_args: Vec<String>) -> Self {
        Self {
            git_bin: git_bin.into(),
            repo: repo.into(),
            extra_log_args,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.git_bin);
        cmd.arg("-C").arg(&self.repo);
        cmd
    }

    /// File content at a fixed revision (`git show rev:filename`).
    pub fn show(&self, filename: &str, rev: &str) -> Result<String> {
        debug!("git show {}:{}", rev, filename);
        let mut cmd = self.command();
        cmd.arg("show").arg(format!("{rev}:{filename}"));
        run_checked(cmd, "git show")
    }

    /// All tracked files at a reference (`git ls-tree -r --name-only`).
    pub fn files(&self, reference: &str) -> Result<Vec<String>> {
        let mut cmd = self.command();
        cmd.args(["ls-tree", "-r", "--name-only", reference]);
        let stdout = run_checked(cmd, "git ls-tree")?;
        Ok(stdout.lines().map(str::to_owned).collect())
    }

    /// The nearest ancestor of `rev` that actually touched `filename`
    /// (`git rev-list -1 rev -- filename`).
    pub fn canonical_rev(&self, filename: &str, rev: &str) -> Result<String> {
        let mut cmd = self.command();
        cmd.args(["rev-list", "-1", rev, "--", filename]);
        let stdout = run_checked(cmd, "git rev-list")?;
        Ok(stdout.trim().to_string())
    }

    /// Spawn `git log` and hand back its stdout as a live text stream.
    ///
    /// The caller parses the stream, then calls [`LogStream::wait`] so a
    /// late git failure is not swallowed.
    pub fn log(&self) -> Result<LogStream> {
        let mut cmd = self.command();
        cmd.arg("log").args(GIT_LOG_ARGS).args(&self.extra_log_args);
        cmd.stdout(Stdio::piped());
        debug!("spawning {:?}", cmd);
        let child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn {} log", self.git_bin))?;
        Ok(LogStream { child })
    }
}

/// A running `git log` child process whose stdout is the parse stream.
pub struct LogStream {
    child: Child,
}

impl LogStream {
    /// Take the child's stdout as a buffered reader. Can only be taken once.
    pub fn take_reader(&mut self) -> Result<BufReader<ChildStdout>> {
        let stdout = self
            .child
            .stdout
            .take()
            .context("git log stdout already taken")?;
        Ok(BufReader::new(stdout))
    }

    /// Reap the child and fail on a non-zero exit.
    pub fn wait(mut self) -> Result<()> {
        let status = self.child.wait().context("failed to wait for git log")?;
        if !status.success() {
            bail!("git log exited with {status}");
        }
        Ok(())
    }
}

/// Check whether a path is inside a git work tree.
pub fn is_git_repo(git_bin: &str, path: &Path) -> bool {
    Command::new(git_bin)
        .arg("-C")
        .arg(path)
        .args(["rev-parse", "--is-inside-work-tree"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn run_checked(mut cmd: Command, what: &str) -> Result<String> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to run {what}"))?;
    if !output.status.success() {
        bail!(
            "{what} failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    String::from_utf8(output.stdout).with_context(|| format!("{what} produced non-UTF-8 output"))
}
