//! Shell command stage.
//!
//! The file's content is written to the command's stdin and the command's
//! stdout becomes the stage output. The command runs once, at end of input.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::{Builder, Handle};
use tracing::debug;

use super::{Chunk, Stage, StageError, TransformFactory, factory};

/// Environment variable carrying the path of the file being transformed.
pub const FILE_ENV: &str = "EXTRACTIFY_FILE";

/// Pipes a file's content through a shell command.
#[derive(Debug, Clone)]
pub struct CmdStage {
  cmd: String,
  env: BTreeMap<String, String>,
  shell: Option<String>,
  file: PathBuf,
  buffer: Chunk,
}

impl CmdStage {
  pub fn new(cmd: impl Into<String>, file: &Path) -> Self {
    Self {
      cmd: cmd.into(),
      env: BTreeMap::new(),
      shell: None,
      file: file.to_path_buf(),
      buffer: Vec::new(),
    }
  }

  pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
    self.env = env;
    self
  }

  pub fn with_shell(mut self, shell: Option<String>) -> Self {
    self.shell = shell;
    self
  }

  /// A factory producing one `CmdStage` per file.
  pub fn factory(cmd: String, env: BTreeMap<String, String>, shell: Option<String>) -> TransformFactory {
    factory(move |file| {
      Box::new(
        CmdStage::new(cmd.clone(), file)
          .with_env(env.clone())
          .with_shell(shell.clone()),
      )
    })
  }

  /// Run the command to completion from synchronous code.
  ///
  /// Inside a runtime this must be called off the async workers (the
  /// extraction tasks run on the blocking pool). Outside one, a
  /// current-thread runtime is started for the call.
  fn run(&self, input: Chunk) -> Result<Chunk, StageError> {
    match Handle::try_current() {
      Ok(handle) => handle.block_on(self.execute(input)),
      Err(_) => Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| StageError::with_source("failed to start a runtime for the command", e))?
        .block_on(self.execute(input)),
    }
  }

  async fn execute(&self, input: Chunk) -> Result<Chunk, StageError> {
    let (shell_cmd, shell_args) = get_shell(self.shell.as_deref());

    debug!(cmd = %self.cmd, file = %self.file.display(), shell = %shell_cmd, "spawning transform command");

    let mut command = Command::new(&shell_cmd);
    command
      .args(&shell_args)
      .arg(&self.cmd)
      .env(FILE_ENV, &self.file)
      .envs(&self.env)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped());

    let mut child = command
      .spawn()
      .map_err(|e| StageError::with_source(format!("failed to spawn `{}`", self.cmd), e))?;

    let stdin = child.stdin.take();
    let feed = async move {
      if let Some(mut stdin) = stdin {
        stdin.write_all(&input).await?;
        stdin.shutdown().await?;
      }
      Ok::<(), std::io::Error>(())
    };

    let (fed, output) = tokio::join!(feed, child.wait_with_output());
    let output = output.map_err(|e| StageError::with_source(format!("failed to wait for `{}`", self.cmd), e))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "command stderr");
      }
      return Err(StageError::new(format!(
        "command `{}` failed with exit code {:?}",
        self.cmd,
        output.status.code()
      )));
    }

    match fed {
      // the command may exit successfully without reading all of its input
      Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(StageError::with_source(
        format!("failed to write input to `{}`", self.cmd),
        e,
      )),
      _ => Ok(output.stdout),
    }
  }
}

impl Stage for CmdStage {
  fn consume(&mut self, chunk: Chunk) -> Result<Vec<Chunk>, StageError> {
    self.buffer.extend(chunk);
    Ok(vec![])
  }

  fn end(&mut self) -> Result<Vec<Chunk>, StageError> {
    let input = std::mem::take(&mut self.buffer);
    Ok(vec![self.run(input)?])
  }
}

/// Get the shell command and argument for the current platform.
///
/// An explicit shell is honored with an argument style guessed from its name.
/// Otherwise `/bin/sh -c` is used on Unix and PowerShell on Windows.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      vec!["-NoProfile".to_string(), "-Command".to_string()]
    } else if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    (
      "powershell.exe".to_string(),
      vec![
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-Command".to_string(),
      ],
    )
  }
}
