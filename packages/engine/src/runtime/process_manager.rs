// packages/engine/src/runtime/process_manager.rs
//! Process manager for running runtime client commands
//!
//! Every call into the container runtime is a short-lived client process
//! (`docker run`, `docker inspect`, ...). The manager resolves executables
//! on `PATH`, caches them, and bounds every invocation with a deadline.

use crate::utils::errors::{EngineError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, trace};

/// A program plus its discrete argument tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit status was zero
    pub success: bool,
    
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    
    pub stdout: String,
    pub stderr: String,
}

/// Runs client commands with a deadline
pub struct ProcessManager {
    /// Paths to executables (cached)
    executable_paths: Mutex<HashMap<String, PathBuf>>,
    
    /// Default per-command deadline
    timeout: Duration,
}

impl ProcessManager {
    /// Create a new process manager
    pub fn new(timeout: Duration) -> Self {
        Self {
            executable_paths: Mutex::new(HashMap::new()),
            timeout,
        }
    }
    
    /// Find executable on `PATH`
    fn find_executable(&self, command: &str) -> Result<PathBuf> {
        // Check cache first
        if let Some(path) = self.executable_paths.lock().get(command) {
            return Ok(path.clone());
        }
        
        match which::which(command) {
            Ok(path) => {
                info!("Found {} at {:?}", command, path);
                self.executable_paths
                    .lock()
                    .insert(command.to_string(), path.clone());
                Ok(path)
            }
            Err(e) => Err(EngineError::RuntimeUnavailable(format!(
                "Executable '{}' not found in PATH: {}",
                command, e
            ))),
        }
    }
    
    /// Run with the default deadline; a non-zero exit is not an error
    pub async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.run_with_timeout(invocation, self.timeout).await
    }
    
    /// Run with the default deadline; a non-zero exit is `CommandFailed`
    pub async fn run_checked(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let output = self.run(invocation).await?;
        
        if !output.success {
            return Err(EngineError::CommandFailed {
                command: invocation.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        
        Ok(output)
    }
    
    /// Run with an explicit deadline.
    ///
    /// The child is killed if the deadline passes.
    pub async fn run_with_timeout(
        &self,
        invocation: &Invocation,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let executable = self.find_executable(&invocation.program)?;
        
        trace!("Running: {}", invocation);
        
        let mut command = Command::new(executable);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        
        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| EngineError::CommandTimeout {
                command: invocation.to_string(),
                timeout,
            })??;
        
        let result = CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        
        debug!(
            "'{}' exited with {:?}",
            invocation.program,
            result.code
        );
        
        Ok(result)
    }
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_invocation_display() {
        let invocation = Invocation::new("docker", ["inspect", "--format", "{{.State.Status}}", "frieren"]);
        assert_eq!(invocation.to_string(), "docker inspect --format {{.State.Status}} frieren");
    }
    
    #[tokio::test]
    async fn test_run_captures_stdout() {
        let manager = ProcessManager::default();
        let output = manager
            .run(&Invocation::new("echo", ["hello", "world"]))
            .await
            .unwrap();
        
        assert!(output.success);
        assert_eq!(output.code, Some(0));
        assert_eq!(output.stdout.trim(), "hello world");
    }
    
    #[tokio::test]
    async fn test_non_zero_exit() {
        let manager = ProcessManager::default();
        let invocation = Invocation::new("sh", ["-c", "echo boom >&2; exit 3"]);
        
        let output = manager.run(&invocation).await.unwrap();
        assert!(!output.success);
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stderr.trim(), "boom");
        
        match manager.run_checked(&invocation).await {
            Err(EngineError::CommandFailed { stderr, .. }) => assert_eq!(stderr, "boom"),
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }
    
    #[tokio::test]
    async fn test_timeout() {
        let manager = ProcessManager::new(Duration::from_millis(100));
        let result = manager.run(&Invocation::new("sleep", ["5"])).await;
        
        assert!(matches!(result, Err(EngineError::CommandTimeout { .. })));
    }
    
    #[tokio::test]
    async fn test_missing_executable() {
        let manager = ProcessManager::default();
        let result = manager
            .run(&Invocation::new("definitely-not-a-real-binary-4f2a", ["--version"]))
            .await;
        
        assert!(matches!(result, Err(EngineError::RuntimeUnavailable(_))));
    }
}
