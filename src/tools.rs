use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::ConvertError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn into_success(self, tool: &str) -> Result<Vec<u8>, ConvertError> {
        if self.success() {
            return Ok(self.stdout);
        }
        let stderr = String::from_utf8_lossy(&self.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            match self.status {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".to_string(),
            }
        } else {
            stderr
        };
        Err(ConvertError::ToolFailed {
            tool: tool.to_string(),
            message,
        })
    }
}

pub trait ExternalTool: Send + Sync {
    fn name(&self) -> &str;
    fn invoke(&self, input: &[u8], args: &[String]) -> Result<ToolOutput, ConvertError>;
}

#[derive(Debug, Clone)]
pub struct SystemTool {
    name: String,
    program: Option<PathBuf>,
    timeout: Duration,
}

impl SystemTool {
    pub fn new(command: &str, timeout: Duration) -> Self {
        let as_path = Path::new(command);
        let program = if as_path.components().count() > 1 {
            as_path.exists().then(|| as_path.to_path_buf())
        } else {
            find_in_path(command)
        };
        Self {
            name: command.to_string(),
            program,
            timeout,
        }
    }

    pub fn is_available(&self) -> bool {
        self.program.is_some()
    }
}

impl ExternalTool for SystemTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, input: &[u8], args: &[String]) -> Result<ToolOutput, ConvertError> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| ConvertError::MissingTool(self.name.clone()))?;
        tracing::debug!(tool = %self.name, ?args, "invoking tool");

        let spawn_error = |err: std::io::Error| ConvertError::ToolFailed {
            tool: self.name.clone(),
            message: err.to_string(),
        };
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let mut stdin = child.stdin.take();
        let payload = input.to_vec();
        let writer = thread::spawn(move || {
            if let Some(stdin) = stdin.as_mut() {
                // A tool that ignores stdin closes the pipe early; that is not an error.
                let _ = stdin.write_all(&payload);
            }
        });
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let started = Instant::now();
        let status = loop {
            match child.try_wait().map_err(spawn_error)? {
                Some(status) => break status,
                None if started.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ConvertError::ToolTimeout {
                        tool: self.name.clone(),
                        seconds: self.timeout.as_secs(),
                    });
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        let _ = writer.join();
        let stdout = stdout_reader.map(join_reader).unwrap_or_default();
        let stderr = stderr_reader.map(join_reader).unwrap_or_default();

        Ok(ToolOutput {
            status: status.code(),
            stdout,
            stderr,
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = source.read_to_end(&mut buffer);
        buffer
    })
}

fn join_reader(handle: thread::JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn failed_output_carries_stderr() {
        let output = ToolOutput {
            status: Some(2),
            stdout: Vec::new(),
            stderr: b"bad input\n".to_vec(),
        };
        let err = output.into_success("pvjs").unwrap_err();
        assert_matches!(err, ConvertError::ToolFailed { tool, message } if tool == "pvjs" && message == "bad input");
    }

    #[test]
    fn missing_program_is_reported_on_invoke() {
        let tool = SystemTool::new("definitely-not-a-real-tool-4542", Duration::from_secs(1));
        assert!(!tool.is_available());
        let err = tool.invoke(b"", &[]).unwrap_err();
        assert_matches!(err, ConvertError::MissingTool(_));
    }
}
