//! CoffeeScript support through an external compiler process.
//!
//! Source goes to the child's stdin and JavaScript is read back from stdout.
//! Any program that follows that contract can stand in for `coffee`.

use getsmart_api::{Compiler, TransformError, TransformResult};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

pub const DEFAULT_PROGRAM: &str = "coffee";
pub const DEFAULT_ARGS: &[&str] = &["--stdio", "--print"];

#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
    extension: String,
}

impl Default for CommandCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM, DEFAULT_ARGS)
    }
}

impl CommandCompiler {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            extension: "coffee".to_string(),
        }
    }

    /// `coffee --stdio --print`
    pub fn coffee() -> Self {
        Self::default()
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Compiler for CommandCompiler {
    fn extension(&self) -> &str {
        &self.extension
    }

    fn compile(&self, source: &str) -> TransformResult<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TransformError::Compile(format!("failed to run {}: {}", self.program, e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransformError::Compile("compiler stdin unavailable".to_string()))?;

        // Feed stdin from a separate thread so a full stdout pipe cannot deadlock us
        let output = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(source.as_bytes()));
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output = match output {
            (_, Err(e)) => {
                return Err(TransformError::Compile(format!(
                    "{} did not finish: {}",
                    self.program, e
                )));
            }
            (Err(_), _) => {
                return Err(TransformError::Compile(
                    "compiler stdin writer panicked".to_string(),
                ));
            }
            (Ok(Err(e)), Ok(output)) if output.status.success() => {
                return Err(TransformError::Compile(format!(
                    "failed to write source to {}: {}",
                    self.program, e
                )));
            }
            (Ok(_), Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(TransformError::Compile(if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            }));
        }

        let compiled = String::from_utf8(output.stdout).map_err(|e| {
            TransformError::Compile(format!("compiler output is not UTF-8: {}", e))
        })?;
        debug!(
            "Compiled {} bytes of .{} with {}",
            source.len(),
            self.extension,
            self.program
        );
        Ok(compiled)
    }

    fn name(&self) -> &str {
        "command"
    }
}
