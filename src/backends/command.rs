// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{Map, Value};
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::errors::FeatureError;
use crate::sandbox::{INPUTS_FILE, OUTPUT_FILE};
use crate::traits::Feature;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Share of the sandbox child's own limit a command may use, so that the
/// command is killed and reported before the parent kills the child.
pub fn command_budget(sandbox_timeout: Duration) -> Duration {
    sandbox_timeout * 9 / 10
}

/// Feature backed by an external program.
///
/// The program is called as `<program> <args..> <inputs.json> <output.json>`
/// and must write its JSON result to the output path. Its stdout and stderr
/// pass through to the sandbox child, where they are captured. With a
/// timeout set, the program is killed once it runs past it.
pub struct CommandFeature {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandFeature {
    pub fn new(program: String, args: Vec<String>) -> Self {
        Self {
            program,
            args,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn failed(&self, code: Option<i32>, stderr: String) -> FeatureError {
        FeatureError::CommandFailed {
            program: self.program.clone(),
            code,
            stderr,
        }
    }
}

/// `None` if the child is still running at `deadline`
fn wait_until(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

impl Feature for CommandFeature {
    fn invoke(&self, inputs: &Map<String, Value>) -> Result<Value, FeatureError> {
        let workdir = tempfile::Builder::new()
            .prefix("featurepipe_cmd_")
            .tempdir()?;
        let input_path = workdir.path().join(INPUTS_FILE);
        let output_path = workdir.path().join(OUTPUT_FILE);
        std::fs::write(&input_path, serde_json::to_vec(inputs)?)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&input_path)
            .arg(&output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drained on its own thread so a chatty program cannot fill the pipe
        let pipe = child.stderr.take();
        let reader = std::thread::spawn(move || {
            let mut buffer = Vec::new();
            if let Some(mut pipe) = pipe {
                let _ = pipe.read_to_end(&mut buffer);
            }
            String::from_utf8_lossy(&buffer).into_owned()
        });

        let status = match self.timeout {
            Some(timeout) => match wait_until(&mut child, Instant::now() + timeout)? {
                Some(status) => status,
                None => {
                    // Fails only if it exited in the meantime
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(FeatureError::CommandTimedOut {
                        program: self.program.clone(),
                        timeout,
                    });
                }
            },
            None => child.wait()?,
        };

        let stderr = reader.join().unwrap_or_default();
        eprint!("{}", stderr);
        if !status.success() {
            return Err(self.failed(status.code(), stderr));
        }

        let bytes = std::fs::read(&output_path).map_err(|_| {
            self.failed(
                status.code(),
                format!("no output written to {}", output_path.display()),
            )
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn name(&self) -> &'static str {
        "command"
    }
}
