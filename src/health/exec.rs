use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use super::{Error, ProbeResult, Prober, Target, check_context, elapsed, scoped};
use crate::context::Context;

/// Failure output is cut to this many bytes.
pub const MAX_OUTPUT_BYTES: usize = 4096;

const TRUNCATED_MARKER: &str = "... [truncated]";

/// Runs a command; exit status zero is success.
///
/// The command is never handed to a shell. A command string containing whitespace must come
/// with an explicit argument list, otherwise it is rejected instead of being split.
#[derive(Debug, Clone)]
pub struct ExecProber {
    timeout: Duration,
}

impl ExecProber {
    /// A zero `timeout` runs the command for as long as the caller's context allows.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

fn validate(target: &Target) -> Result<&str, Error> {
    let command = target.command.as_deref().unwrap_or_default().trim();
    if command.is_empty() {
        return Err(Error::EmptyCommand);
    }
    if target.args.is_empty() && command.contains(char::is_whitespace) {
        return Err(Error::InvalidCommandFormat(command.to_owned()));
    }
    Ok(command)
}

fn truncate_output(output: &str) -> String {
    if output.len() <= MAX_OUTPUT_BYTES {
        return output.to_owned();
    }
    let mut end = MAX_OUTPUT_BYTES;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{TRUNCATED_MARKER}", &output[..end])
}

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

#[async_trait::async_trait]
impl Prober for ExecProber {
    fn kind(&self) -> &'static str {
        "exec"
    }

    async fn probe(&self, ctx: &Context, target: &Target) -> ProbeResult {
        let start = Instant::now();
        if let Some(result) = check_context(ctx, start) {
            return result;
        }

        let program = match validate(target) {
            Ok(program) => program,
            Err(err) => return ProbeResult::failure(elapsed(start), "", err),
        };

        let mut command = Command::new(program);
        command
            .args(&target.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        log::trace!("running {program} {:?}", target.args);

        let output = match scoped(ctx, self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return ProbeResult::failure(
                    elapsed(start),
                    format!("failed to start {program}: {err}"),
                    Error::Spawn(err.to_string()),
                );
            }
            Err(err) => {
                return ProbeResult::failure(
                    elapsed(start),
                    format!("command interrupted: {err}"),
                    err,
                );
            }
        };

        let text = combined_output(&output);
        if output.status.success() {
            ProbeResult::success(elapsed(start), text.trim())
        } else {
            ProbeResult::failure(
                elapsed(start),
                truncate_output(text.trim()),
                Error::ExitStatus(output.status.to_string()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert_eq!(validate(&Target::default()), Err(Error::EmptyCommand));
        assert_eq!(
            validate(&Target::exec("   ", Vec::<String>::new())),
            Err(Error::EmptyCommand)
        );
        assert_eq!(
            validate(&Target::exec("ls -la", Vec::<String>::new())),
            Err(Error::InvalidCommandFormat("ls -la".to_owned()))
        );
        assert_eq!(validate(&Target::exec("ls", ["-la"])), Ok("ls"));
    }

    #[test]
    fn test_truncate_output() {
        assert_eq!(truncate_output("short"), "short");

        let long = "x".repeat(MAX_OUTPUT_BYTES + 10);
        let cut = truncate_output(&long);
        assert!(cut.ends_with(TRUNCATED_MARKER));
        assert_eq!(cut.len(), MAX_OUTPUT_BYTES + TRUNCATED_MARKER.len());

        let wide = "é".repeat(MAX_OUTPUT_BYTES);
        assert!(truncate_output(&wide).ends_with(TRUNCATED_MARKER));
    }

    #[tokio::test]
    async fn test_echo_succeeds() {
        let result = ExecProber::new(Duration::from_secs(5))
            .probe(&Context::background(), &Target::exec("echo", ["hello"]))
            .await;
        assert!(result.success, "{result:?}");
        assert_eq!(result.output, "hello");
    }

    #[tokio::test]
    async fn test_false_fails() {
        let result = ExecProber::new(Duration::from_secs(5))
            .probe(&Context::background(), &Target::exec("false", Vec::<String>::new()))
            .await;
        assert!(!result.success);
        assert!(matches!(result.error, Some(Error::ExitStatus(_))));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let result = ExecProber::new(Duration::from_secs(5))
            .probe(
                &Context::background(),
                &Target::exec("/nonexistent/probe-binary", Vec::<String>::new()),
            )
            .await;
        assert!(!result.success);
        assert!(matches!(result.error, Some(Error::Spawn(_))));
    }

    #[tokio::test]
    async fn test_timeout_kills_command() {
        let start = Instant::now();
        let result = ExecProber::new(Duration::from_millis(50))
            .probe(&Context::background(), &Target::exec("sleep", ["5"]))
            .await;
        assert!(!result.success);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(
            result.error,
            Some(Error::Context(crate::context::ContextError::DeadlineExceeded))
        );
    }

    #[tokio::test]
    async fn test_zero_timeout_inherits_caller_deadline() {
        let ctx = Context::background().with_timeout(Duration::from_millis(50));
        let result = ExecProber::new(Duration::ZERO)
            .probe(&ctx, &Target::exec("sleep", ["5"]))
            .await;
        assert!(!result.success);
    }
}
