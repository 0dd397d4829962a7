//! Invocation of the `skaffold` executable as a child process.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::Command;
use tracing::debug;

use crate::cache::{CacheError, CachedSkaffold};

/// Byte source for the child's stdin.
pub type StdinSource = Box<dyn AsyncRead + Send + Unpin>;

/// Byte sink for one of the child's output streams.
pub type OutputSink = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Error, Debug)]
pub enum SkaffoldError {
    #[error("Failed to launch skaffold: {0}")]
    Launch(#[source] std::io::Error),

    #[error("Failed while waiting for skaffold: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Stream relay failed: {source}")]
    Stream {
        #[source]
        source: std::io::Error,
        /// The child's exit code, which is still awaited when a relay fails.
        exit_code: Option<i32>,
    },

    #[error("Failed to prepare cached skaffold: {0}")]
    Cache(#[from] CacheError),
}

/// Builds and runs one `skaffold` invocation.
///
/// Flag construction is order-sensitive: prefix tokens first, then
/// `--filename <path>` if a skaffold.yaml is set, then `--profile <name>` if a
/// profile is set, then the subcommand token. Each value is constructed fresh
/// per invocation; [`Self::run`] consumes the builder.
pub struct Skaffold {
    initial_tokens: Vec<String>,
    skaffold_yaml: Option<PathBuf>,
    profile: Option<String>,
    stdin: Option<StdinSource>,
    stdout: Option<OutputSink>,
    stderr: Option<OutputSink>,
}

impl std::fmt::Debug for Skaffold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Skaffold")
            .field("initial_tokens", &self.initial_tokens)
            .field("skaffold_yaml", &self.skaffold_yaml)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

impl Skaffold {
    /// Invokes the executable at an explicit path.
    pub fn at_path(executable: impl AsRef<Path>) -> Self {
        Self::from_tokens([executable.as_ref().to_string_lossy().into_owned()])
    }

    /// Invokes a command built from explicit prefix tokens.
    ///
    /// The first token is the program; the rest precede all flags. This is
    /// also the seam tests use to substitute a stand-in executable.
    pub fn from_tokens(tokens: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            initial_tokens: tokens.into_iter().map(Into::into).collect(),
            skaffold_yaml: None,
            profile: None,
            stdin: None,
            stdout: None,
            stderr: None,
        }
    }

    /// Invokes the managed cached executable, refreshing it first if stale.
    pub async fn managed(cache: &CachedSkaffold) -> Result<Self, SkaffoldError> {
        cache.ensure_up_to_date().await?;
        Ok(Self::at_path(cache.cached_path()))
    }

    /// Sets the skaffold.yaml path, passed as `--filename <path>`.
    pub fn skaffold_yaml(mut self, path: impl Into<PathBuf>) -> Self {
        self.skaffold_yaml = Some(path.into());
        self
    }

    /// Sets the profile, passed as `--profile <name>`.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Supplies the child's stdin. The source is copied in full, then the
    /// pipe is closed to signal end of input.
    pub fn stdin(mut self, source: StdinSource) -> Self {
        self.stdin = Some(source);
        self
    }

    /// Receives the child's stdout. Without a sink the stream is discarded.
    pub fn stdout(mut self, sink: OutputSink) -> Self {
        self.stdout = Some(sink);
        self
    }

    /// Receives the child's stderr. Without a sink the stream is discarded.
    pub fn stderr(mut self, sink: OutputSink) -> Self {
        self.stderr = Some(sink);
        self
    }

    /// Runs `skaffold deploy`.
    pub async fn deploy(self) -> Result<i32, SkaffoldError> {
        self.run("deploy").await
    }

    /// Runs the given subcommand and returns the child's exit code.
    ///
    /// Blocks until the child exits and all configured stream relays finish.
    /// The three relays run concurrently with the child and with each other,
    /// so a child interleaving stdout and stderr, or writing output while
    /// waiting on stdin, never deadlocks on this runner's plumbing. A
    /// non-zero exit code is returned as data, not as an error; interpreting
    /// it is the caller's concern.
    pub async fn run(mut self, subcommand: &str) -> Result<i32, SkaffoldError> {
        if self.initial_tokens.is_empty() {
            return Err(SkaffoldError::Launch(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "no executable token was configured",
            )));
        }

        let args = self.build_args(subcommand);
        debug!(command = ?args, "Running skaffold");

        let mut command = Command::new(&args[0]);
        command
            .args(&args[1..])
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(if self.stdout.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(if self.stderr.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = command.spawn().map_err(SkaffoldError::Launch)?;

        let mut child_stdin = child.stdin.take();
        let mut child_stdout = child.stdout.take();
        let mut child_stderr = child.stderr.take();
        let mut stdin_source = self.stdin.take();
        let mut stdout_sink = self.stdout.take();
        let mut stderr_sink = self.stderr.take();

        let feed_stdin = async {
            if let (Some(pipe), Some(source)) = (child_stdin.as_mut(), stdin_source.as_mut()) {
                tokio::io::copy(source, pipe).await?;
            }
            // Dropping the pipe closes it, signaling end of input.
            drop(child_stdin.take());
            Ok::<(), std::io::Error>(())
        };
        let drain_stdout = async {
            if let (Some(pipe), Some(sink)) = (child_stdout.as_mut(), stdout_sink.as_mut()) {
                tokio::io::copy(pipe, sink).await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let drain_stderr = async {
            if let (Some(pipe), Some(sink)) = (child_stderr.as_mut(), stderr_sink.as_mut()) {
                tokio::io::copy(pipe, sink).await?;
            }
            Ok::<(), std::io::Error>(())
        };

        // The exit status is always awaited, even when a relay fails, so
        // neither failure path masks the other.
        let (stdin_res, stdout_res, stderr_res, status) =
            tokio::join!(feed_stdin, drain_stdout, drain_stderr, child.wait());

        let status = status.map_err(SkaffoldError::Wait)?;
        let exit_code = status.code();

        for relay in [stdin_res, stdout_res, stderr_res] {
            if let Err(source) = relay {
                return Err(SkaffoldError::Stream { source, exit_code });
            }
        }

        // A child killed by a signal has no exit code; report it as -1.
        Ok(exit_code.unwrap_or(-1))
    }

    fn build_args(&self, subcommand: &str) -> Vec<String> {
        let mut args = self.initial_tokens.clone();
        if let Some(yaml) = &self.skaffold_yaml {
            args.push("--filename".to_string());
            args.push(yaml.to_string_lossy().into_owned());
        }
        if let Some(profile) = &self.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        args.push(subcommand.to_string());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_follow_prefix_tokens_in_order() {
        let skaffold = Skaffold::at_path("/usr/bin/skaffold")
            .skaffold_yaml("d.yaml")
            .profile("p");

        assert_eq!(
            skaffold.build_args("deploy"),
            vec![
                "/usr/bin/skaffold",
                "--filename",
                "d.yaml",
                "--profile",
                "p",
                "deploy"
            ]
        );
    }

    #[test]
    fn unset_options_emit_no_flags() {
        let skaffold = Skaffold::at_path("skaffold");
        assert_eq!(skaffold.build_args("dev"), vec!["skaffold", "dev"]);
    }

    #[test]
    fn stream_error_names_the_relay_failure() {
        let err = SkaffoldError::Stream {
            source: std::io::Error::other("broken pipe"),
            exit_code: Some(1),
        };
        assert_eq!(err.to_string(), "Stream relay failed: broken pipe");
    }

    #[tokio::test]
    async fn empty_token_list_is_a_launch_error() {
        let err = Skaffold::from_tokens(Vec::<String>::new())
            .run("deploy")
            .await
            .unwrap_err();
        assert!(matches!(err, SkaffoldError::Launch(_)));
    }

    #[test]
    fn profile_without_yaml_emits_only_profile() {
        let skaffold = Skaffold::from_tokens(["sh", "-c", "true"]).profile("staging");
        assert_eq!(
            skaffold.build_args("run"),
            vec!["sh", "-c", "true", "--profile", "staging", "run"]
        );
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use tokio::io::AsyncReadExt;

        /// Runs a shell script as the child, capturing configured streams.
        async fn run_script(
            script: &str,
            stdin: Option<&[u8]>,
            capture_stdout: bool,
            capture_stderr: bool,
        ) -> (i32, Vec<u8>, Vec<u8>) {
            let mut skaffold = Skaffold::from_tokens(["sh", "-c", script]);

            if let Some(input) = stdin {
                skaffold = skaffold.stdin(Box::new(std::io::Cursor::new(input.to_vec())));
            }

            // Sinks see EOF when the runner drops them; each reader drains
            // concurrently so a full pipe never stalls the runner.
            let mut stdout_task = None;
            if capture_stdout {
                let (mut rx, tx) = tokio::io::duplex(8 * 1024);
                skaffold = skaffold.stdout(Box::new(tx));
                stdout_task = Some(tokio::spawn(async move {
                    let mut bytes = Vec::new();
                    rx.read_to_end(&mut bytes).await.unwrap();
                    bytes
                }));
            }
            let mut stderr_task = None;
            if capture_stderr {
                let (mut rx, tx) = tokio::io::duplex(8 * 1024);
                skaffold = skaffold.stderr(Box::new(tx));
                stderr_task = Some(tokio::spawn(async move {
                    let mut bytes = Vec::new();
                    rx.read_to_end(&mut bytes).await.unwrap();
                    bytes
                }));
            }

            let exit_code = skaffold.run("subcommand").await.unwrap();

            let mut stdout = Vec::new();
            if let Some(task) = stdout_task {
                stdout = task.await.unwrap();
            }
            let mut stderr = Vec::new();
            if let Some(task) = stderr_task {
                stderr = task.await.unwrap();
            }
            (exit_code, stdout, stderr)
        }

        #[tokio::test]
        async fn relays_all_three_streams() {
            let (code, stdout, stderr) = run_script(
                "cat; echo output; echo error >&2",
                Some(b"input\n"),
                true,
                true,
            )
            .await;

            assert_eq!(code, 0);
            assert_eq!(stdout, b"input\noutput\n");
            assert_eq!(stderr, b"error\n");
        }

        #[tokio::test]
        async fn stdin_is_relayed_without_an_added_newline() {
            let (code, stdout, _) =
                run_script("cat; echo output", Some(b"input"), true, false).await;

            assert_eq!(code, 0);
            assert_eq!(stdout, b"inputoutput\n");
        }

        #[tokio::test]
        async fn returns_nonzero_exit_code_as_data() {
            let (code, _, _) = run_script("exit 42", None, false, false).await;
            assert_eq!(code, 42);
        }

        #[tokio::test]
        async fn stdin_pipe_is_closed_after_copy() {
            // `cat` only exits once its stdin reaches EOF.
            let (code, stdout, _) = run_script("cat", Some(b"all of it"), true, false).await;
            assert_eq!(code, 0);
            assert_eq!(stdout, b"all of it");
        }

        #[tokio::test]
        async fn unconfigured_streams_do_not_block_the_child() {
            // Floods stdout with nobody reading; Stdio::null must absorb it.
            let (code, _, _) =
                run_script("head -c 1000000 /dev/zero; exit 0", None, false, false).await;
            assert_eq!(code, 0);
        }

        #[tokio::test]
        async fn stderr_flood_before_stdin_read_does_not_deadlock() {
            // The child fills its stderr pipe well past the OS buffer before
            // touching stdin; independent concurrent draining must keep all
            // three streams moving.
            let (code, stdout, stderr) = run_script(
                "head -c 200000 /dev/zero >&2; cat",
                Some(b"late input"),
                true,
                true,
            )
            .await;

            assert_eq!(code, 0);
            assert_eq!(stdout, b"late input");
            assert_eq!(stderr.len(), 200_000);
        }

        #[tokio::test]
        async fn launch_failure_is_reported() {
            let err = Skaffold::at_path("/nonexistent/skaffold")
                .run("deploy")
                .await
                .unwrap_err();
            assert!(matches!(err, SkaffoldError::Launch(_)));
        }
    }
}
