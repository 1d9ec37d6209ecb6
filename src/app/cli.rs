use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::error::AppError;

/// Reusable CLI application runner that handles:
/// - Signal handling (SIGINT, SIGTERM, SIGHUP) by cancelling a token
/// - Stdout buffering
/// - Exit codes (0 = success, 1 = error, 130 = SIGINT, 143 = SIGTERM)
pub struct CliApp {
    name: String,
    cancel: CancellationToken,
}

impl CliApp {
    /// Create a new CLI application runner
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cancel: CancellationToken::new(),
        }
    }

    /// Token cancelled when a termination signal arrives
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the application and exit the process with the matching code
    ///
    /// A signal cancels the token and then waits for `main_fn` to drain
    /// and return, so partial output is flushed before exiting.
    pub async fn run<F, Fut>(self, main_fn: F) -> !
    where
        F: FnOnce(tokio::io::BufWriter<tokio::io::Stdout>, CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), AppError>>,
    {
        let writer = tokio::io::BufWriter::new(tokio::io::stdout());
        let main_fut = main_fn(writer, self.cancel.clone());
        tokio::pin!(main_fut);

        let signal_code = tokio::select! {
            result = &mut main_fut => {
                std::process::exit(Self::exit_code(&self.name, result));
            }
            code = wait_for_signal() => code,
        };

        self.cancel.cancel();
        info!(app = %self.name, "Interrupted, draining");
        Self::report_drain(&self.name, main_fut.await);
        std::process::exit(signal_code);
    }

    /// Log a failure seen while draining; the signal still decides the exit code
    fn report_drain(name: &str, result: Result<(), AppError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(app = %name, error = %e, "Drain after signal failed");
                false
            }
        }
    }

    fn exit_code(name: &str, result: Result<(), AppError>) -> i32 {
        match result {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("{name}: {e}");
                1
            }
        }
    }
}

/// Wait for any Unix signal (SIGINT, SIGTERM, SIGHUP) or Ctrl+C
/// Returns the exit code to use (130 for SIGINT, 143 for SIGTERM, etc.)
async fn wait_for_signal() -> i32 {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (Ok(mut sigterm), Ok(mut sigint), Ok(mut sighup)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
            signal(SignalKind::hangup()),
        ) else {
            return std::future::pending().await;
        };

        tokio::select! {
            _ = sigterm.recv() => 143, // 128 + 15
            _ = sigint.recv() => 130, // 128 + 2
            _ = sighup.recv() => 129, // 128 + 1
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => 130,
            Err(_) => std::future::pending().await,
        }
    }
}
