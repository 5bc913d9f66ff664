//! Interactive confirmation on the terminal.

use async_trait::async_trait;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::Result;
use crate::planner::DeploymentPlan;
use crate::reconciler::Confirmer;

use super::output::OutputFormatter;

/// Default pause between a yes and the submission.
pub const DEFAULT_COUNTDOWN_SECS: u64 = 5;

/// Asks on stderr and reads the answer from `input`, stdin by default.
#[derive(Debug)]
pub struct StdinConfirmer<R = BufReader<Stdin>> {
    input: Mutex<R>,
    countdown: Duration,
}

impl Default for StdinConfirmer {
    fn default() -> Self {
        Self::new()
    }
}

impl StdinConfirmer {
    /// Creates a confirmer reading stdin, with the default countdown.
    #[must_use]
    pub fn new() -> Self {
        Self::with_input(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> StdinConfirmer<R> {
    /// Creates a confirmer reading answers from `input`.
    #[must_use]
    pub fn with_input(input: R) -> Self {
        Self {
            input: Mutex::new(input),
            countdown: Duration::from_secs(DEFAULT_COUNTDOWN_SECS),
        }
    }

    /// Sets the pause between a yes and the submission.
    #[must_use]
    pub const fn with_countdown(mut self, countdown: Duration) -> Self {
        self.countdown = countdown;
        self
    }

    async fn count_down(&self) -> Result<()> {
        let secs = self.countdown.as_secs();
        if secs == 0 {
            return Ok(());
        }

        let mut stderr = std::io::stderr();
        write!(stderr, "Starting in")?;
        for remaining in (1..=secs).rev() {
            write!(stderr, " {remaining}")?;
            stderr.flush()?;
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        writeln!(stderr)?;
        Ok(())
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> Confirmer for StdinConfirmer<R> {
    async fn confirm(&self, plan: &DeploymentPlan) -> Result<bool> {
        {
            let mut stderr = std::io::stderr().lock();
            write!(stderr, "{}", OutputFormatter::new().format_plan(plan))?;
            write!(stderr, "\n{} Continue? (yes/no) ", plan.prompt().bold())?;
            stderr.flush()?;
        }

        let mut answer = String::new();
        let read = self.input.lock().await.read_line(&mut answer).await?;

        // End of input is not an answer, only a real empty line is.
        if read == 0 {
            warn!("Input closed before an answer for {}", plan.deployment);
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "input closed before an answer, pass --yes to run unattended",
            )
            .into());
        }

        if let Some(yes) = parse_answer(&answer) {
            if yes {
                self.count_down().await?;
            }
            Ok(yes)
        } else {
            eprintln!("Please respond with 'yes' or 'no'");
            Ok(false)
        }
    }
}

/// Maps an answer to yes or no; an empty answer means yes.
fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" | "y" | "ye" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}
