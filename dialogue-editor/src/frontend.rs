//! The user-facing surface a session drives
//!
//! The session never prints or reads input itself. It asks a [`Frontend`]
//! for confirmations and selections, reports outcomes as [`Notice`]s, marks
//! itself busy around network calls, and pushes a fresh [`Screen`] after
//! every phase transition.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::view::Screen;

/// User-visible outcome of an operation
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Success(String),
    Error(String),
    Info(String),
}

pub trait Frontend: Send + Sync {
    /// Ask a yes/no question; `false` means the user declined
    fn confirm(&self, message: &str) -> io::Result<bool>;

    /// Show `listing` and let the user pick one of `count` entries (0-based)
    fn select(&self, listing: &str, count: usize) -> io::Result<Option<usize>>;

    fn notify(&self, notice: Notice);

    /// Show (`Some`) or clear (`None`) the busy indicator
    fn set_busy(&self, message: Option<&str>);

    /// Called after every phase transition with the new screen
    fn render(&self, screen: &Screen);
}

/// Busy indicator held for the duration of an operation.
///
/// Cleared on drop, so every exit path releases it.
pub struct BusyGuard {
    frontend: Arc<dyn Frontend>,
}

impl BusyGuard {
    pub fn show(frontend: &Arc<dyn Frontend>, message: &str) -> Self {
        frontend.set_busy(Some(message));
        Self {
            frontend: Arc::clone(frontend),
        }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.frontend.set_busy(None);
    }
}

/// Terminal frontend: prompts on stdin, reports on stdout, spins while busy
#[derive(Default)]
pub struct ConsoleFrontend {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    fn start_spinner(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    fn read_line() -> io::Result<String> {
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }
}

impl Frontend for ConsoleFrontend {
    fn confirm(&self, message: &str) -> io::Result<bool> {
        print!("{} [y/N]: ", message);
        io::stdout().flush()?;

        let input = Self::read_line()?;
        Ok(input.eq_ignore_ascii_case("y") || input.eq_ignore_ascii_case("yes"))
    }

    fn select(&self, listing: &str, count: usize) -> io::Result<Option<usize>> {
        println!("{}", listing);
        print!("\nSelect project (1-{}) or 'q' to cancel: ", count);
        io::stdout().flush()?;

        let input = Self::read_line()?;
        if input.eq_ignore_ascii_case("q") {
            return Ok(None);
        }

        match input.parse::<usize>() {
            Ok(n) if n >= 1 && n <= count => Ok(Some(n - 1)),
            _ => {
                println!("Invalid selection");
                Ok(None)
            }
        }
    }

    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Success(message) => println!("✅ {}", message),
            Notice::Error(message) => eprintln!("❌ {}", message),
            Notice::Info(message) => println!("{}", message),
        }
    }

    fn set_busy(&self, message: Option<&str>) {
        let mut spinner = self
            .spinner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(previous) = spinner.take() {
            previous.finish_and_clear();
        }
        *spinner = message.map(Self::start_spinner);
    }

    fn render(&self, screen: &Screen) {
        println!("\n{}", screen);
    }
}
