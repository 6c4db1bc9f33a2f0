//! Progress reporting

use crate::engine::SyncEvent;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::cell::RefCell;

/// Renders engine events on stderr
///
/// On a terminal each transfer gets a byte progress bar. Otherwise a single
/// "Pushing NAME..." / "Pulling NAME..." line is printed per transfer.
pub struct TransferReporter {
    interactive: bool,
    bar: RefCell<Option<ProgressBar>>,
    messages: RefCell<Vec<String>>,
    capture: bool,
}

impl TransferReporter {
    /// Create a reporter that draws bars only when stderr is a terminal
    pub fn new() -> Self {
        Self {
            interactive: console::Term::stderr().is_term(),
            bar: RefCell::new(None),
            messages: RefCell::new(Vec::new()),
            capture: false,
        }
    }

    /// Create a reporter that records messages instead of printing them
    pub fn capturing() -> Self {
        Self {
            interactive: false,
            bar: RefCell::new(None),
            messages: RefCell::new(Vec::new()),
            capture: true,
        }
    }

    /// Messages recorded by a capturing reporter
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    /// React to one engine event
    pub fn handle(&self, event: &SyncEvent<'_>) {
        match event {
            SyncEvent::UpToDate { .. } => self.notice("Already up-to-date".to_string()),
            SyncEvent::Started { name, direction } => {
                if self.interactive {
                    *self.bar.borrow_mut() = Some(transfer_bar(name));
                } else {
                    self.notice(format!("{} {}...", direction.verb(), name));
                }
            }
            SyncEvent::Progress { current, total, .. } => {
                if let Some(bar) = self.bar.borrow().as_ref() {
                    bar.set_length(*total);
                    bar.set_position(*current);
                }
            }
            SyncEvent::Finished { .. } => {
                if let Some(bar) = self.bar.borrow_mut().take() {
                    bar.finish();
                }
            }
        }
    }

    fn notice(&self, message: String) {
        if self.capture {
            self.messages.borrow_mut().push(message);
        } else {
            eprintln!("{message}");
        }
    }
}

impl Default for TransferReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn transfer_bar(name: &str) -> ProgressBar {
    let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::with_template(
        "{prefix} [{bar:50}] {percent:>3}% {bytes:>9}/{total_bytes:<9}",
    ) {
        bar.set_style(style.progress_chars("= "));
    }
    bar.set_prefix(name.to_string());
    bar
}
