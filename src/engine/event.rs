//! Events emitted while the engine works

/// Which way content moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Push,
    Pull,
}

impl Direction {
    /// Verb used in user-facing messages
    pub fn verb(self) -> &'static str {
        match self {
            Direction::Push => "Pushing",
            Direction::Pull => "Pulling",
        }
    }
}

/// Events emitted by push and pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent<'a> {
    /// Local and remote content already match; nothing transferred.
    UpToDate { name: &'a str },
    /// A transfer is about to start.
    Started {
        name: &'a str,
        direction: Direction,
    },
    /// Bytes moved so far for the current transfer.
    Progress {
        name: &'a str,
        current: u64,
        total: u64,
    },
    /// The transfer completed.
    Finished {
        name: &'a str,
        direction: Direction,
    },
}

/// Callback used to receive engine events.
pub type SyncCallback = dyn Fn(&SyncEvent<'_>);
