//! Command handlers behind the CLI

pub mod init;

use crate::config::Command;
use crate::engine::Trove;
use crate::ui::{files_table, versions_table, TransferReporter};
use std::path::Path;
use std::rc::Rc;

/// Run one CLI command with `cwd` as the working directory
pub fn run(command: Command, cwd: &Path) -> anyhow::Result<()> {
    match command {
        Command::Init => {
            let report = init::init_project(cwd)?;
            for path in &report.created {
                println!("create {}", relative(path, cwd));
            }
            for path in &report.existing {
                println!("exist  {}", relative(path, cwd));
            }
            if report.gitignore_updated {
                println!("append .gitignore");
            }
            if let Some(hint) = report.hint {
                println!("{hint}");
            }
        }
        Command::Push { filename } => {
            let mut trove = open_with_progress(cwd)?;
            trove.push(&filename)?;
        }
        Command::Pull { filename, version } => {
            let trove = open_with_progress(cwd)?;
            trove.pull(filename.as_deref(), version.as_deref())?;
        }
        Command::Delete { filename } => {
            let trove = Trove::open(cwd)?;
            if !trove.delete(&filename)? {
                eprintln!("Could not delete {filename}");
            }
        }
        Command::List => {
            let trove = Trove::open(cwd)?;
            print!("{}", files_table(&trove.list()?, chrono::Utc::now()));
        }
        Command::Versions { filename } => {
            let trove = Trove::open(cwd)?;
            print!(
                "{}",
                versions_table(&trove.versions(&filename)?, chrono::Utc::now())
            );
        }
        Command::Version => println!("{}", crate::VERSION),
    }
    Ok(())
}

fn open_with_progress(cwd: &Path) -> anyhow::Result<Trove> {
    let reporter = Rc::new(TransferReporter::new());
    Ok(Trove::open(cwd)?.with_events(move |event| reporter.handle(event)))
}

fn relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).display().to_string()
}
