use crate::cli::Cli;
use crate::commands;
use crate::error::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// Parse and run the arguments after `fleetctl`, as `main` would.
pub(crate) fn run(args: &[&str]) -> Result<()> {
    let argv = std::iter::once("fleetctl").chain(args.iter().copied());
    let cli = Cli::try_parse_from(argv).unwrap_or_else(|e| panic!("bad test command line: {}", e));
    commands::dispatch(cli.command)
}

/// A temp directory with an initialized model, and the cwd set to it.
///
/// `setup` runs after `init`, each line a command.
pub(crate) fn create_test_model(setup: &[&[&str]]) -> (TempDir, DirGuard) {
    let temp_dir = TempDir::new().unwrap();
    let guard = DirGuard::new(temp_dir.path());

    run(&["init"]).unwrap();
    for args in setup {
        run(args).unwrap_or_else(|e| panic!("setup {:?} failed: {}", args, e));
    }

    (temp_dir, guard)
}
