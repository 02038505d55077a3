//! Where rendered figures go.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::Result;
use crate::plots::Figure;

/// Receives figures as they are rendered.
pub trait PlotSink {
    fn show(&mut self, set_name: &str, figure: &Figure) -> Result<()>;
}

fn file_name(set_name: &str, figure: &Figure) -> String {
    format!("{set_name}_{}.svg", figure.name)
}

/// Shows figures from a scratch directory that is removed on drop,
/// pausing after each one until Enter is pressed.
pub struct Viewer {
    dir: TempDir,
    wait: bool,
}

impl Viewer {
    pub fn new(wait: bool) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("ocelli-plots-").tempdir()?;
        tracing::debug!("viewer scratch directory {}", dir.path().display());
        Ok(Self { dir, wait })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl PlotSink for Viewer {
    fn show(&mut self, set_name: &str, figure: &Figure) -> Result<()> {
        let path = self.dir.path().join(file_name(set_name, figure));
        fs::write(&path, &figure.svg)?;
        println!("Figure '{}' ready at {}", figure.name, path.display());
        if self.wait {
            print!("Press Enter to continue...");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
        }
        Ok(())
    }
}

/// Keeps every figure in a directory.
pub struct Directory {
    dir: PathBuf,
}

impl Directory {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl PlotSink for Directory {
    fn show(&mut self, set_name: &str, figure: &Figure) -> Result<()> {
        let path = self.dir.join(file_name(set_name, figure));
        fs::write(&path, &figure.svg)?;
        tracing::info!("Wrote {}", path.display());
        Ok(())
    }
}
