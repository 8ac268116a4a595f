//! Fixtures and program variants.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// One input file driving one comparison.
///
/// The identifier is the file name; fixtures are ordered by it so that two runs over the same directory
/// evaluate (and report) in the same order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Fixture {
    pub id: String,
    pub path: PathBuf,
}

impl Fixture {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    /// Build a fixture from a path, using its file name as the identifier.
    ///
    /// ## Returns
    /// - `None` when the path has no file name (e.g. `/` or `..`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let id = path.file_name()?.to_string_lossy().into_owned();
        Some(Self::new(id, path))
    }

    /// File name of this fixture's persisted capture for `variant` (`<id>_baseline` / `<id>_candidate`).
    pub fn capture_name(&self, variant: Variant) -> String {
        format!("{}_{}", self.id, variant.as_str())
    }
}

/// Which of the two programs an invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// The trusted reference program.
    Baseline,
    /// The freshly built program under test.
    Candidate,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Baseline, Variant::Candidate];

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Baseline => "baseline",
            Variant::Candidate => "candidate",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
