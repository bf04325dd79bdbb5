use core::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use types::{ProgramId, Word};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    UnknownProgram(ProgramId),
    EmptyProgram(ProgramId),
    Io { path: PathBuf, message: String },
    Parse { path: PathBuf, token: String },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::UnknownProgram(id) => write!(f, "no program with id {}", id),
            LoadError::EmptyProgram(id) => write!(f, "program {} is empty", id),
            LoadError::Io { path, message } => {
                write!(f, "failed to read {}: {}", path.display(), message)
            }
            LoadError::Parse { path, token } => {
                write!(f, "{}: `{}` is not a machine word", path.display(), token)
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Source of program images for new processes.
pub trait ProgramLoader: fmt::Debug {
    fn load(&self, id: ProgramId) -> Result<Vec<Word>, LoadError>;
}

/// Programs held in memory, indexed by position.
#[derive(Debug, Clone, Default)]
pub struct ProgramTable {
    programs: Vec<Vec<Word>>,
}

impl ProgramTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_programs(programs: Vec<Vec<Word>>) -> Self {
        Self { programs }
    }

    /// Add a program, returning its id.
    pub fn push(&mut self, image: Vec<Word>) -> ProgramId {
        self.programs.push(image);
        (self.programs.len() - 1) as ProgramId
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Load every `*.maq` file in `dir`, ordered by file name. Program ids
    /// follow that order.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, LoadError> {
        let dir = dir.as_ref();
        let io_err = |path: &Path, e: std::io::Error| LoadError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
            let path = entry.map_err(|e| io_err(dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == "maq") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut table = Self::new();
        for path in paths {
            let text = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            table.push(parse_words(&path, &text)?);
        }
        Ok(table)
    }
}

impl ProgramLoader for ProgramTable {
    fn load(&self, id: ProgramId) -> Result<Vec<Word>, LoadError> {
        let image = usize::try_from(id)
            .ok()
            .and_then(|idx| self.programs.get(idx))
            .ok_or(LoadError::UnknownProgram(id))?;
        if image.is_empty() {
            return Err(LoadError::EmptyProgram(id));
        }
        Ok(image.clone())
    }
}

/// Parse a program listing: words separated by whitespace or commas.
/// `;` and `//` start a comment that runs to the end of the line.
pub fn parse_words(path: &Path, text: &str) -> Result<Vec<Word>, LoadError> {
    let mut words = Vec::new();
    for line in text.lines() {
        let line = line.split(';').next().unwrap_or("");
        let line = line.split("//").next().unwrap_or("");
        for token in line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            let word = token.parse::<Word>().map_err(|_| LoadError::Parse {
                path: path.to_path_buf(),
                token: token.to_string(),
            })?;
            words.push(word);
        }
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_listing_with_comments() {
        let text = "1, 5 ; loadi 5\n12 3 // exit\n\n";
        let words = parse_words(Path::new("p.maq"), text).unwrap();
        assert_eq!(words, vec![1, 5, 12, 3]);
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_words(Path::new("p.maq"), "1 two").unwrap_err();
        assert_eq!(
            err,
            LoadError::Parse {
                path: PathBuf::from("p.maq"),
                token: "two".into()
            }
        );
    }

    #[test]
    fn unknown_and_empty_programs_fail() {
        let table = ProgramTable::from_programs(vec![vec![1, 2], vec![]]);
        assert_eq!(table.load(0), Ok(vec![1, 2]));
        assert_eq!(table.load(1), Err(LoadError::EmptyProgram(1)));
        assert_eq!(table.load(2), Err(LoadError::UnknownProgram(2)));
        assert_eq!(table.load(-1), Err(LoadError::UnknownProgram(-1)));
    }
}
