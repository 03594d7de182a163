use std::fmt;
use std::path::{Path, PathBuf};

/// Preprocessing failure: unreadable program or include file.
#[derive(Debug)]
pub enum PreprocessError {
    Unreadable(PathBuf, std::io::Error),
    IncludeNotFound(PathBuf),
}

impl fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreprocessError::Unreadable(p, e) => {
                write!(f, "cannot read '{}': {}", p.display(), e)
            }
            PreprocessError::IncludeNotFound(p) => {
                write!(f, "include file {} not found", p.display())
            }
        }
    }
}

impl std::error::Error for PreprocessError {}

/// Expanded program text: the leading header block, then the body of the
/// main file and of every `include.`d file, blank-line separated.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub header: Vec<String>,
    pub bodies: Vec<String>,
}

impl Preprocessed {
    pub fn complete(&self) -> Vec<String> {
        let mut lines = self.header.clone();
        lines.push(String::new());
        lines.extend(self.bodies.iter().cloned());
        lines
    }

    /// The flat source consumed by the lexer.
    pub fn source(&self) -> String {
        self.complete().join("\n")
    }
}

/// Read a program file and expand its header `include.` directives by
/// concatenating the body of each included file (header stripped).
pub fn process(file: &Path) -> Result<Preprocessed, PreprocessError> {
    let curr_dir = file.parent().unwrap_or(Path::new(".")).to_path_buf();
    let lines = read_lines(file)?;

    let header_len = header_length(&lines);
    let header: Vec<String> = lines.iter().take(header_len + 1).cloned().collect();
    let includes = include_files(&header, &curr_dir);

    let mut bodies: Vec<String> = lines.iter().skip(header_len + 1).cloned().collect();
    bodies.push(String::new());
    for path in includes {
        if !path.is_file() {
            return Err(PreprocessError::IncludeNotFound(path));
        }
        let incl = read_lines(&path)?;
        let hlen = header_length(&incl);
        bodies.extend(incl.into_iter().skip(hlen + 1));
        bodies.push(String::new());
    }

    Ok(Preprocessed { header, bodies })
}

fn read_lines(path: &Path) -> Result<Vec<String>, PreprocessError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| PreprocessError::Unreadable(path.to_path_buf(), e))?;
    Ok(text.lines().map(|l| l.to_string()).collect())
}

/// Index of the first blank line after the first non-blank line.
fn header_length(lines: &[String]) -> usize {
    let mut found_first = false;
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if !trimmed.is_empty() && !found_first {
            found_first = true;
        } else if trimmed.is_empty() && found_first {
            return i;
        }
    }
    lines.len()
}

/// Collect the arguments of `… include.` directive lines in the header.
fn include_files(header: &[String], curr_dir: &Path) -> Vec<PathBuf> {
    let mut result = Vec::new();
    for line in header {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.last() == Some(&"include.") {
            for name in &parts[..parts.len() - 1] {
                result.push(curr_dir.join(name));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_ends_at_first_blank_line() {
        let lines: Vec<String> = ["a", "b", "", "body"].iter().map(|s| s.to_string()).collect();
        assert_eq!(header_length(&lines), 2);
    }

    #[test]
    fn leading_blank_lines_belong_to_the_header_scan() {
        let lines: Vec<String> = ["", "a", "", "body"].iter().map(|s| s.to_string()).collect();
        assert_eq!(header_length(&lines), 2);
    }

    #[test]
    fn include_directives_collected_from_header() {
        let header: Vec<String> = ["lib1 lib2 include.", "1 output."]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let found = include_files(&header, Path::new("dir"));
        assert_eq!(found, [Path::new("dir/lib1"), Path::new("dir/lib2")]);
    }
}
