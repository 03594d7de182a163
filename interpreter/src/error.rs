use std::fmt;

/// Runtime faults. These never escape the engine as failures: they are
/// reported at fatal severity and converted into a program-level stop at
/// the verb-dispatch boundary.
#[derive(Debug)]
pub enum RuntimeError {
    IndexOutOfRange { index: i64, len: usize },
    MissingSentenceResult(i32),
    NumberExpected(String),
    DivisionByZero,
    UnknownParagraph(String),
    MissingFileName,
    EmptyCondition,
    StackOverflow,
    Io(String),
    Custom(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::IndexOutOfRange { index, len } => {
                write!(f, "index {} out of range for list of length {}", index, len)
            }
            RuntimeError::MissingSentenceResult(key) => {
                write!(f, "could not find sentence reference at {}", key)
            }
            RuntimeError::NumberExpected(text) => {
                write!(f, "numeric value expected, got '{}'", text)
            }
            RuntimeError::DivisionByZero => write!(f, "division by zero"),
            RuntimeError::UnknownParagraph(name) => {
                write!(f, "paragraph {} does not exist", name)
            }
            RuntimeError::MissingFileName => write!(f, "file name missing"),
            RuntimeError::EmptyCondition => write!(f, "condition is empty"),
            RuntimeError::StackOverflow => write!(f, "paragraph call depth exceeded"),
            RuntimeError::Io(msg) => write!(f, "I/O error: {}", msg),
            RuntimeError::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<std::io::Error> for RuntimeError {
    fn from(e: std::io::Error) -> Self {
        RuntimeError::Io(e.to_string())
    }
}
