//! Input line parsing.

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    /// First word, upper-cased. Empty for a blank line.
    pub verb: String,
    /// Remaining words.
    pub args: Vec<String>,
    /// Everything after the verb, trimmed but otherwise untouched.
    pub rest: String,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        Self {
            verb: verb.to_ascii_uppercase(),
            args: rest.split_whitespace().map(str::to_string).collect(),
            rest: rest.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.verb.is_empty()
    }

    pub fn is_quit(&self) -> bool {
        self.verb == "QUIT"
    }
}
