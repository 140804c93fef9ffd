use std::fmt;

/// One segment of a word after quote removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordPart {
    Literal(String),
    // `$NAME` or `$?`, expanded when the command runs
    Variable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub parts: Vec<WordPart>,
    /// The source word contained quotes (`'...'`, `"..."`).
    pub quoted: bool,
}

impl Word {
    pub fn literal_word(text: impl Into<String>) -> Self {
        Self {
            parts: vec![WordPart::Literal(text.into())],
            quoted: false,
        }
    }

    /// Unwrapped text with variable references left as `$NAME`.
    pub fn literal(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                WordPart::Literal(s) => out.push_str(s),
                WordPart::Variable(name) => {
                    out.push('$');
                    out.push_str(name);
                }
            }
        }
        out
    }

    pub fn has_variables(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, WordPart::Variable(_)))
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    Overwrite, // >
    Append,    // >>
    Input,     // <
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub mode: RedirectMode,
    pub target: Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And, // &&
    Or,  // ||
    Seq, // ;
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::And => f.write_str("&&"),
            Operator::Or => f.write_str("||"),
            Operator::Seq => f.write_str(";"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    // "echo hello > out.txt"
    Simple {
        cmd: Word,
        args: Vec<Word>,
        redirects: Vec<Redirect>,
    },
    // "ls | grep target"
    Pipeline { commands: Vec<ParsedCommand> },
    // "build && test || echo failed; echo done"
    // operators.len() == commands.len() - 1
    Sequence {
        commands: Vec<ParsedCommand>,
        operators: Vec<Operator>,
    },
    // "(cd sub && make)"
    Subshell { command: Box<ParsedCommand> },
}
