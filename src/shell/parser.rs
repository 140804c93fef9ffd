use crate::shell::ast::{Operator, ParsedCommand, Redirect, RedirectMode, Word, WordPart};
use thiserror::Error;

/// Why a command line couldn't be turned into a tree. Every variant means
/// the same thing to the runner: hand the text to a real shell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),
    #[error("unexpected token '{0}'")]
    Unexpected(String),
    #[error("missing command before or after '{0}'")]
    MissingCommand(String),
    #[error("missing redirect target")]
    MissingRedirectTarget,
    #[error("unmatched parenthesis")]
    UnmatchedParen,
    #[error("unsupported shell syntax: {0}")]
    Unsupported(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(Word),
    And,            // &&
    Or,             // ||
    Semi,           // ;
    Pipe,           // |
    LParen,         // (
    RParen,         // )
    RedirectOut,    // >
    RedirectAppend, // >>
    RedirectIn,     // <
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Word(w) => w.literal(),
            Token::And => "&&".into(),
            Token::Or => "||".into(),
            Token::Semi => ";".into(),
            Token::Pipe => "|".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::RedirectOut => ">".into(),
            Token::RedirectAppend => ">>".into(),
            Token::RedirectIn => "<".into(),
            Token::Eof => "end of input".into(),
        }
    }
}

fn is_operator_char(c: char) -> bool {
    matches!(c, '&' | '|' | ';' | '(' | ')' | '<' | '>')
}

/// Collects one word's parts while quotes and escapes are being removed.
#[derive(Default)]
struct WordBuilder {
    parts: Vec<WordPart>,
    current: String,
    quoted: bool,
    started: bool,
}

impl WordBuilder {
    fn push(&mut self, c: char) {
        self.current.push(c);
        self.started = true;
    }

    fn push_var(&mut self, name: String) {
        if !self.current.is_empty() {
            self.parts.push(WordPart::Literal(std::mem::take(&mut self.current)));
        }
        self.parts.push(WordPart::Variable(name));
        self.started = true;
    }

    fn is_plain_digits(&self) -> bool {
        !self.quoted
            && self.parts.is_empty()
            && !self.current.is_empty()
            && self.current.chars().all(|c| c.is_ascii_digit())
    }

    fn finish(mut self) -> Option<Word> {
        if !self.started {
            return None;
        }
        if !self.current.is_empty() || self.parts.is_empty() {
            self.parts.push(WordPart::Literal(self.current));
        }
        Some(Word {
            parts: self.parts,
            quoted: self.quoted,
        })
    }
}

/// Reads `$NAME` / `$?` after the `$`. Returns None for a bare `$`.
fn read_variable(chars: &[char], i: &mut usize) -> Result<Option<String>, ParseError> {
    match chars.get(*i) {
        Some('(') => Err(ParseError::Unsupported("command substitution")),
        Some('{') => Err(ParseError::Unsupported("parameter expansion")),
        Some('?') => {
            *i += 1;
            Ok(Some("?".to_string()))
        }
        Some(c) if c.is_ascii_alphabetic() || *c == '_' => {
            let mut name = String::new();
            while let Some(&c) = chars.get(*i) {
                if c.is_ascii_alphanumeric() || c == '_' {
                    name.push(c);
                    *i += 1;
                } else {
                    break;
                }
            }
            Ok(Some(name))
        }
        _ => Ok(None),
    }
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            // Newlines separate commands unless the line ends mid-expression.
            if !matches!(
                tokens.last(),
                None | Some(Token::Semi) | Some(Token::And) | Some(Token::Or) | Some(Token::Pipe) | Some(Token::LParen)
            ) {
                tokens.push(Token::Semi);
            }
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        let next = chars.get(i + 1).copied();
        match (c, next) {
            ('&', Some('&')) => {
                tokens.push(Token::And);
                i += 2;
                continue;
            }
            ('&', _) => return Err(ParseError::Unsupported("background job or fd redirection")),
            ('|', Some('|')) => {
                tokens.push(Token::Or);
                i += 2;
                continue;
            }
            ('|', _) => {
                tokens.push(Token::Pipe);
                i += 1;
                continue;
            }
            (';', _) => {
                tokens.push(Token::Semi);
                i += 1;
                continue;
            }
            ('(', _) => {
                tokens.push(Token::LParen);
                i += 1;
                continue;
            }
            (')', _) => {
                tokens.push(Token::RParen);
                i += 1;
                continue;
            }
            ('>', Some('>')) => {
                tokens.push(Token::RedirectAppend);
                i += 2;
                continue;
            }
            ('>', Some('&')) | ('>', Some('|')) => {
                return Err(ParseError::Unsupported("fd duplication"));
            }
            ('>', _) => {
                tokens.push(Token::RedirectOut);
                i += 1;
                continue;
            }
            ('<', Some('<')) => return Err(ParseError::Unsupported("here-document")),
            ('<', Some('&')) | ('<', Some('>')) => {
                return Err(ParseError::Unsupported("fd duplication"));
            }
            ('<', _) => {
                tokens.push(Token::RedirectIn);
                i += 1;
                continue;
            }
            _ => {}
        }

        let mut word = WordBuilder::default();
        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() {
                break;
            }
            if is_operator_char(c) {
                if matches!(c, '<' | '>') && word.is_plain_digits() {
                    return Err(ParseError::Unsupported("fd redirection"));
                }
                break;
            }
            match c {
                '\\' => {
                    i += 1;
                    match chars.get(i) {
                        // line continuation
                        Some('\n') => word.started = true,
                        Some(&escaped) => word.push(escaped),
                        None => word.push('\\'),
                    }
                    i += 1;
                }
                '\'' => {
                    word.quoted = true;
                    word.started = true;
                    i += 1;
                    loop {
                        match chars.get(i) {
                            Some('\'') => {
                                i += 1;
                                break;
                            }
                            Some(&inner) => {
                                word.current.push(inner);
                                i += 1;
                            }
                            None => return Err(ParseError::UnterminatedQuote('\'')),
                        }
                    }
                }
                '"' => {
                    word.quoted = true;
                    word.started = true;
                    i += 1;
                    loop {
                        match chars.get(i) {
                            Some('"') => {
                                i += 1;
                                break;
                            }
                            Some('\\') => {
                                match chars.get(i + 1) {
                                    Some(&e) if matches!(e, '$' | '`' | '"' | '\\') => {
                                        word.current.push(e);
                                        i += 2;
                                    }
                                    Some('\n') => i += 2,
                                    Some(_) => {
                                        word.current.push('\\');
                                        i += 1;
                                    }
                                    None => return Err(ParseError::UnterminatedQuote('"')),
                                }
                            }
                            Some('$') => {
                                i += 1;
                                match read_variable(&chars, &mut i)? {
                                    Some(name) => word.push_var(name),
                                    None => word.current.push('$'),
                                }
                            }
                            Some('`') => return Err(ParseError::Unsupported("command substitution")),
                            Some(&inner) => {
                                word.current.push(inner);
                                i += 1;
                            }
                            None => return Err(ParseError::UnterminatedQuote('"')),
                        }
                    }
                }
                '$' => {
                    i += 1;
                    match read_variable(&chars, &mut i)? {
                        Some(name) => word.push_var(name),
                        None => word.push('$'),
                    }
                }
                '`' => return Err(ParseError::Unsupported("command substitution")),
                _ => {
                    word.push(c);
                    i += 1;
                }
            }
        }
        if let Some(w) = word.finish() {
            tokens.push(Token::Word(w));
        }
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

fn is_assignment(word: &Word) -> bool {
    if word.quoted {
        return false;
    }
    let Some(WordPart::Literal(first)) = word.parts.first() else {
        return false;
    };
    match first.split_once('=') {
        Some((name, _)) => {
            let mut chars = name.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

/// Recursive-descent parser over the token list.
pub struct ShellParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ShellParser {
    pub fn new(input: &str) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: tokenize(input)?,
            pos: 0,
        })
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub fn parse(&mut self) -> Result<ParsedCommand, ParseError> {
        if matches!(self.current(), Token::Eof) {
            return Err(ParseError::Empty);
        }
        let tree = self.parse_sequence()?;
        match self.current() {
            Token::Eof => Ok(tree),
            Token::RParen => Err(ParseError::UnmatchedParen),
            other => Err(ParseError::Unexpected(other.describe())),
        }
    }

    /// Commands joined by `&&`, `||`, `;`, strictly left to right.
    fn parse_sequence(&mut self) -> Result<ParsedCommand, ParseError> {
        let mut commands = vec![self.parse_pipeline()?];
        let mut operators = Vec::new();

        loop {
            let op = match self.current() {
                Token::And => Operator::And,
                Token::Or => Operator::Or,
                Token::Semi => Operator::Seq,
                _ => break,
            };
            self.advance();
            if op == Operator::Seq && matches!(self.current(), Token::Eof | Token::RParen) {
                // trailing ';'
                break;
            }
            if matches!(self.current(), Token::Eof | Token::RParen) {
                return Err(ParseError::MissingCommand(op.to_string()));
            }
            commands.push(self.parse_pipeline()?);
            operators.push(op);
        }

        if operators.is_empty() {
            return Ok(commands.remove(0));
        }
        Ok(ParsedCommand::Sequence {
            commands,
            operators,
        })
    }

    fn parse_pipeline(&mut self) -> Result<ParsedCommand, ParseError> {
        let mut commands = vec![self.parse_command()?];
        while matches!(self.current(), Token::Pipe) {
            self.advance();
            commands.push(self.parse_command()?);
        }
        if commands.len() == 1 {
            return Ok(commands.remove(0));
        }
        Ok(ParsedCommand::Pipeline { commands })
    }

    fn parse_command(&mut self) -> Result<ParsedCommand, ParseError> {
        if matches!(self.current(), Token::LParen) {
            self.advance();
            if matches!(self.current(), Token::RParen) {
                return Err(ParseError::MissingCommand("(".into()));
            }
            let inner = self.parse_sequence()?;
            if !matches!(self.current(), Token::RParen) {
                return Err(ParseError::UnmatchedParen);
            }
            self.advance();
            if matches!(
                self.current(),
                Token::RedirectOut | Token::RedirectAppend | Token::RedirectIn | Token::Word(_)
            ) {
                return Err(ParseError::Unsupported("redirection of a subshell"));
            }
            return Ok(ParsedCommand::Subshell {
                command: Box::new(inner),
            });
        }
        self.parse_simple_command()
    }

    fn parse_simple_command(&mut self) -> Result<ParsedCommand, ParseError> {
        let mut words = Vec::new();
        let mut redirects = Vec::new();

        loop {
            let mode = match self.current() {
                Token::Word(w) => {
                    words.push(w.clone());
                    self.advance();
                    continue;
                }
                Token::RedirectOut => RedirectMode::Overwrite,
                Token::RedirectAppend => RedirectMode::Append,
                Token::RedirectIn => RedirectMode::Input,
                _ => break,
            };
            self.advance();
            match self.advance() {
                Token::Word(target) => redirects.push(Redirect { mode, target }),
                _ => return Err(ParseError::MissingRedirectTarget),
            }
        }

        if words.is_empty() {
            return match self.current() {
                Token::LParen => Err(ParseError::Unexpected("(".into())),
                other => Err(ParseError::MissingCommand(other.describe())),
            };
        }
        if is_assignment(&words[0]) {
            return Err(ParseError::Unsupported("variable assignment"));
        }

        let cmd = words.remove(0);
        Ok(ParsedCommand::Simple {
            cmd,
            args: words,
            redirects,
        })
    }
}

pub fn parse_command_line(input: &str) -> Result<ParsedCommand, ParseError> {
    ShellParser::new(input)?.parse()
}
