//! Shell quoting and command templates.
//!
//! Every value interpolated into command text goes through [`quote`], which
//! yields exactly one POSIX shell word and never re-wraps a value the caller
//! already quoted.

use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

// Anything outside this class carries shell meaning (or splits words).
static SAFE_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[^\s\p{Cc}|&;<>()$`\\"'*?\[\]#~!{}^]+$"#).expect("valid safe-word pattern")
});

/// Quote a value so a POSIX shell reads it back as a single literal word.
pub fn quote(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }

    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        let inner = &value[1..value.len() - 1];
        if !inner.contains('\'') {
            return value.to_string();
        }
    }

    // Caller-supplied double quotes are kept as literal characters.
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        return single_quote(value);
    }

    if SAFE_WORD.is_match(value) {
        return value.to_string();
    }

    single_quote(value)
}

fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// True when [`quote`] would have to wrap the value.
pub fn needs_quoting(value: &str) -> bool {
    value.is_empty() || !SAFE_WORD.is_match(value)
}

pub fn quote_all(values: &[&str]) -> String {
    values.iter().map(|v| quote(v)).collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Rendered through [`quote`].
    Quoted,
    /// Inserted verbatim; the caller vouches for it.
    Raw,
}

/// A value waiting to be interpolated into a command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Value(String),
    Raw(String),
    List(Vec<String>),
}

impl Arg {
    pub fn raw(value: impl Into<String>) -> Self {
        Arg::Raw(value.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arg::List(values.into_iter().map(Into::into).collect())
    }

    fn render(&self) -> Interpolated {
        match self {
            Arg::Value(v) => Interpolated {
                raw: v.clone(),
                rendered: quote(v),
                kind: ArgKind::Quoted,
            },
            Arg::Raw(v) => Interpolated {
                raw: v.clone(),
                rendered: v.clone(),
                kind: ArgKind::Raw,
            },
            Arg::List(items) => Interpolated {
                raw: items.join(" "),
                rendered: items.iter().map(|i| quote(i)).collect::<Vec<_>>().join(" "),
                kind: ArgKind::Quoted,
            },
        }
    }
}

/// Conversion used by the `cmd!` macro for each interpolated expression.
pub trait IntoArg {
    fn into_arg(self) -> Arg;
}

impl IntoArg for Arg {
    fn into_arg(self) -> Arg {
        self
    }
}

impl IntoArg for &Arg {
    fn into_arg(self) -> Arg {
        self.clone()
    }
}

impl IntoArg for String {
    fn into_arg(self) -> Arg {
        Arg::Value(self)
    }
}

impl IntoArg for &String {
    fn into_arg(self) -> Arg {
        Arg::Value(self.clone())
    }
}

impl IntoArg for &str {
    fn into_arg(self) -> Arg {
        Arg::Value(self.to_string())
    }
}

impl IntoArg for &Path {
    fn into_arg(self) -> Arg {
        Arg::Value(self.to_string_lossy().into_owned())
    }
}

impl IntoArg for PathBuf {
    fn into_arg(self) -> Arg {
        Arg::Value(self.to_string_lossy().into_owned())
    }
}

impl IntoArg for &PathBuf {
    fn into_arg(self) -> Arg {
        Arg::Value(self.to_string_lossy().into_owned())
    }
}

impl IntoArg for Vec<String> {
    fn into_arg(self) -> Arg {
        Arg::List(self)
    }
}

impl IntoArg for &[&str] {
    fn into_arg(self) -> Arg {
        Arg::list(self.iter().copied())
    }
}

macro_rules! numeric_args {
    ($($t:ty),*) => {
        $(impl IntoArg for $t {
            fn into_arg(self) -> Arg {
                Arg::Value(self.to_string())
            }
        })*
    };
}

numeric_args!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64, bool, char);

/// One interpolated value as it ended up in the command text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolated {
    pub raw: String,
    pub rendered: String,
    pub kind: ArgKind,
}

/// Fully rendered command text plus the values that were spliced into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    text: String,
    args: Vec<Interpolated>,
}

impl CommandSpec {
    /// Literal command text, nothing interpolated.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            args: Vec::new(),
        }
    }

    /// Replaces each `{}` in `template` with the next argument, quoted.
    /// Surplus arguments are appended separated by spaces; placeholders
    /// without an argument stay as `{}`.
    pub fn from_template(template: &str, args: Vec<Arg>) -> Self {
        let rendered: Vec<Interpolated> = args.iter().map(Arg::render).collect();
        let mut text = String::with_capacity(template.len());
        let mut pieces = template.split("{}");
        let mut values = rendered.iter();

        if let Some(first) = pieces.next() {
            text.push_str(first);
        }
        for piece in pieces {
            match values.next() {
                Some(v) => text.push_str(&v.rendered),
                None => text.push_str("{}"),
            }
            text.push_str(piece);
        }
        for extra in values {
            if !text.is_empty() && !text.ends_with(' ') {
                text.push(' ');
            }
            text.push_str(&extra.rendered);
        }

        Self {
            text,
            args: rendered,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn args(&self) -> &[Interpolated] {
        &self.args
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for CommandSpec {
    fn from(text: &str) -> Self {
        CommandSpec::new(text)
    }
}

impl From<String> for CommandSpec {
    fn from(text: String) -> Self {
        CommandSpec::new(text)
    }
}

impl From<&String> for CommandSpec {
    fn from(text: &String) -> Self {
        CommandSpec::new(text.clone())
    }
}

/// Build a [`CommandSpec`] from a template, quoting every interpolated value.
///
/// ```
/// let name = "John Doe";
/// let spec = cmdflow::cmd!("echo hello {}", name);
/// assert_eq!(spec.text(), "echo hello 'John Doe'");
/// ```
#[macro_export]
macro_rules! cmd {
    ($template:expr) => {
        $crate::CommandSpec::from_template($template, ::std::vec::Vec::new())
    };
    ($template:expr, $($arg:expr),+ $(,)?) => {
        $crate::CommandSpec::from_template(
            $template,
            ::std::vec![$($crate::quote::IntoArg::into_arg($arg)),+],
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_empty() {
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn test_quote_safe_words_untouched() {
        assert_eq!(quote("hello"), "hello");
        assert_eq!(quote("/path/to/file.txt"), "/path/to/file.txt");
        assert_eq!(quote("key=value"), "key=value");
        assert_eq!(quote("user@host:22"), "user@host:22");
        assert_eq!(quote("héllo"), "héllo");
    }

    #[test]
    fn test_quote_metacharacters() {
        assert_eq!(quote("hello world"), "'hello world'");
        assert_eq!(quote("$HOME"), "'$HOME'");
        assert_eq!(quote("a;b"), "'a;b'");
        assert_eq!(quote("*.rs"), "'*.rs'");
        assert_eq!(quote("`id`"), "'`id`'");
        assert_eq!(quote("line\nbreak"), "'line\nbreak'");
    }

    #[test]
    fn test_quote_embedded_single_quote() {
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote("'"), r"''\'''");
        assert_eq!(quote("\""), "'\"'");
    }

    #[test]
    fn test_quote_preserves_caller_quoting() {
        assert_eq!(quote("'already quoted'"), "'already quoted'");
        assert_eq!(quote("\"double\""), "'\"double\"'");
        assert_eq!(quote("\"it's\""), r#"'"it'\''s"'"#);
        // Inner quote makes the single-quoted form unusable as-is.
        assert_eq!(quote("'a'b'"), r"''\''a'\''b'\'''");
    }

    #[test]
    fn test_quote_injection_round_trips_through_word_splitting() {
        let hostile = [
            "'; rm -rf /; echo 'hacked",
            "$(whoami)",
            "a b\tc",
            "it's \"fine\"",
            "\\",
            "{a,b}",
            "x > /tmp/out",
            "",
            "'",
        ];
        for value in hostile {
            let words = shell_words::split(&quote(value)).unwrap();
            assert_eq!(words, vec![value.to_string()], "value: {:?}", value);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_quote_survives_real_shell() {
        let values = [
            "'; rm -rf /; echo 'hacked",
            "$(whoami) `id` $HOME",
            "a b\tc\nd",
            "it's \"fine\"",
            "\\",
            "*.rs ~ {a,b} !x",
            "x > /tmp/out | cat &",
            "",
            "'",
            "héllo wörld",
        ];
        for value in values {
            let output = std::process::Command::new("/bin/sh")
                .arg("-c")
                .arg(format!("printf '%s' {}", quote(value)))
                .output()
                .unwrap();
            assert!(output.status.success(), "value: {:?}", value);
            assert_eq!(output.stdout, value.as_bytes(), "value: {:?}", value);
        }
    }

    #[test]
    fn test_needs_quoting() {
        assert!(!needs_quoting("plain"));
        assert!(needs_quoting(""));
        assert!(needs_quoting("two words"));
        assert!(needs_quoting("$PATH"));
    }

    #[test]
    fn test_quote_all() {
        assert_eq!(quote_all(&["echo", "hello world", "x"]), "echo 'hello world' x");
    }

    #[test]
    fn test_template_interpolation() {
        let spec = CommandSpec::from_template("cp {} {}", vec!["my file".into_arg(), "/tmp".into_arg()]);
        assert_eq!(spec.text(), "cp 'my file' /tmp");
        assert_eq!(spec.args().len(), 2);
        assert_eq!(spec.args()[0].raw, "my file");
        assert_eq!(spec.args()[0].kind, ArgKind::Quoted);
    }

    #[test]
    fn test_template_raw_and_list() {
        let spec = CommandSpec::from_template(
            "ls {} {}",
            vec![Arg::raw("-la"), Arg::list(["a b", "c"])],
        );
        assert_eq!(spec.text(), "ls -la 'a b' c");
        assert_eq!(spec.args()[0].kind, ArgKind::Raw);
    }

    #[test]
    fn test_template_surplus_and_missing_args() {
        let spec = CommandSpec::from_template("echo", vec!["a b".into_arg(), 3.into_arg()]);
        assert_eq!(spec.text(), "echo 'a b' 3");

        let spec = CommandSpec::from_template("echo {} {}", vec!["x".into_arg()]);
        assert_eq!(spec.text(), "echo x {}");
    }

    #[test]
    fn test_cmd_macro() {
        let file = "report 2024.txt";
        let spec = crate::cmd!("cat {}", file);
        assert_eq!(spec.text(), "cat 'report 2024.txt'");

        let spec = crate::cmd!("echo done");
        assert_eq!(spec.text(), "echo done");
    }
}
