//! A small LaTeX-to-plain-text converter.
//!
//! This is not a TeX engine. It removes markup well enough for spelling and
//! grammar tools to see prose, and records for every emitted character where
//! it came from so findings can be reported against the original source.

use tracing::debug;

use crate::{LineIndex, Position, PositionTranslator};

/// Commands whose first mandatory argument is not prose.
const SKIP_ARGUMENT: &[&str] = &[
    "label",
    "ref",
    "cref",
    "Cref",
    "eqref",
    "pageref",
    "autoref",
    "cite",
    "citep",
    "citet",
    "nocite",
    "usepackage",
    "documentclass",
    "includegraphics",
    "input",
    "include",
    "bibliography",
    "bibliographystyle",
    "url",
    "href",
    "hspace",
    "vspace",
    "pagestyle",
    "thispagestyle",
];

/// Environments whose whole body is dropped.
const MATH_ENVIRONMENTS: &[&str] = &[
    "equation",
    "equation*",
    "align",
    "align*",
    "gather",
    "gather*",
    "multline",
    "multline*",
    "displaymath",
    "math",
];

/// Commands replaced by literal text.
const EXPANSIONS: &[(&str, &str)] = &[
    ("ldots", "..."),
    ("dots", "..."),
    ("LaTeX", "LaTeX"),
    ("TeX", "TeX"),
    ("textbackslash", "\\"),
];

/// Characters that may be escaped with a backslash to be printed literally.
const ESCAPABLE: &str = "%&$#_{}";

/// A structural problem found while detexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Where in the source the problem starts, if known.
    pub position: Option<Position>,
    /// Human readable explanation.
    pub message: String,
}

/// Result of detexing a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detexed {
    /// The plain-text view.
    pub plain: String,
    /// Source character offset for every plain character, plus one end entry.
    pub char_map: Vec<Option<usize>>,
    /// Structural errors, in source order of discovery.
    pub errors: Vec<ParseError>,
}

impl Detexed {
    /// Builds the translator for this output. `source` must be the detexed input.
    pub fn translator(&self, source: &str) -> PositionTranslator {
        PositionTranslator::new(source, &self.plain, self.char_map.clone())
    }
}

/// Converts LaTeX source into plain text.
pub fn detex(source: &str) -> Detexed {
    let detexed = Detexer::new(source).run();
    debug!(
        "Detexed {} source chars into {} plain chars ({} errors)",
        source.chars().count(),
        detexed.plain.chars().count(),
        detexed.errors.len()
    );
    detexed
}

struct Detexer {
    chars: Vec<char>,
    pos: usize,
    lines: LineIndex,
    plain: String,
    char_map: Vec<Option<usize>>,
    errors: Vec<ParseError>,
    braces: Vec<usize>,
    environments: Vec<(String, usize)>,
}

impl Detexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            lines: LineIndex::new(source),
            plain: String::with_capacity(source.len()),
            char_map: Vec::with_capacity(source.len() + 1),
            errors: Vec::new(),
            braces: Vec::new(),
            environments: Vec::new(),
        }
    }

    fn run(mut self) -> Detexed {
        while let Some(c) = self.peek() {
            match c {
                '%' => self.skip_comment(),
                '\\' => self.control_sequence(),
                '{' => {
                    self.braces.push(self.pos);
                    self.pos += 1;
                }
                '}' => {
                    if self.braces.pop().is_none() {
                        self.error_at(self.pos, "unmatched closing brace '}'");
                    }
                    self.pos += 1;
                }
                '$' => self.inline_math(),
                '~' => {
                    self.emit(' ', self.pos);
                    self.pos += 1;
                }
                _ => {
                    self.emit(c, self.pos);
                    self.pos += 1;
                }
            }
        }

        for open in std::mem::take(&mut self.braces) {
            self.error_at(open, "unclosed brace '{'");
        }
        for (env, start) in std::mem::take(&mut self.environments) {
            self.error_at(start, format!("environment '{env}' is never closed"));
        }

        self.char_map.push(Some(self.chars.len()));
        Detexed {
            plain: self.plain,
            char_map: self.char_map,
            errors: self.errors,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn emit(&mut self, c: char, source_offset: usize) {
        self.plain.push(c);
        self.char_map.push(Some(source_offset));
    }

    fn error_at(&mut self, offset: usize, message: impl Into<String>) {
        self.errors.push(ParseError {
            position: self.lines.position(offset),
            message: message.into(),
        });
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_inline_spaces(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.pos += 1;
        }
    }

    fn control_sequence(&mut self) {
        let start = self.pos;
        self.pos += 1;

        let Some(next) = self.peek() else {
            return;
        };

        if next.is_ascii_alphabetic() {
            let name = self.read_command_name();
            self.command(&name, start);
            return;
        }

        self.pos += 1;
        match next {
            '\\' | ' ' => self.emit(' ', start),
            '(' => self.skip_until("\\)", start, "unclosed inline math '\\('"),
            '[' => self.skip_until("\\]", start, "unclosed display math '\\['"),
            c if ESCAPABLE.contains(c) => self.emit(c, start),
            // accents and other control symbols carry no prose
            _ => {}
        }
    }

    fn read_command_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek().filter(char::is_ascii_alphabetic) {
            name.push(c);
            self.pos += 1;
        }
        if self.peek() == Some('*') {
            name.push('*');
            self.pos += 1;
        }
        name
    }

    fn command(&mut self, name: &str, start: usize) {
        match name {
            "begin" => {
                let Some(env) = self.read_group() else {
                    return;
                };
                if MATH_ENVIRONMENTS.contains(&env.as_str()) {
                    let end = format!("\\end{{{env}}}");
                    let message = format!("environment '{env}' is never closed");
                    self.skip_until(&end, start, &message);
                } else {
                    self.environments.push((env, start));
                }
            }
            "end" => {
                let Some(env) = self.read_group() else {
                    return;
                };
                match self.environments.pop() {
                    Some((open, _)) if open == env => {}
                    Some((open, open_start)) => {
                        self.error_at(
                            start,
                            format!("environment '{open}' is closed by '\\end{{{env}}}'"),
                        );
                        // keep the outer environment open so its own \end still matches
                        if let Some(pos) = self.environments.iter().rposition(|(e, _)| *e == env) {
                            self.environments.truncate(pos);
                        } else {
                            self.environments.push((open, open_start));
                        }
                    }
                    None => {
                        self.error_at(
                            start,
                            format!("'\\end{{{env}}}' without matching '\\begin'"),
                        );
                    }
                }
            }
            _ => {
                if let Some((_, text)) = EXPANSIONS.iter().find(|(cmd, _)| *cmd == name) {
                    for c in text.chars() {
                        self.emit(c, start);
                    }
                } else if SKIP_ARGUMENT.contains(&name) {
                    self.skip_optional_arguments();
                    self.read_group();
                } else {
                    self.skip_inline_spaces();
                }
            }
        }
    }

    /// Skips `[...]` arguments directly following a command.
    fn skip_optional_arguments(&mut self) {
        while self.peek() == Some('[') {
            let open = self.pos;
            let mut depth = 0usize;
            while let Some(c) = self.peek() {
                self.pos += 1;
                match c {
                    '[' => depth += 1,
                    ']' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            if depth > 0 {
                self.error_at(open, "unclosed optional argument '['");
            }
        }
    }

    /// Reads a balanced `{...}` group and returns its raw content.
    fn read_group(&mut self) -> Option<String> {
        self.skip_inline_spaces();
        if self.peek() != Some('{') {
            return None;
        }
        let open = self.pos;
        self.pos += 1;
        let mut depth = 1usize;
        let mut content = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(content);
                    }
                }
                _ => {}
            }
            content.push(c);
        }
        self.error_at(open, "unclosed brace '{'");
        None
    }

    fn inline_math(&mut self) {
        let start = self.pos;
        if self.chars.get(self.pos + 1) == Some(&'$') {
            self.pos += 2;
            self.skip_until("$$", start, "unclosed display math '$$'");
            return;
        }

        self.pos += 1;
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => self.pos += 1,
                '$' => return,
                _ => {}
            }
        }
        self.error_at(start, "unclosed inline math '$'");
    }

    /// Moves past the next occurrence of `terminator`, or reports an error at `start`.
    fn skip_until(&mut self, terminator: &str, start: usize, message: &str) {
        let needle: Vec<char> = terminator.chars().collect();
        while self.pos < self.chars.len() {
            if self.chars[self.pos..].starts_with(&needle) {
                self.pos += needle.len();
                return;
            }
            self.pos += 1;
        }
        self.error_at(start, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::plain_text("Hello world.", "Hello world.")]
    #[case::comment("Text % comment\nmore", "Text \nmore")]
    #[case::escaped_percent("50\\% off", "50% off")]
    #[case::formatting("a \\textbf{bold} word", "a bold word")]
    #[case::dropped_command_swallows_space("\\item First", "First")]
    #[case::reference("see \\ref{fig:a}.", "see .")]
    #[case::optional_argument("\\cite[p.~3]{knuth} done", " done")]
    #[case::inline_math("value $x^2$ here", "value  here")]
    #[case::display_math("a $$x$$ b", "a  b")]
    #[case::bracket_math("a \\[x\\] b", "a  b")]
    #[case::math_environment("a\n\\begin{equation}\nx\n\\end{equation}\nb", "a\n\nb")]
    #[case::tilde("Fig.~1", "Fig. 1")]
    #[case::expansion("wait\\ldots", "wait...")]
    #[case::environment("\\begin{itemize}\n\\item x\n\\end{itemize}", "\nx\n")]
    fn test_plain_output(#[case] source: &str, #[case] expected: &str) {
        let detexed = detex(source);
        assert_eq!(detexed.plain, expected);
        assert!(detexed.errors.is_empty(), "{:?}", detexed.errors);
    }

    #[test]
    fn test_char_map_has_end_entry() {
        let source = "a \\emph{b}";
        let detexed = detex(source);
        assert_eq!(detexed.plain, "a b");
        assert_eq!(
            detexed.char_map,
            vec![Some(0), Some(1), Some(8), Some(10)]
        );
    }

    #[test]
    fn test_expansion_characters_share_span_start() {
        let detexed = detex("x\\ldots");
        assert_eq!(&detexed.char_map[1..4], &[Some(1), Some(1), Some(1)]);
    }

    #[test]
    fn test_translator_roundtrip() {
        let source = "\\section{Intro}\nThis is \\emph{wrnog}.";
        let detexed = detex(source);
        let offset = detexed.plain.find("wrnog").unwrap();
        let offset = detexed.plain[..offset].chars().count();
        let translator = detexed.translator(source);
        assert_eq!(translator.to_original(offset), Some(Position::new(2, 15)));
    }

    #[test]
    fn test_unmatched_closing_brace() {
        let detexed = detex("ok\nbad }");
        assert_eq!(detexed.errors.len(), 1);
        assert_eq!(detexed.errors[0].position, Some(Position::new(2, 5)));
    }

    #[test]
    fn test_unclosed_brace() {
        let detexed = detex("\\textit{never");
        assert_eq!(detexed.errors.len(), 1);
        assert!(detexed.errors[0].message.contains("unclosed brace"));
        assert_eq!(detexed.errors[0].position, Some(Position::new(1, 8)));
    }

    #[test]
    fn test_unclosed_inline_math() {
        let detexed = detex("cost $5");
        assert_eq!(detexed.errors.len(), 1);
        assert_eq!(detexed.errors[0].position, Some(Position::new(1, 6)));
    }

    #[test]
    fn test_mismatched_environment() {
        let detexed = detex("\\begin{itemize}\n\\end{enumerate}");
        assert_eq!(detexed.errors.len(), 2);
        assert!(detexed.errors[0].message.contains("closed by"));
        assert!(detexed.errors[1].message.contains("never closed"));
    }

    #[test]
    fn test_end_without_begin() {
        let detexed = detex("\\end{document}");
        assert_eq!(detexed.errors.len(), 1);
        assert!(detexed.errors[0].message.contains("without matching"));
    }

    #[test]
    fn test_unclosed_math_environment() {
        let detexed = detex("\\begin{align}\nx");
        assert_eq!(detexed.errors.len(), 1);
        assert_eq!(detexed.errors[0].position, Some(Position::new(1, 1)));
    }

    #[test]
    fn test_empty_source() {
        let detexed = detex("");
        assert_eq!(detexed.plain, "");
        assert_eq!(detexed.char_map, vec![Some(0)]);
    }
}
