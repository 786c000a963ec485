use tracing::debug;

use crate::checker::{Checker, CheckerError};
use crate::context::RunContext;
use crate::document::Document;
use crate::problem::{Problem, Severity};
use crate::process::{find_executable, run_command};

/// Runs `aspell` in pipe mode over the plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aspell;

impl Aspell {
    pub const NAME: &'static str = "Aspell";
}

impl Checker for Aspell {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, ctx: &RunContext, document: &Document) -> Result<Vec<Problem>, CheckerError> {
        let program = find_executable("aspell")?;
        let language = ctx
            .module_str(Self::NAME, "lang")
            .or(ctx.language())
            .unwrap_or("en");
        let args = vec!["-a".to_string(), format!("--lang={language}")];

        let output = run_command(
            &program,
            &args,
            Some(&pipe_input(document.plain())),
            ctx.tool_timeout(),
        )?
        .ensure_success(Self::NAME)?;

        parse_output(&output.stdout, ctx, document)
    }
}

/// Prefixes every line with `^` so aspell never reads it as a command.
fn pipe_input(plain: &str) -> String {
    plain
        .lines()
        .map(|line| format!("^{line}\n"))
        .collect()
}

/// Parses `aspell -a` output for the plain text of `document`.
///
/// Aspell answers every input line with one record per word followed by an
/// empty line. Offsets count characters from the start of the input line,
/// including the `^` prefix.
pub(crate) fn parse_output(
    output: &str,
    ctx: &RunContext,
    document: &Document,
) -> Result<Vec<Problem>, CheckerError> {
    let translator = document.translator();
    let plain_lines = translator.plain_lines();
    let mut problems = Vec::new();
    let mut line = 1u32;

    for record in output.lines() {
        let (word, offset, suggestions) = match record.chars().next() {
            None => {
                line += 1;
                continue;
            }
            Some('@' | '*' | '+' | '-') => continue,
            Some('&') => parse_miss(record)?,
            Some('#') => parse_none(record)?,
            Some(_) => {
                return Err(CheckerError::MalformedOutput(format!(
                    "unexpected aspell record: {record}"
                )));
            }
        };

        let position = plain_lines
            .line_start(line)
            .and_then(|start| translator.to_original(start + offset.saturating_sub(1)));

        problems.push(
            Problem::builder(Aspell::NAME, word)
                .with_file(document.path())
                .with_position(position)
                .with_type("spelling")
                .with_category("spelling")
                .with_severity(Severity::Error)
                .with_description(format!("Possible spelling mistake: '{word}'."))
                .with_suggestions(suggestions)
                .with_key(format!("spelling/{word}"))
                .with_language(ctx.language())
                .build(),
        );
    }
    debug!("aspell reported {} problem(s)", problems.len());
    Ok(problems)
}

/// `& word count offset: sugg1, sugg2`
fn parse_miss(record: &str) -> Result<(&str, usize, Vec<&str>), CheckerError> {
    let malformed = || CheckerError::MalformedOutput(format!("invalid aspell record: {record}"));
    let (head, suggestions) = record.split_once(':').ok_or_else(malformed)?;
    let [_, word, _count, offset] = head.split_whitespace().collect::<Vec<_>>()[..] else {
        return Err(malformed());
    };
    let offset = offset.parse().map_err(|_| malformed())?;
    let suggestions = suggestions
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    Ok((word, offset, suggestions))
}

/// `# word offset`
fn parse_none(record: &str) -> Result<(&str, usize, Vec<&str>), CheckerError> {
    let malformed = || CheckerError::MalformedOutput(format!("invalid aspell record: {record}"));
    let [_, word, offset] = record.split_whitespace().collect::<Vec<_>>()[..] else {
        return Err(malformed());
    };
    let offset = offset.parse().map_err(|_| malformed())?;
    Ok((word, offset, Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use texbuddy_text::Position;

    const HEADER: &str = "@(#) International Ispell Version 3.1.20 (but really Aspell 0.60.8)\n";

    #[test]
    fn test_pipe_input() {
        assert_eq!(pipe_input("a b\n\nc"), "^a b\n^\n^c\n");
    }

    #[test]
    fn test_parse_output_translates_positions() {
        let doc = Document::from_source("doc.tex", "\\section{Intro}\nThis is \\emph{wrnog}.");
        assert_eq!(doc.plain(), "Intro\nThis is wrnog.");

        let output = format!("{HEADER}*\n\n*\n*\n& wrnog 3 9: wrong, wrung, Wong\n\n");
        let problems = parse_output(&output, &RunContext::default(), &doc).unwrap();

        assert_eq!(problems.len(), 1);
        let problem = &problems[0];
        assert_eq!(problem.text(), "wrnog");
        assert_eq!(problem.position(), Some(Position::new(2, 15)));
        assert_eq!(problem.category(), Some("spelling"));
        assert_eq!(problem.severity(), Severity::Error);
        assert_eq!(problem.suggestions(), ["wrong", "wrung", "Wong"]);
        assert_eq!(problem.key(), "en/spelling/wrnog");
    }

    #[test]
    fn test_parse_output_without_suggestions() {
        let doc = Document::from_source("doc.tex", "xqzt");
        let output = format!("{HEADER}# xqzt 1\n\n");
        let problems = parse_output(&output, &RunContext::default(), &doc).unwrap();

        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].position(), Some(Position::new(1, 1)));
        assert!(problems[0].suggestions().is_empty());
    }

    #[test]
    fn test_parse_output_malformed() {
        let doc = Document::from_source("doc.tex", "x");
        let err = parse_output("& broken\n", &RunContext::default(), &doc).unwrap_err();
        assert!(matches!(err, CheckerError::MalformedOutput(_)));
    }
}
