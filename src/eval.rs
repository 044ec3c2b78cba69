//! Accumulates shell statements for the calling shell to `eval`.
//!
//! A child process cannot change the environment of the shell that started
//! it, so every effect of a `modm` run (exports, unsets, and messages for the
//! user) is queued here as a statement and printed as one line at the end.

/// Default width used when reflowing messages.
pub const TEXT_WIDTH: usize = 80;

const ERROR_PREFIX: &str = "modm: Error: ";
const INTERNAL_ERROR_PREFIX: &str = "modm: Internal error: ";

/// Color used to highlight a piece of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Highlight {
    #[default]
    Normal,
    Info,
    Success,
    Error,
}

impl Highlight {
    fn escape_codes(self) -> Option<(&'static str, &'static str)> {
        // Written for printf to interpret, hence the literal backslashes.
        match self {
            Highlight::Normal => None,
            Highlight::Info => Some((r"\033[34m", r"\033[0m")),
            Highlight::Success => Some((r"\033[32m", r"\033[0m")),
            Highlight::Error => Some((r"\033[31m", r"\033[0m")),
        }
    }
}

/// Buffer of shell statements plus the helpers that produce them.
#[derive(Debug, Clone)]
pub struct EvalEmitter {
    statements: Vec<String>,
    use_colors: bool,
    width: usize,
}

impl Default for EvalEmitter {
    fn default() -> Self {
        Self::new(true, TEXT_WIDTH)
    }
}

impl EvalEmitter {
    pub fn new(use_colors: bool, width: usize) -> Self {
        Self {
            statements: Vec::new(),
            use_colors,
            width,
        }
    }

    /// Queue an already formed shell statement.
    pub fn execute(&mut self, statement: impl Into<String>) {
        self.statements.push(statement.into());
    }

    /// Join all queued statements with `;` and empty the buffer.
    pub fn drain(&mut self) -> String {
        let joined = self.statements.join(";");
        self.statements.clear();
        joined
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Escape `text` for use inside the double-quoted format string of
    /// `printf`, so that the printed bytes are exactly `text`.
    ///
    /// Each character is looked at once; replacements are never rescanned.
    pub fn quote(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            match ch {
                '$' => out.push_str(r"\$"),
                '`' => out.push_str(r"\`"),
                '"' => out.push_str(r#"\""#),
                '\n' => out.push_str(r"\n"),
                // The shell halves these, then printf halves them again.
                '\\' => out.push_str(r"\\\\"),
                '%' => out.push_str("%%"),
                c => out.push(c),
            }
        }
        out
    }

    /// Surround `text` with the color codes for `kind`, unless colors are
    /// disabled.
    pub fn highlight(&self, text: &str, kind: Highlight) -> String {
        match kind.escape_codes() {
            Some((prefix, suffix)) if self.use_colors => format!("{prefix}{text}{suffix}"),
            _ => text.to_string(),
        }
    }

    /// Queue a statement that prints `message`.
    pub fn echo(&mut self, message: &str, kind: Highlight, newline: bool, dedent: bool) {
        let wrapped = wrap(message, self.width, true, dedent);
        let body = self.highlight(&Self::quote(&wrapped), kind);
        self.push_printf(body, newline);
    }

    /// Queue a statement that prints several pieces on one line, each with its
    /// own highlighting. The pieces are not reflowed.
    pub fn echo_segments(&mut self, segments: &[(&str, Highlight)], newline: bool) {
        let body: String = segments
            .iter()
            .map(|(text, kind)| self.highlight(&Self::quote(text), *kind))
            .collect();
        self.push_printf(body, newline);
    }

    /// Print `message` as an error, one prefixed line per wrapped line.
    pub fn report_error(&mut self, message: &str, internal: bool) {
        let prefix = if internal {
            INTERNAL_ERROR_PREFIX
        } else {
            ERROR_PREFIX
        };
        let width = self.width.saturating_sub(prefix.len()).max(1);
        for line in wrap(message, width, true, false).lines() {
            self.echo(&format!("{prefix}{line}"), Highlight::Error, true, false);
        }
    }

    /// Queue `export KEY='VALUE'`.
    ///
    /// A value with newlines is rebuilt by `printf` instead, so the output
    /// stays on one line.
    pub fn export(&mut self, key: &str, value: &str) {
        if value.contains(['\n', '\r']) {
            // Command substitution strips trailing newlines; the `x` guards them.
            let body = Self::quote(value).replace('\r', r"\r");
            self.execute(format!("{key}=\"$(printf \"{body}x\")\""));
            self.execute(format!("export {key}=\"${{{key}%x}}\""));
            return;
        }
        let value = value.replace('\'', r"'\''");
        self.execute(format!("export {key}='{value}'"));
    }

    /// Queue `unset KEY`.
    pub fn unset(&mut self, key: &str) {
        self.execute(format!("unset {key}"));
    }

    fn push_printf(&mut self, body: String, newline: bool) {
        let nl = if newline { r"\n" } else { "" };
        self.execute(format!("printf \"{body}{nl}\""));
    }
}

/// Reflow `text` so that no line is longer than `width` characters.
///
/// With `dedent`, whitespace common to the start of every non-blank line is
/// removed first. With `keep_indent`, continuation lines repeat the leading
/// spaces of the line they were split from. A trailing newline survives.
pub fn wrap(text: &str, width: usize, keep_indent: bool, dedent: bool) -> String {
    let text = if dedent {
        dedent_text(text)
    } else {
        text.to_string()
    };
    let final_newline = text.ends_with('\n');

    let lines: Vec<String> = text
        .lines()
        .map(|line| {
            let indent = if keep_indent {
                &line[..line.len() - line.trim_start_matches(' ').len()]
            } else {
                ""
            };
            fill_line(line, width.max(1), indent)
        })
        .collect();

    let mut out = lines.join("\n");
    if final_newline {
        out.push('\n');
    }
    out
}

fn fill_line(line: &str, width: usize, indent: &str) -> String {
    if line.chars().count() <= width {
        return line.to_string();
    }
    let indent = if indent.len() < width { indent } else { "" };

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    // Whether `current` holds a word yet.
    let mut has_content = false;

    for chunk in split_chunks(line) {
        let chunk_len = chunk.chars().count();
        let is_space = chunk.starts_with(char::is_whitespace);

        if current_len + chunk_len <= width {
            current.push_str(chunk);
            current_len += chunk_len;
            has_content |= !is_space;
            continue;
        }
        if is_space {
            // Whitespace at a break is dropped.
            if has_content {
                lines.push(current.trim_end().to_string());
                current = indent.to_string();
                current_len = indent.chars().count();
                has_content = false;
            }
            continue;
        }
        if has_content {
            lines.push(current.trim_end().to_string());
            current = indent.to_string();
            current_len = indent.chars().count();
        }
        // Break words that do not fit on a line of their own.
        let mut rest: Vec<char> = chunk.chars().collect();
        while current_len + rest.len() > width {
            let take = width.saturating_sub(current_len);
            current.extend(rest.drain(..take));
            lines.push(current.trim_end().to_string());
            current = indent.to_string();
            current_len = indent.chars().count();
        }
        current_len += rest.len();
        current.extend(rest);
        has_content = true;
    }
    if has_content || lines.is_empty() {
        lines.push(current.trim_end().to_string());
    }
    lines.join("\n")
}

/// Split into alternating runs of whitespace and non-whitespace.
fn split_chunks(line: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut prev_space: Option<bool> = None;
    for (i, ch) in line.char_indices() {
        let space = ch.is_whitespace();
        if prev_space.is_some_and(|p| p != space) {
            chunks.push(&line[start..i]);
            start = i;
        }
        prev_space = Some(space);
    }
    if start < line.len() {
        chunks.push(&line[start..]);
    }
    chunks
}

/// Remove whitespace common to the start of all non-blank lines. Blank lines
/// become empty.
fn dedent_text(text: &str) -> String {
    let margin = text
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| &line[..line.len() - line.trim_start().len()])
        .reduce(|a, b| {
            let common = a
                .char_indices()
                .zip(b.chars())
                .find(|((_, x), y)| x != y)
                .map_or(a.len().min(b.len()), |((i, _), _)| i);
            &a[..common]
        })
        .unwrap_or("");

    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                line.strip_prefix(margin).unwrap_or(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_joins_and_clears() {
        let mut be = EvalEmitter::default();
        assert_eq!(be.drain(), "");
        be.execute("a=1");
        be.execute("b=2");
        assert_eq!(be.drain(), "a=1;b=2");
        assert!(be.is_empty());
        assert_eq!(be.drain(), "");
    }

    #[test]
    fn test_quote_escapes_each_character_once() {
        assert_eq!(EvalEmitter::quote("$HOME"), r"\$HOME");
        assert_eq!(EvalEmitter::quote("`ls`"), r"\`ls\`");
        assert_eq!(EvalEmitter::quote(r#"say "x""#), r#"say \"x\""#);
        assert_eq!(EvalEmitter::quote("a\nb"), r"a\nb");
        assert_eq!(EvalEmitter::quote(r"\$"), r"\\\\\$");
        assert_eq!(EvalEmitter::quote("100%"), "100%%");
    }

    #[test]
    fn test_highlight() {
        let colored = EvalEmitter::new(true, TEXT_WIDTH);
        assert_eq!(colored.highlight("x", Highlight::Normal), "x");
        assert_eq!(colored.highlight("x", Highlight::Error), r"\033[31mx\033[0m");
        assert_eq!(colored.highlight("x", Highlight::Info), r"\033[34mx\033[0m");
        assert_eq!(colored.highlight("x", Highlight::Success), r"\033[32mx\033[0m");

        let plain = EvalEmitter::new(false, TEXT_WIDTH);
        assert_eq!(plain.highlight("x", Highlight::Error), "x");
    }

    #[test]
    fn test_echo() {
        let mut be = EvalEmitter::new(false, TEXT_WIDTH);
        be.echo("costs $5", Highlight::Normal, true, false);
        be.echo("no newline", Highlight::Error, false, false);
        assert_eq!(be.drain(), r#"printf "costs \$5\n";printf "no newline""#);
    }

    #[test]
    fn test_echo_segments() {
        let mut be = EvalEmitter::new(true, TEXT_WIDTH);
        be.echo_segments(&[("l", Highlight::Normal), ("oad", Highlight::Info)], true);
        assert_eq!(be.drain(), r#"printf "l\033[34moad\033[0m\n""#);
    }

    #[test]
    fn test_report_error_prefixes_every_line() {
        let mut be = EvalEmitter::new(false, 30);
        be.report_error("one two three four five six", false);
        assert_eq!(
            be.drain(),
            r#"printf "modm: Error: one two three\n";printf "modm: Error: four five six\n""#
        );

        be.report_error("boom", true);
        assert_eq!(be.drain(), r#"printf "modm: Internal error: boom\n""#);
    }

    #[test]
    fn test_export_and_unset() {
        let mut be = EvalEmitter::default();
        be.export("X", "it's");
        be.unset("Y");
        assert_eq!(be.drain(), r"export X='it'\''s';unset Y");
    }

    #[test]
    fn test_export_with_newlines_stays_on_one_line() {
        let mut be = EvalEmitter::default();
        be.export("X", "a\nb\n");
        let out = be.drain();
        assert!(!out.contains('\n'));
        assert_eq!(out, r#"X="$(printf "a\nb\nx")";export X="${X%x}""#);
    }

    #[test]
    fn test_wrap_short_text_is_untouched() {
        assert_eq!(wrap("hello world\n", 80, true, false), "hello world\n");
        assert_eq!(wrap("", 80, true, false), "");
        assert_eq!(wrap("a\n\nb", 80, true, false), "a\n\nb");
    }

    #[test]
    fn test_wrap_reflows_and_keeps_indent() {
        assert_eq!(wrap("aaa bbb ccc", 7, true, false), "aaa bbb\nccc");
        assert_eq!(wrap("  aaa bbb ccc", 9, true, false), "  aaa bbb\n  ccc");
        assert_eq!(wrap("  aaa bbb ccc", 9, false, false), "  aaa bbb\nccc");
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        assert_eq!(wrap("abcdefghij", 4, true, false), "abcd\nefgh\nij");
    }

    #[test]
    fn test_wrap_dedent() {
        let text = "    first\n      second\n\n    third\n";
        assert_eq!(wrap(text, 80, true, true), "first\n  second\n\nthird\n");
    }

    /// Evaluates a queued statement with a real shell.
    #[cfg(unix)]
    fn run_in_shell(statement: &str) -> Vec<u8> {
        let output = std::process::Command::new("sh")
            .arg("-c")
            .arg(statement)
            .output()
            .unwrap();
        assert!(output.status.success());
        output.stdout
    }

    #[cfg(unix)]
    #[test]
    fn test_quoting_round_trip_through_shell() {
        let message = "cost: $HOME `id` \"quoted\"\nnext line \\n 50%";
        let mut be = EvalEmitter::new(false, TEXT_WIDTH);
        be.echo(message, Highlight::Normal, false, false);
        assert_eq!(run_in_shell(&be.drain()), message.as_bytes());
    }

    #[cfg(unix)]
    #[test]
    fn test_export_round_trip_through_shell() {
        let mut be = EvalEmitter::default();
        be.export("MODM_TEST_VALUE", "a'b $c");
        let script = format!("{};printf '%s' \"$MODM_TEST_VALUE\"", be.drain());
        assert_eq!(run_in_shell(&script), b"a'b $c");
    }

    #[cfg(unix)]
    #[test]
    fn test_multiline_export_round_trip_through_shell() {
        let value = "first 'line' $HOME\n\tsecond 50%\r\n\n";
        let mut be = EvalEmitter::default();
        be.export("MODM_TEST_VALUE", value);
        let script = format!("{};printf '%s' \"$MODM_TEST_VALUE\"", be.drain());
        assert_eq!(run_in_shell(&script), value.as_bytes());
    }
}
