//! Word splitting of modfile lines, following POSIX shell quoting rules.

use thiserror::Error;

/// Errors that can occur while splitting a line into words.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexingError {
    /// A closing quote (single or double) was not found.
    #[error("no closing quotation")]
    UnfinishedQuote,
    /// The line ends with a backslash that has nothing to escape.
    #[error("no escaped character")]
    UnfinishedEscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
    /// Backslash seen; holds the state to return to.
    Escape(EscapeFrom),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EscapeFrom {
    Word,
    DoubleQuote,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    /// True once the current word has started, even if it is still empty
    /// (`''` is a word).
    in_word: bool,
    buffer: String,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            in_word: false,
            buffer: String::new(),
        }
    }

    /// Runs the state machine over the whole line and returns the words.
    fn make_words(&mut self) -> Result<Vec<String>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch),
                LexingState::Escape(from) => self.handle_escape(ch, from),
            }
        }

        match self.state {
            LexingState::ReadingSingleQuote | LexingState::ReadingDoubleQuote => {
                return Err(LexingError::UnfinishedQuote);
            }
            LexingState::Escape(_) => return Err(LexingError::UnfinishedEscape),
            _ => {}
        }

        self.finish_word(&mut out);
        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn handle_start(&mut self, ch: char) {
        match ch {
            c if c.is_whitespace() => {}
            _ => {
                self.in_word = true;
                self.state = LexingState::ReadingWord;
                self.handle_word_char(ch);
            }
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<String>) {
        if ch.is_whitespace() {
            self.finish_word(out);
            self.state = LexingState::Start;
        } else {
            self.handle_word_char(ch);
        }
    }

    fn handle_word_char(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            '\\' => self.state = LexingState::Escape(EscapeFrom::Word),
            c => self.buffer.push(c),
        }
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::ReadingWord,
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            '\\' => self.state = LexingState::Escape(EscapeFrom::DoubleQuote),
            c => self.buffer.push(c),
        }
    }

    fn handle_escape(&mut self, ch: char, from: EscapeFrom) {
        match from {
            EscapeFrom::Word => {
                self.buffer.push(ch);
                self.state = LexingState::ReadingWord;
            }
            EscapeFrom::DoubleQuote => {
                // Inside double quotes only `"` and `\` are escapable.
                if ch != '"' && ch != '\\' {
                    self.buffer.push('\\');
                }
                self.buffer.push(ch);
                self.state = LexingState::ReadingDoubleQuote;
            }
        }
    }

    fn finish_word(&mut self, out: &mut Vec<String>) {
        if self.in_word {
            out.push(std::mem::take(&mut self.buffer));
            self.in_word = false;
        }
    }
}

/// Split `line` into words the way a POSIX shell would, without any
/// expansion.
///
/// Single quotes preserve everything literally, double quotes honour `\"` and
/// `\\`, and a backslash outside quotes escapes the next character. `#` is
/// an ordinary character.
pub fn split_words(line: &str) -> Result<Vec<String>, LexingError> {
    let mut lexer = LexingFSM::new(line);
    lexer.make_words()
}
