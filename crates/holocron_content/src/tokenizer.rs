//! Line tokenizer shared by the text formats
//!
//! All text formats are line based: blank lines and lines starting with `#` or `//` are
//! skipped, everything else is split into tokens on whitespace (plus an optional set of extra
//! separators). Sections start with a `SECTION: <name>` line.
//!
//! Keywords are matched against whole tokens, case-insensitively, through dispatch tables of
//! `(phrase, value)` pairs. When several phrases match a line, the longest one wins, so
//! `TEXTURE VERTICES 4` never ends up being treated as `VERTICES`.

use crate::{ContentError, ContentResult};
use glam::{Vec2, Vec3, Vec4};
use std::{fmt::Display, io::BufRead, str::FromStr, sync::Arc};

/// Separators of the model format, which lists vertex pairs as `v, tv`
pub const COMMA_SEPARATED: &[char] = &[','];

/// A single meaningful line of a text file
#[derive(Debug, Clone)]
pub struct Line {
    file: Arc<str>,
    number: usize,
    text: String,
    tokens: Vec<String>,
}

impl Line {
    /// 1-based line number inside the file
    pub fn number(&self) -> usize {
        self.number
    }

    /// The trimmed line text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn args(&self) -> Args<'_> {
        Args {
            line: self,
            offset: 0,
        }
    }

    /// Checks whether this is an `end` terminator of a list.
    pub fn is_end(&self) -> bool {
        self.text.eq_ignore_ascii_case("end")
    }

    /// If this line opens a section, returns its name, uppercase with single spaces.
    pub fn section_name(&self) -> Option<String> {
        const PREFIX: &str = "SECTION:";

        let head = self.text.get(..PREFIX.len())?;
        if !head.eq_ignore_ascii_case(PREFIX) {
            return None;
        }

        let words: Vec<_> = self.text[PREFIX.len()..].split_whitespace().collect();
        Some(words.join(" ").to_ascii_uppercase())
    }

    /// Looks the line's leading words up in a dispatch table. Returns the matched value and the
    /// arguments following the keyword.
    pub fn keyword<K: Copy>(&self, table: &[(&str, K)]) -> Option<(K, Args<'_>)> {
        table
            .iter()
            .filter_map(|&(phrase, value)| {
                let words = phrase.split_whitespace().count();
                let matches = words <= self.tokens.len()
                    && phrase
                        .split_whitespace()
                        .zip(&self.tokens)
                        .all(|(word, token)| word.eq_ignore_ascii_case(token));
                matches.then_some((words, value))
            })
            .max_by_key(|&(words, _)| words)
            .map(|(words, value)| {
                (
                    value,
                    Args {
                        line: self,
                        offset: words,
                    },
                )
            })
    }

    /// Creates a [`ContentError::MalformedRecord`] pointing at this line.
    pub fn error(&self, reason: impl Display) -> ContentError {
        ContentError::MalformedRecord {
            file: self.file.to_string(),
            line: self.number,
            reason: reason.to_string(),
        }
    }
}

/// Finds the value of a section in a dispatch table.
pub fn lookup_section<K: Copy>(name: &str, table: &[(&str, K)]) -> Option<K> {
    table
        .iter()
        .find(|(section, _)| section.eq_ignore_ascii_case(name))
        .map(|&(_, value)| value)
}

/// Typed view over the tokens of a line, starting at some offset.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    line: &'a Line,
    offset: usize,
}

impl<'a> Args<'a> {
    pub fn line(&self) -> &'a Line {
        self.line
    }

    pub fn tokens(&self) -> &'a [String] {
        self.line.tokens.get(self.offset..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.tokens().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens().is_empty()
    }

    /// Arguments after skipping the first `n`
    pub fn skip(self, n: usize) -> Args<'a> {
        Args {
            line: self.line,
            offset: self.offset + n,
        }
    }

    pub fn str(&self, i: usize) -> ContentResult<&'a str> {
        self.tokens()
            .get(i)
            .map(String::as_str)
            .ok_or_else(|| self.line.error(format!("missing argument #{}", i + 1)))
    }

    fn parse<T: FromStr>(&self, i: usize, what: &str) -> ContentResult<T> {
        let token = self.str(i)?;
        token
            .parse()
            .map_err(|_| self.line.error(format!("`{token}` isn't a valid {what}")))
    }

    pub fn int(&self, i: usize) -> ContentResult<i32> {
        self.parse(i, "integer")
    }

    pub fn uint(&self, i: usize) -> ContentResult<u32> {
        self.parse(i, "unsigned integer")
    }

    pub fn float(&self, i: usize) -> ContentResult<f32> {
        self.parse(i, "number")
    }

    /// Hexadecimal value, with or without the `0x` prefix
    pub fn hex(&self, i: usize) -> ContentResult<u32> {
        let token = self.str(i)?;
        parse_hex(token).ok_or_else(|| self.line.error(format!("`{token}` isn't a valid hex value")))
    }

    /// Record index written as `12:` (or plain `12`)
    pub fn index(&self, i: usize) -> ContentResult<usize> {
        let token = self.str(i)?;
        token
            .trim_end_matches(':')
            .parse()
            .map_err(|_| self.line.error(format!("`{token}` isn't a valid record index")))
    }

    /// Optional index, where `-1` means none
    pub fn optional_index(&self, i: usize) -> ContentResult<Option<usize>> {
        let value = self.int(i)?;
        match value {
            -1 => Ok(None),
            v if v >= 0 => Ok(Some(v as usize)),
            v => Err(self.line.error(format!("`{v}` isn't a valid index"))),
        }
    }

    pub fn vec2(&self, i: usize) -> ContentResult<Vec2> {
        Ok(Vec2::new(self.float(i)?, self.float(i + 1)?))
    }

    pub fn vec3(&self, i: usize) -> ContentResult<Vec3> {
        Ok(Vec3::new(self.float(i)?, self.float(i + 1)?, self.float(i + 2)?))
    }

    pub fn vec4(&self, i: usize) -> ContentResult<Vec4> {
        Ok(Vec4::new(
            self.float(i)?,
            self.float(i + 1)?,
            self.float(i + 2)?,
            self.float(i + 3)?,
        ))
    }
}

/// Parses a hex number, accepting an optional `0x` prefix.
pub fn parse_hex(token: &str) -> Option<u32> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u32::from_str_radix(digits, 16).ok()
}

/// Reads meaningful lines from a text file, with one line of lookahead.
pub struct LineReader<R> {
    file: Arc<str>,
    reader: R,
    separators: &'static [char],
    number: usize,
    buffer: Vec<u8>,
    peeked: Option<Line>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(file: &str, reader: R) -> Self {
        Self {
            file: Arc::from(file),
            reader,
            separators: &[],
            number: 0,
            buffer: Vec::with_capacity(256),
            peeked: None,
        }
    }

    /// Splits tokens on the given characters, in addition to whitespace.
    pub fn with_separators(mut self, separators: &'static [char]) -> Self {
        self.separators = separators;
        self
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    fn read_line(&mut self) -> ContentResult<Option<Line>> {
        loop {
            self.buffer.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.buffer)
                .map_err(|e| ContentError::io(self.file.to_string(), e))?;
            if read == 0 {
                return Ok(None);
            }
            self.number += 1;

            // Files come from a Latin-1 era, don't choke on stray bytes in names or comments
            let text = String::from_utf8_lossy(&self.buffer);
            let text = text.trim();
            if text.is_empty() || text.starts_with('#') || text.starts_with("//") {
                continue;
            }

            let separators = self.separators;
            let tokens = text
                .split(|c: char| c.is_whitespace() || separators.contains(&c))
                .filter(|token| !token.is_empty())
                .map(String::from)
                .collect();

            return Ok(Some(Line {
                file: self.file.clone(),
                number: self.number,
                text: text.to_string(),
                tokens,
            }));
        }
    }

    pub fn next_line(&mut self) -> ContentResult<Option<Line>> {
        match self.peeked.take() {
            Some(line) => Ok(Some(line)),
            None => self.read_line(),
        }
    }

    pub fn peek_line(&mut self) -> ContentResult<Option<&Line>> {
        if self.peeked.is_none() {
            self.peeked = self.read_line()?;
        }
        Ok(self.peeked.as_ref())
    }

    /// Next line of the current section. Returns `None` at the end of file, or when the next
    /// line opens another section (which is left unread).
    pub fn next_in_section(&mut self) -> ContentResult<Option<Line>> {
        match self.peek_line()? {
            Some(line) if line.section_name().is_some() => Ok(None),
            Some(_) => self.next_line(),
            None => Ok(None),
        }
    }

    /// Like [`LineReader::next_in_section`], but running out of lines is an error.
    pub fn expect_in_section(&mut self, what: &str) -> ContentResult<Line> {
        self.next_in_section()?.ok_or_else(|| ContentError::MalformedRecord {
            file: self.file.to_string(),
            line: self.number,
            reason: format!("expected {what}, but the section ended"),
        })
    }

    /// Reads `count` records of the form `index: values...`, in any order. The closure gets the
    /// record index and the values following it.
    pub fn read_indexed(
        &mut self,
        count: usize,
        what: &str,
        mut store: impl FnMut(usize, Args<'_>) -> ContentResult<()>,
    ) -> ContentResult<()> {
        for _ in 0..count {
            let line = self.expect_in_section(what)?;
            let args = line.args();
            let index = args.index(0)?;
            if index >= count {
                return Err(line.error(format!("{what} index {index} is out of range ({count})")));
            }
            store(index, args.skip(1))?;
        }
        Ok(())
    }

    /// Discards the remainder of the current section.
    pub fn skip_section(&mut self) -> ContentResult<()> {
        while self.next_in_section()?.is_some() {}
        Ok(())
    }
}
