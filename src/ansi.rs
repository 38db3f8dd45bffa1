//! ANSI escape code processing
//!
//! Decodes SGR (`ESC [ <params> m`) sequences into styled segments,
//! re-synthesizes escape sequences from segments, and strips styling.
//! Only SGR sequences are interpreted; cursor and screen control
//! sequences are removed earlier by the pipe layer.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

use crate::models::{AnsiSegment, DEFAULT_BG, DEFAULT_FG};

/// Escape sequence introducer shared by every CSI sequence
const CSI: &str = "\x1b[";

static SGR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[([0-9;]*)m").unwrap_or_else(|e| panic!("invalid SGR pattern: {e}"))
});

/// Running style while scanning a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SgrState {
    fg: u8,
    bg: u8,
    bold: bool,
    underline: bool,
    italic: bool,
}

impl Default for SgrState {
    fn default() -> Self {
        Self {
            fg: DEFAULT_FG,
            bg: DEFAULT_BG,
            bold: false,
            underline: false,
            italic: false,
        }
    }
}

impl SgrState {
    fn segment(&self, text: &str) -> AnsiSegment {
        AnsiSegment {
            text: text.to_string(),
            fg_color: self.fg,
            bg_color: self.bg,
            bold: self.bold,
            underline: self.underline,
            italic: self.italic,
        }
    }

    /// Apply the parameter list of one SGR sequence
    fn apply(&mut self, params: &str) {
        // `ESC[m` is shorthand for reset; empty fields also mean 0
        let codes: Vec<u16> = params
            .split(';')
            .filter_map(|p| if p.is_empty() { Some(0) } else { p.parse().ok() })
            .collect();

        let mut i = 0;
        while i < codes.len() {
            match codes[i] {
                0 => *self = SgrState::default(),
                1 => self.bold = true,
                3 => self.italic = true,
                4 => self.underline = true,
                22 => self.bold = false,
                23 => self.italic = false,
                24 => self.underline = false,
                code @ (30..=37 | 90..=97) => self.fg = code as u8,
                code @ (40..=47 | 100..=107) => self.bg = code as u8,
                39 => self.fg = DEFAULT_FG,
                49 => self.bg = DEFAULT_BG,
                // Extended colours carry their own sub-parameters; consume them
                // so a palette index is never read as a basic colour code.
                38 | 48 => match codes.get(i + 1) {
                    Some(5) => i += 2,
                    Some(2) => i += 4,
                    _ => {}
                },
                _ => {}
            }
            i += 1;
        }
    }
}

/// Whether `text` contains any escape sequence introducer
pub fn has_ansi_codes(text: &str) -> bool {
    text.contains(CSI)
}

/// One unit of a line while sequences are being resolved
#[derive(Debug)]
enum Token {
    Text(char),
    Sgr(String),
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(text.len());
    let mut last_end = 0;

    for caps in SGR_REGEX.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        tokens.extend(text[last_end..whole.start()].chars().map(Token::Text));
        let params = caps.get(1).map_or("", |m| m.as_str());
        tokens.push(Token::Sgr(params.to_string()));
        last_end = whole.end();
    }

    tokens.extend(text[last_end..].chars().map(Token::Text));
    tokens
}

/// Turn text that joins into a new SGR sequence into a sequence token.
///
/// Repeats until the visible text holds no sequence. A joined sequence
/// takes effect at the position of its final character.
fn resolve_joined(tokens: &mut Vec<Token>) {
    loop {
        let mut visible = String::new();
        let mut index_at = Vec::new();
        for (i, token) in tokens.iter().enumerate() {
            if let Token::Text(c) = token {
                visible.push(*c);
                index_at.extend(std::iter::repeat(i).take(c.len_utf8()));
            }
        }

        if !has_ansi_codes(&visible) {
            return;
        }

        let joined: Vec<(usize, usize, String)> = SGR_REGEX
            .captures_iter(&visible)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let params = caps.get(1).map_or("", |m| m.as_str()).to_string();
                Some((index_at[whole.start()], index_at[whole.end() - 1], params))
            })
            .collect();

        if joined.is_empty() {
            return;
        }
        trace!("parse_ansi: {} joined sequences", joined.len());

        let mut dropped = vec![false; tokens.len()];
        for (first, last, params) in joined {
            for (token, drop) in tokens[first..last]
                .iter()
                .zip(dropped[first..last].iter_mut())
            {
                if matches!(token, Token::Text(_)) {
                    *drop = true;
                }
            }
            tokens[last] = Token::Sgr(params);
        }

        let mut index = 0;
        tokens.retain(|_| {
            let keep = !dropped[index];
            index += 1;
            keep
        });
    }
}

/// Split `text` into styled segments.
///
/// Text with no escape sequences yields exactly one segment with default
/// colours. Otherwise a segment is emitted for every non-empty run between
/// SGR sequences, carrying the style in effect for that run. Fragments that
/// only form a sequence once the sequences around them are removed are
/// applied as well, so the segments always concatenate to [`strip_ansi`].
pub fn parse_ansi(text: &str) -> Vec<AnsiSegment> {
    if !has_ansi_codes(text) {
        return vec![AnsiSegment::plain(text)];
    }

    let mut tokens = tokenize(text);
    resolve_joined(&mut tokens);

    let mut segments = Vec::new();
    let mut state = SgrState::default();
    let mut run = String::new();

    for token in tokens {
        match token {
            Token::Text(c) => run.push(c),
            Token::Sgr(params) => {
                if !run.is_empty() {
                    segments.push(state.segment(&run));
                    run.clear();
                }
                state.apply(&params);
            }
        }
    }

    if !run.is_empty() {
        segments.push(state.segment(&run));
    }

    trace!("parse_ansi: {} segments from {} bytes", segments.len(), text.len());
    segments
}

/// Concatenate the visible text of a segment list
pub fn plain_text(segments: &[AnsiSegment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect()
}

/// SGR parameters that reproduce a segment's style
pub fn segment_codes(segment: &AnsiSegment) -> Vec<String> {
    let mut codes = Vec::new();

    if segment.bold {
        codes.push("1".to_string());
    }
    if segment.underline {
        codes.push("4".to_string());
    }
    if segment.italic {
        codes.push("3".to_string());
    }

    codes.push(segment.fg_color.to_string());
    if segment.bg_color != DEFAULT_BG {
        codes.push(segment.bg_color.to_string());
    }

    codes
}

/// Re-emit segments as ANSI text, each wrapped in its own style and reset
pub fn render_segments(segments: &[AnsiSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push_str(CSI);
        out.push_str(&segment_codes(segment).join(";"));
        out.push('m');
        out.push_str(&segment.text);
        out.push_str("\x1b[0m");
    }
    out
}

/// Remove all SGR sequences from `text`.
///
/// Removal repeats until nothing matches, so fragments that join into a new
/// sequence after one pass are removed too and the result is a fixpoint.
pub fn strip_ansi(text: &str) -> String {
    let mut current = match SGR_REGEX.replace_all(text, "") {
        Cow::Borrowed(unchanged) => return unchanged.to_string(),
        Cow::Owned(stripped) => stripped,
    };

    loop {
        let next = match SGR_REGEX.replace_all(&current, "") {
            Cow::Borrowed(_) => break,
            Cow::Owned(stripped) => stripped,
        };
        current = next;
    }

    trace!("strip_ansi: {} -> {} bytes", text.len(), current.len());
    current
}
