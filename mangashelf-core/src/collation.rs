//! Natural ("numeric-aware") string ordering.
//!
//! Embedded digit runs compare by value so "Chapter 2" sorts before
//! "Chapter 10". Letters are compared on their canonical decomposition:
//! tone marks never decide the alphabetic position of a letter, so
//! "Ánh Trăng" files under A. Titles follow the Vietnamese alphabet
//! (a ă â b c d đ e ê ... o ô ơ ... u ư ...), chapter names fold every
//! accent away.

use std::cmp::Ordering;

use mangashelf_model::{FileEntry, MangaEntry};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Strength of a natural comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collation {
    /// Ignores case and accents; only `đ` stays distinct from `d`. Used
    /// for chapter file names.
    Base,
    /// Vietnamese alphabetic order: `ă`, `â`, `đ`, `ê`, `ô`, `ơ` and `ư`
    /// are letters of their own. Ties are broken by tone marks, then by
    /// lower case before upper case. Used for manga titles and picker
    /// folders.
    Title,
}

/// Total, deterministic natural ordering of two strings.
///
/// Strings equal under the requested collation fall back to a plain
/// code-point comparison so sorting never depends on input order.
pub fn natural_cmp(a: &str, b: &str, collation: Collation) -> Ordering {
    let ta = tokenize(a);
    let tb = tokenize(b);
    compare_primary(&ta, &tb, collation)
        .then_with(|| match collation {
            Collation::Base => Ordering::Equal,
            Collation::Title => {
                compare_tones(&ta, &tb).then_with(|| case_tiebreak(a, b))
            }
        })
        .then_with(|| a.cmp(b))
}

pub fn sort_entries_by_name(entries: &mut [FileEntry], collation: Collation) {
    entries.sort_by(|a, b| natural_cmp(&a.name, &b.name, collation));
}

pub fn sort_manga_by_title(manga: &mut [MangaEntry]) {
    manga.sort_by(|a, b| natural_cmp(&a.title, &b.title, Collation::Title));
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(String),
    Letter(Letter),
}

/// A lower-cased base character with the marks that followed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Letter {
    base: char,
    /// 1 for breve or stroke, 2 for circumflex, 3 for horn.
    variant: u8,
    /// Dictionary order: level, grave, hook, tilde, acute, dot below.
    tone: u8,
}

impl Letter {
    fn new(c: char) -> Self {
        match c {
            'đ' => Self {
                base: 'd',
                variant: 1,
                tone: 0,
            },
            _ => Self {
                base: c,
                variant: 0,
                tone: 0,
            },
        }
    }

    fn mark(&mut self, mark: char) {
        match mark {
            '\u{0306}' => self.variant = 1,
            '\u{0302}' => self.variant = 2,
            '\u{031B}' => self.variant = 3,
            '\u{0300}' => self.tone = 1,
            '\u{0309}' => self.tone = 2,
            '\u{0303}' => self.tone = 3,
            '\u{0301}' => self.tone = 4,
            '\u{0323}' => self.tone = 5,
            _ => {}
        }
    }

    fn primary(&self, collation: Collation) -> (char, u8) {
        match collation {
            Collation::Title => (self.base, self.variant),
            Collation::Base if self.base == 'd' => (self.base, self.variant),
            Collation::Base => (self.base, 0),
        }
    }
}

fn tokenize(s: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = s.nfd().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            let mut run = String::from(c);
            while let Some(d) = chars.next_if(char::is_ascii_digit) {
                run.push(d);
            }
            tokens.push(Token::Number(run));
        } else if is_combining_mark(c) {
            if let Some(Token::Letter(letter)) = tokens.last_mut() {
                letter.mark(c);
            }
        } else {
            tokens.extend(
                c.to_lowercase().map(|l| Token::Letter(Letter::new(l))),
            );
        }
    }
    tokens
}

fn compare_primary(a: &[Token], b: &[Token], collation: Collation) -> Ordering {
    for (ta, tb) in a.iter().zip(b) {
        // A non-digit character is never equal to '0', and every one sorts
        // either below or above the whole digit range.
        let ord = match (ta, tb) {
            (Token::Number(x), Token::Number(y)) => compare_numeric(x, y),
            (Token::Number(_), Token::Letter(l)) => '0'.cmp(&l.base),
            (Token::Letter(l), Token::Number(_)) => l.base.cmp(&'0'),
            (Token::Letter(x), Token::Letter(y)) => {
                x.primary(collation).cmp(&y.primary(collation))
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

/// Only meaningful once the primary comparison found both sides equal.
fn compare_tones(a: &[Token], b: &[Token]) -> Ordering {
    for (ta, tb) in a.iter().zip(b) {
        if let (Token::Letter(x), Token::Letter(y)) = (ta, tb) {
            let ord = x.tone.cmp(&y.tone);
            if ord != Ordering::Equal {
                return ord;
            }
        }
    }
    Ordering::Equal
}

/// Compares two ASCII digit runs by value, without overflow.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn case_tiebreak(a: &str, b: &str) -> Ordering {
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca == cb {
            continue;
        }
        match (ca.is_lowercase(), cb.is_lowercase()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
    }
    Ordering::Equal
}
