use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Removed without leaving a gap so "can't" and "20,000" stay single terms.
    static ref JOINERS: Regex = Regex::new(r"['’,]").expect("valid regex");
    static ref SEPARATORS: Regex = Regex::new(r"(?u)[^\p{L}\p{N}]+").expect("valid regex");
}

/// Normalized text ready to be split into index terms.
///
/// Iterating is lazy and can be repeated any number of times; no term positions are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terms {
    normalized: String,
}

impl Terms {
    pub fn iter(&self) -> std::str::SplitWhitespace<'_> {
        self.normalized.split_whitespace()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<'a> IntoIterator for &'a Terms {
    type Item = &'a str;
    type IntoIter = std::str::SplitWhitespace<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Strip apostrophes and commas, collapse every other run of non-alphanumeric
/// characters into one space, and lowercase.
pub fn normalize(text: &str) -> String {
    let joined = JOINERS.replace_all(text, "");
    SEPARATORS.replace_all(&joined, " ").to_lowercase()
}

pub fn tokenize(text: &str) -> Terms {
    Terms { normalized: normalize(text) }
}

/// Tokenize several text attributes as one buffer.
pub fn tokenize_fields<'a, I>(fields: I) -> Terms
where
    I: IntoIterator<Item = &'a str>,
{
    let mut buf = String::new();
    for field in fields {
        if field.is_empty() {
            continue;
        }
        buf.push_str(field);
        buf.push(' ');
    }
    tokenize(&buf)
}
