//! Path template parsing.
//!
//! A template is the tokenized form of a string pattern such as `/users/:id/:tab?`. Tokens are
//! kept around after compiling so that prefixes can be joined token by token (never by patching
//! strings) and so that urls can be generated back from a route.

use crate::error::RouterError;
use crate::pattern::{ParamKey, PatternOptions};
use regex::Regex;
use std::iter::Peekable;
use std::str::CharIndices;

/// Matches one path segment, lazily
pub(crate) const DEFAULT_PARAM_PATTERN: &str = "[^/]+?";
const WILDCARD_PATTERN: &str = ".*";
const DELIMITER: char = '/';

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Static(String),
    Param(ParamToken),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParamToken {
    pub(crate) name: String,
    /// unnamed groups and wildcards are keyed by their position: "0", "1", ...
    pub(crate) unnamed: bool,
    /// the delimiter owned by this parameter, it is dropped together with an absent optional value
    pub(crate) prefix: String,
    pub(crate) optional: bool,
    pub(crate) repeat: bool,
    pub(crate) wildcard: bool,
    pub(crate) pattern: String,
}

impl ParamToken {
    fn to_regex(&self) -> String {
        let prefix = regex::escape(&self.prefix);
        let capture = if self.repeat {
            format!("((?:{pattern})(?:{prefix}(?:{pattern}))*)", pattern = self.pattern)
        } else {
            format!("({})", self.pattern)
        };

        match (self.optional, self.prefix.is_empty()) {
            (true, false) => format!("(?:{prefix}{capture})?"),
            // a bare wildcard already matches the empty string
            (true, true) if self.wildcard => capture,
            (true, true) => format!("{capture}?"),
            (false, _) => format!("{prefix}{capture}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PathTemplate {
    raw: String,
    tokens: Vec<Token>,
}

impl PathTemplate {
    pub(crate) fn empty() -> Self {
        Self { raw: String::new(), tokens: vec![] }
    }

    pub(crate) fn parse(raw: &str) -> Result<Self, RouterError> {
        let mut parser = Parser { raw, chars: raw.char_indices().peekable(), tokens: vec![], literal: String::new(), names: vec![] };
        parser.parse()?;
        let mut template = Self { raw: raw.to_string(), tokens: parser.tokens };
        template.renumber();
        Ok(template)
    }

    pub(crate) fn raw(&self) -> &str {
        &self.raw
    }

    pub(crate) fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub(crate) fn keys(&self) -> Vec<ParamKey> {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                Token::Param(param) if param.unnamed => {
                    Some(ParamKey::positional(param.name.parse().unwrap_or_default(), param.optional))
                }
                Token::Param(param) => Some(ParamKey::new(param.name.clone(), param.optional)),
                Token::Static(_) => None,
            })
            .collect()
    }

    /// Joins `self` as a prefix in front of `path`.
    ///
    /// A lone `/` route under a prefix collapses to the prefix itself (unless strict), and a
    /// leading wildcard is anchored on a segment boundary so `/admin` + `*` never matches
    /// `/administration`.
    pub(crate) fn join(&self, path: &PathTemplate, strict: bool) -> PathTemplate {
        if self.is_empty() {
            return path.clone();
        }
        if path.raw == "/" && !strict {
            return self.clone();
        }

        let mut raw = self.raw.clone();
        let mut tokens = self.tokens.clone();
        let mut tail = path.tokens.clone();

        let trim_delimiter = match tail.first_mut() {
            Some(Token::Param(param)) if param.wildcard && param.prefix.is_empty() => {
                param.prefix = DELIMITER.to_string();
                true
            }
            Some(Token::Param(param)) => param.prefix.starts_with(DELIMITER),
            Some(Token::Static(literal)) => literal.starts_with(DELIMITER),
            None => false,
        };

        if trim_delimiter {
            if raw.ends_with(DELIMITER) {
                raw.pop();
            }
            if let Some(Token::Static(literal)) = tokens.last_mut() {
                if literal.ends_with(DELIMITER) {
                    literal.pop();
                }
                if literal.is_empty() {
                    tokens.pop();
                }
            }
        }

        if path.raw.starts_with('*') {
            raw.push(DELIMITER);
        }
        raw.push_str(&path.raw);

        for token in tail {
            match (tokens.last_mut(), token) {
                (Some(Token::Static(last)), Token::Static(next)) => last.push_str(&next),
                (_, token) => tokens.push(token),
            }
        }

        let mut template = PathTemplate { raw, tokens };
        template.renumber();
        template
    }

    /// The regular expression body without anchors or flags.
    ///
    /// When not strict a trailing delimiter is dropped, the caller decides how an optional
    /// trailing slash is matched.
    pub(crate) fn regex_body(&self, strict: bool) -> String {
        let last = self.tokens.len().saturating_sub(1);
        let mut body = String::new();
        for (idx, token) in self.tokens.iter().enumerate() {
            match token {
                Token::Static(literal) if idx == last && !strict => {
                    body.push_str(&regex::escape(literal.strip_suffix(DELIMITER).unwrap_or(literal)));
                }
                Token::Static(literal) => body.push_str(&regex::escape(literal)),
                Token::Param(param) => body.push_str(&param.to_regex()),
            }
        }
        body
    }

    pub(crate) fn to_regex(&self, options: PatternOptions) -> String {
        let ends_with_delimiter = matches!(self.tokens.last(), Some(Token::Static(literal)) if literal.ends_with(DELIMITER));

        let mut source = String::new();
        if !options.sensitive {
            source.push_str("(?i)");
        }
        source.push('^');
        source.push_str(&self.regex_body(options.strict));

        if !options.strict {
            source.push_str("(?:/)?");
        }

        if options.end {
            source.push('$');
        } else if !(options.strict && ends_with_delimiter) {
            source.push_str("(?:/|$)");
        }
        source
    }

    fn renumber(&mut self) {
        let mut index = 0usize;
        for token in &mut self.tokens {
            if let Token::Param(param) = token
                && param.unnamed
            {
                param.name = index.to_string();
                index += 1;
            }
        }
    }
}

struct Parser<'a> {
    raw: &'a str,
    chars: Peekable<CharIndices<'a>>,
    tokens: Vec<Token>,
    literal: String,
    names: Vec<String>,
}

impl Parser<'_> {
    fn parse(&mut self) -> Result<(), RouterError> {
        while let Some((pos, ch)) = self.chars.next() {
            match ch {
                '\\' => match self.chars.next() {
                    Some((_, escaped)) => self.literal.push(escaped),
                    None => return Err(RouterError::invalid_pattern(self.raw, "dangling escape character")),
                },
                ':' => {
                    let name = self.read_name();
                    if name.is_empty() {
                        return Err(RouterError::invalid_pattern(self.raw, format!("missing parameter name at {pos}")));
                    }
                    let pattern = match self.chars.peek() {
                        Some((_, '(')) => {
                            self.chars.next();
                            self.read_group(pos)?
                        }
                        _ => DEFAULT_PARAM_PATTERN.to_string(),
                    };
                    self.push_param(name, false, pattern)?;
                }
                '(' => {
                    let pattern = self.read_group(pos)?;
                    self.push_param(String::new(), true, pattern)?;
                }
                '*' => {
                    let prefix = self.take_prefix();
                    self.flush_literal();
                    self.tokens.push(Token::Param(ParamToken {
                        name: String::new(),
                        unnamed: true,
                        prefix,
                        optional: true,
                        repeat: false,
                        wildcard: true,
                        pattern: WILDCARD_PATTERN.to_string(),
                    }));
                }
                ch => self.literal.push(ch),
            }
        }
        self.flush_literal();
        Ok(())
    }

    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if !(ch.is_ascii_alphanumeric() || ch == '_') {
                break;
            }
            name.push(ch);
            self.chars.next();
        }
        name
    }

    /// Reads a `(...)` group body, the opening paren is already consumed
    fn read_group(&mut self, start: usize) -> Result<String, RouterError> {
        let mut depth = 1usize;
        let mut group = String::new();

        while let Some((_, ch)) = self.chars.next() {
            match ch {
                '\\' => {
                    group.push(ch);
                    if let Some((_, escaped)) = self.chars.next() {
                        group.push(escaped);
                    }
                }
                '(' => {
                    depth += 1;
                    group.push(ch);
                }
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return self.validate_group(group, start);
                    }
                    group.push(ch);
                }
                ch => group.push(ch),
            }
        }

        Err(RouterError::invalid_pattern(self.raw, format!("unbalanced group at {start}")))
    }

    fn validate_group(&self, group: String, start: usize) -> Result<String, RouterError> {
        if group.is_empty() {
            return Err(RouterError::invalid_pattern(self.raw, format!("empty group at {start}")));
        }
        let regex = Regex::new(&format!("^(?:{group})$")).map_err(|e| RouterError::invalid_pattern(self.raw, e))?;
        if regex.captures_len() > 1 {
            return Err(RouterError::invalid_pattern(
                self.raw,
                format!("capturing groups are not allowed at {start}, use (?:...) instead"),
            ));
        }
        Ok(group)
    }

    fn push_param(&mut self, name: String, unnamed: bool, pattern: String) -> Result<(), RouterError> {
        if !unnamed {
            if self.names.contains(&name) {
                return Err(RouterError::duplicate_parameter(self.raw, name));
            }
            self.names.push(name.clone());
        }

        let (optional, repeat) = match self.chars.peek() {
            Some((_, '?')) => (true, false),
            Some((_, '*')) => (true, true),
            Some((_, '+')) => (false, true),
            _ => (false, false),
        };
        if optional || repeat {
            self.chars.next();
        }

        let prefix = self.take_prefix();
        self.flush_literal();
        self.tokens.push(Token::Param(ParamToken { name, unnamed, prefix, optional, repeat, wildcard: false, pattern }));
        Ok(())
    }

    fn take_prefix(&mut self) -> String {
        if self.literal.ends_with(DELIMITER) {
            self.literal.pop();
            DELIMITER.to_string()
        } else {
            String::new()
        }
    }

    fn flush_literal(&mut self) {
        if !self.literal.is_empty() {
            self.tokens.push(Token::Static(std::mem::take(&mut self.literal)));
        }
    }
}
