use super::formatter::format_value;
use super::resolver::machine_name;
use crate::context::AmbientContext;
use crate::domain::{LogEvent, PropertyValue};
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^{}]*)\}").unwrap_or_else(|e| panic!("invalid layout token pattern: {e}"))
});

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Unterminated token at position {position} in '{layout}'")]
    Unterminated { layout: String, position: usize },
    #[error("Empty token at position {position} in '{layout}'")]
    EmptyToken { layout: String, position: usize },
}

/// Turns a template plus an event into a string.
///
/// The forwarder treats rendering as a black box; `Layout` is the default
/// implementation and callers may plug in their own engine.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, event: &LogEvent, context: &dyn AmbientContext) -> String;
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Message,
    Level,
    Logger,
    LongDate,
    Exception,
    MachineName,
    EventProperty(String),
    Scoped(String),
    Global(String),
    Env(String),
    Unknown(String),
}

impl Token {
    fn parse(body: &str) -> Self {
        let body = body.trim();
        let (name, arg) = match body.split_once(':') {
            Some((name, arg)) => (name.trim(), Some(arg.trim().to_string())),
            None => (body, None),
        };

        match (name.to_ascii_lowercase().as_str(), arg) {
            ("message", None) => Token::Message,
            ("level", None) => Token::Level,
            ("logger", None) => Token::Logger,
            ("longdate", None) | ("date", None) => Token::LongDate,
            ("exception", None) => Token::Exception,
            ("machinename", None) => Token::MachineName,
            ("event-properties", Some(key)) | ("event-property", Some(key)) => {
                Token::EventProperty(key)
            }
            ("mdlc", Some(key)) | ("scope-property", Some(key)) => Token::Scoped(key),
            ("gdc", Some(key)) => Token::Global(key),
            ("env", Some(key)) | ("environment", Some(key)) => Token::Env(key),
            _ => Token::Unknown(body.to_string()),
        }
    }

    fn render(&self, out: &mut String, event: &LogEvent, context: &dyn AmbientContext) {
        match self {
            Token::Message => out.push_str(&event.message),
            Token::Level => out.push_str(event.level.as_str()),
            Token::Logger => out.push_str(&event.logger),
            Token::LongDate => {
                out.push_str(&event.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string());
            }
            Token::Exception => {
                if let Some(exception) = &event.exception {
                    out.push_str(&exception.to_string());
                }
            }
            Token::MachineName => {
                if let Some(name) = machine_name() {
                    out.push_str(name);
                }
            }
            Token::EventProperty(key) => {
                if let Some((_, value)) = event.property_ignore_case(key) {
                    out.push_str(&format_value(value));
                }
            }
            Token::Scoped(key) => {
                if let Some(value) = context.scoped_value(key) {
                    out.push_str(&value);
                }
            }
            Token::Global(key) => {
                if let Some(value) = context.global_value(key) {
                    out.push_str(&value);
                }
            }
            Token::Env(key) => {
                if let Ok(value) = std::env::var(key) {
                    out.push_str(&value);
                }
            }
            Token::Unknown(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Token(Token),
}

/// A parsed layout such as `${longdate}|${level}|${message}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    text: String,
    segments: Vec<Segment>,
}

impl Layout {
    pub fn parse(text: &str) -> Result<Self, LayoutError> {
        let mut segments = Vec::new();
        let mut last = 0;

        for captures in TOKEN_PATTERN.captures_iter(text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            push_literal(&mut segments, text, last, whole.start())?;

            let body = captures.get(1).map_or("", |m| m.as_str());
            if body.trim().is_empty() {
                return Err(LayoutError::EmptyToken {
                    layout: text.to_string(),
                    position: whole.start(),
                });
            }
            segments.push(Segment::Token(Token::parse(body)));
            last = whole.end();
        }
        push_literal(&mut segments, text, last, text.len())?;

        Ok(Self {
            text: text.to_string(),
            segments,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when the layout contains no tokens at all.
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(_)))
    }
}

fn push_literal(
    segments: &mut Vec<Segment>,
    text: &str,
    start: usize,
    end: usize,
) -> Result<(), LayoutError> {
    if start >= end {
        return Ok(());
    }
    let literal = &text[start..end];
    if let Some(offset) = literal.find("${") {
        return Err(LayoutError::Unterminated {
            layout: text.to_string(),
            position: start + offset,
        });
    }
    segments.push(Segment::Literal(literal.to_string()));
    Ok(())
}

impl FromStr for Layout {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layout::parse(s)
    }
}

impl TemplateRenderer for Layout {
    fn render(&self, event: &LogEvent, context: &dyn AmbientContext) -> String {
        let mut out = String::with_capacity(self.text.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => out.push_str(literal),
                Segment::Token(token) => token.render(&mut out, event, context),
            }
        }
        out
    }
}

/// Renders a structured-logging message template (`Hello {name}`) using the
/// event's properties. `{{` and `}}` are escapes; placeholders without a
/// matching property are left as written.
pub fn render_message_template(template: &str, properties: &[(String, PropertyValue)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
            continue;
        }

        let Some(close) = tail.find('}') else {
            out.push_str(tail);
            rest = "";
            break;
        };
        let placeholder = &tail[..=close];
        let name = placeholder_name(&tail[1..close]);

        match properties.iter().find(|(key, _)| key == name) {
            Some((_, value)) => out.push_str(&format_value(value)),
            None => out.push_str(placeholder),
        }
        rest = &tail[close + 1..];
    }

    out.push_str(rest);
    out
}

fn placeholder_name(body: &str) -> &str {
    let body = body.trim_start_matches(['@', '$']);
    let end = body.find([':', ',']).unwrap_or(body.len());
    body[..end].trim()
}
