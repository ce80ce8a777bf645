//! Parsing of the markers embedded in run statements and variable values.
//!
//! # Marker Formats
//!
//! - `${NAME}` - reference to a variable in the current environment
//! - `$((command))` - subshell capture: run `command`, substitute its stdout
//! - `$(function)` - a whole statement calling another function
//!
//! # Shell Variables
//!
//! Bare `$NAME` references pass through unchanged so the shell can expand
//! them. `${NAME}` references to names absent from the environment also pass
//! through untouched.
//!
//! # Example
//!
//! ```
//! use artisan_lib::placeholder::{parse, Segment};
//!
//! let segments = parse("${HOME}/bin:$PATH");
//! assert_eq!(segments, vec![
//!     Segment::Var("HOME".to_string()),
//!     Segment::Literal("/bin:$PATH".to_string()),
//! ]);
//! ```

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no variable references)
  Literal(String),

  /// A `${NAME}` reference
  Var(String),
}

/// An embedded subshell capture marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
  /// The full marker text, e.g. `$((git rev-parse HEAD))`.
  pub expr: String,
  /// The command between the markers, trimmed.
  pub command: String,
}

/// Parse a string into literal and `${NAME}` segments.
///
/// An unterminated `${` or one whose content is not a valid variable name is
/// kept as literal text.
pub fn parse(input: &str) -> Vec<Segment> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut rest = input;

  while let Some(start) = rest.find("${") {
    literal.push_str(&rest[..start]);
    let after = &rest[start + 2..];

    match after.find('}') {
      Some(end) if is_var_name(&after[..end]) => {
        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Var(after[..end].to_string()));
        rest = &after[end + 1..];
      }
      _ => {
        literal.push_str("${");
        rest = after;
      }
    }
  }

  literal.push_str(rest);
  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  segments
}

/// Substitute `${NAME}` references using `lookup`.
///
/// References for which `lookup` returns `None` are left as written.
pub fn substitute_vars<'a, F>(input: &str, lookup: F) -> String
where
  F: Fn(&str) -> Option<&'a str>,
{
  let mut result = String::with_capacity(input.len());

  for segment in parse(input) {
    match segment {
      Segment::Literal(s) => result.push_str(&s),
      Segment::Var(name) => match lookup(&name) {
        Some(value) => result.push_str(value),
        None => {
          result.push_str("${");
          result.push_str(&name);
          result.push('}');
        }
      },
    }
  }

  result
}

/// Find the first subshell capture marker in `input`.
///
/// The command ends at the first `))` following the opening `$((`.
pub fn find_capture(input: &str) -> Option<Capture> {
  let start = input.find("$((")?;
  let body = &input[start + 3..];
  let end = body.find("))")?;

  Some(Capture {
    expr: input[start..start + 3 + end + 2].to_string(),
    command: body[..end].trim().to_string(),
  })
}

/// If `input` is exactly a function call marker `$(name)`, return the name.
pub fn function_call(input: &str) -> Option<&str> {
  let inner = input.trim().strip_prefix("$(")?.strip_suffix(')')?;
  if inner.starts_with('(') {
    return None;
  }
  let name = inner.trim();
  if is_function_name(name) { Some(name) } else { None }
}

fn is_var_name(s: &str) -> bool {
  let mut chars = s.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
    _ => return false,
  }
  chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_function_name(s: &str) -> bool {
  !s.is_empty()
    && s
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}
