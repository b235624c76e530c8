//! JSON with `//` line and `/* */` block comments.
//!
//! Chef node attribute files are hand-edited and commonly annotated, so
//! comments are stripped before handing the text to `serde_json`. Comment
//! markers inside string literals are left alone.

/// Removes `//` and `/* */` comments from `input`.
///
/// Newlines inside block comments are kept so that parse errors still point
/// at the right line. An unterminated block comment swallows the rest of the
/// input.
///
/// # Examples
///
/// ```
/// # use biolinux::jsonc::strip_comments;
/// assert_eq!(strip_comments("{\"a\": 1 /* x */}"), "{\"a\": 1 }");
/// ```
#[must_use]
pub fn strip_comments(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut state = State::Code;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        let next = chars.peek().copied();
        state = match state {
            State::Code => match (ch, next) {
                ('/', Some('/')) => {
                    chars.next();
                    State::LineComment
                }
                ('/', Some('*')) => {
                    chars.next();
                    State::BlockComment
                }
                ('"', _) => {
                    output.push(ch);
                    State::String
                }
                _ => {
                    output.push(ch);
                    State::Code
                }
            },
            State::String => {
                output.push(ch);
                match ch {
                    '\\' => State::Escape,
                    '"' => State::Code,
                    _ => State::String,
                }
            }
            State::Escape => {
                output.push(ch);
                State::String
            }
            State::LineComment => {
                if ch == '\n' {
                    output.push(ch);
                    State::Code
                } else {
                    State::LineComment
                }
            }
            State::BlockComment => match (ch, next) {
                ('*', Some('/')) => {
                    chars.next();
                    State::Code
                }
                ('\n', _) => {
                    output.push(ch);
                    State::BlockComment
                }
                _ => State::BlockComment,
            },
        };
    }

    output
}

/// Parses JSON text after stripping comments.
///
/// # Errors
///
/// Returns the underlying [`serde_json::Error`] when the stripped text is
/// not valid JSON.
pub fn parse(input: &str) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::from_str(&strip_comments(input))
}

#[derive(Clone, Copy)]
enum State {
    Code,
    String,
    Escape,
    LineComment,
    BlockComment,
}

#[cfg(test)]
mod tests;
