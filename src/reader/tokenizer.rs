use serde_json::Value;

use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::TokenError;

/// Extracts one structured value from the front of a byte slice.
pub trait Tokenizer {
    /// Parse the first value in `input`, returning it together with the number
    /// of bytes it spans. Running out of input mid-value must be reported as
    /// [`TokenError::Incomplete`], distinct from syntax errors.
    fn parse(&mut self, input: &[u8]) -> Result<(Value, usize), TokenError>;
}

impl<T: Tokenizer + ?Sized> Tokenizer for &mut T {
    fn parse(&mut self, input: &[u8]) -> Result<(Value, usize), TokenError> {
        (**self).parse(input)
    }
}

/// Deepest limit [`JsonTokenizer`] honours; `serde_json` refuses anything
/// nested further on its own.
pub const MAX_DEPTH_CEILING: usize = 127;

/// JSON tokenizer with a configurable nesting limit.
///
/// A top-level object or array is depth 1, so a limit of 1 rejects `[{}]`.
/// Limits above [`MAX_DEPTH_CEILING`] are lowered to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonTokenizer {
    max_depth: usize,
}

impl JsonTokenizer {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.min(MAX_DEPTH_CEILING),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Scan the containers opened in `input`, outside strings, until the first
    /// top-level value closes.
    fn check_depth(&self, input: &[u8]) -> Result<(), TokenError> {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for &byte in input {
            if in_string {
                if escaped {
                    escaped = false;
                } else if byte == b'\\' {
                    escaped = true;
                } else if byte == b'"' {
                    in_string = false;
                }
                continue;
            }
            match byte {
                b'"' => in_string = true,
                b'{' | b'[' => {
                    depth += 1;
                    if depth > self.max_depth {
                        return Err(TokenError::Depth {
                            limit: self.max_depth,
                        });
                    }
                }
                b'}' | b']' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }
}

impl Default for JsonTokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl Tokenizer for JsonTokenizer {
    fn parse(&mut self, input: &[u8]) -> Result<(Value, usize), TokenError> {
        let mut stream = serde_json::Deserializer::from_slice(input).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value)) => {
                let end = stream.byte_offset();
                self.check_depth(&input[..end])?;
                Ok((value, end))
            }
            Some(Err(err)) if err.is_eof() => {
                self.check_depth(input)?;
                Err(TokenError::Incomplete)
            }
            Some(Err(err)) => {
                self.check_depth(&input[..err.column().min(input.len())])?;
                Err(TokenError::Syntax {
                    column: err.column(),
                    message: err.to_string(),
                })
            }
            None => Err(TokenError::Incomplete),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{JsonTokenizer, Tokenizer, MAX_DEPTH_CEILING};
    use crate::error::TokenError;

    #[test]
    fn parses_first_value_and_reports_its_span() {
        let mut tokenizer = JsonTokenizer::default();
        let (value, used) = tokenizer.parse(b"{\"x\": 1} {}\n").expect("value");
        assert_eq!(value, json!({"x": 1}));
        assert_eq!(used, 8);
    }

    #[test]
    fn depth_limit_counts_containers() {
        let mut tokenizer = JsonTokenizer::new(1);
        assert!(tokenizer.parse(b"{\"x\": 1}").is_ok());
        assert_eq!(
            tokenizer.parse(b"[{\"x\": 1}]"),
            Err(TokenError::Depth { limit: 1 })
        );
    }

    #[test]
    fn brackets_inside_strings_do_not_nest() {
        let mut tokenizer = JsonTokenizer::new(1);
        let (value, _) = tokenizer
            .parse(b"{\"s\": \"[[{{\\\"\"}")
            .expect("strings are opaque");
        assert_eq!(value, json!({"s": "[[{{\""}));
    }

    #[test]
    fn truncated_value_is_incomplete() {
        let mut tokenizer = JsonTokenizer::default();
        assert_eq!(
            tokenizer.parse(b"{\"x\": 1\n"),
            Err(TokenError::Incomplete)
        );
        assert_eq!(tokenizer.parse(b"[1, 2"), Err(TokenError::Incomplete));
    }

    #[test]
    fn malformed_value_is_a_syntax_error() {
        let mut tokenizer = JsonTokenizer::default();
        assert!(matches!(
            tokenizer.parse(b"{ this is invalid json"),
            Err(TokenError::Syntax { .. })
        ));
    }

    #[test]
    fn depth_beyond_truncation_still_reports_depth() {
        let mut tokenizer = JsonTokenizer::new(2);
        assert_eq!(
            tokenizer.parse(b"[[[1"),
            Err(TokenError::Depth { limit: 2 })
        );
    }

    #[test]
    fn depth_limit_is_capped_at_the_parser_ceiling() {
        let mut tokenizer = JsonTokenizer::new(1000);
        assert_eq!(tokenizer.max_depth(), MAX_DEPTH_CEILING);

        let nested = |levels: usize| format!("{}1{}", "[".repeat(levels), "]".repeat(levels));
        assert!(tokenizer.parse(nested(MAX_DEPTH_CEILING).as_bytes()).is_ok());
        assert_eq!(
            tokenizer.parse(nested(MAX_DEPTH_CEILING + 1).as_bytes()),
            Err(TokenError::Depth {
                limit: MAX_DEPTH_CEILING
            })
        );
        assert_eq!(
            tokenizer.parse(nested(300).as_bytes()),
            Err(TokenError::Depth {
                limit: MAX_DEPTH_CEILING
            })
        );
    }
}
