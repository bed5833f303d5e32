//! Spool line parser.
//!
//! A line is a list of tokens joined by [`DELIMITER`]; each token is a key
//! and a value joined by [`SEPARATOR`]:
//!
//! ```text
//! state::1!**!*!**!timestamp::1000000000!**!*!**!perfdata::load=3.5;5;10;0;100
//! ```

use std::collections::HashMap;

use crate::error::IngestError;

/// Token delimiter written by the monitoring core.
pub const DELIMITER: &str = "!**!*!**!";

/// Key/value separator inside a token.
pub const SEPARATOR: &str = "::";

/// Field name to field value, built from one line.
pub type FieldSet = HashMap<String, String>;

/// Parse one line into its fields.
///
/// The key of a token ends at the first separator and the value is the rest
/// of the token, which may itself contain separators. A token without a
/// separator (an empty token included) is an error. Later duplicate keys
/// replace earlier ones.
pub fn parse_line(line: &str) -> Result<FieldSet, IngestError> {
    let mut fields = FieldSet::new();

    for token in line.split(DELIMITER) {
        let (key, value) = split_token(token)?;
        fields.insert(key.to_string(), value.to_string());
    }

    Ok(fields)
}

/// Split one token at its first separator.
pub fn split_token(token: &str) -> Result<(&str, &str), IngestError> {
    token
        .split_once(SEPARATOR)
        .ok_or_else(|| IngestError::MalformedToken {
            token: token.to_string(),
        })
}
