use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

const ELLIPSIS: &str = "...";

///Splits text into whitespace-delimited tokens and repairs words broken by ellipsis truncation.
///A token ending in `...` absorbs the following tokens (without separator) until the next token that
///itself ends in `...`. That token is not absorbed; it opens its own merge.
/// # Example
/// ```
/// use entity_trends::preprocess_text;
/// let cleaned = preprocess_text("Bureau of Land Man... age ment Act... 1976");
/// assert_eq!(cleaned, "Bureau of Land Man...agement Act...1976");
/// ```
pub fn preprocess_text(text: &str) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut cleaned: Vec<String> = Vec::with_capacity(tokens.len());

    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].ends_with(ELLIPSIS) {
            let mut split_word = tokens[i].to_string();
            while i + 1 < tokens.len() && !tokens[i + 1].ends_with(ELLIPSIS) {
                i += 1;
                split_word.push_str(tokens[i]);
            }
            cleaned.push(split_word);
        } else {
            cleaned.push(tokens[i].to_string());
        }
        i += 1;
    }

    cleaned.join(" ")
}

///Reads a document as UTF-8 text.
pub fn read_document(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}
