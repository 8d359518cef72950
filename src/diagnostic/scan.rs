//! Keyword detection over raw command text.

use crate::ast::SqlKeyword;

/// The fixed scan vocabulary, alphabetical by token.
const VOCABULARY: &[(&str, SqlKeyword)] = &[
    ("ALTER", SqlKeyword::Alter),
    ("BEGIN", SqlKeyword::Begin),
    ("CREATE", SqlKeyword::Create),
    ("DELETE FROM", SqlKeyword::DeleteFrom),
    ("DROP", SqlKeyword::Drop),
    ("END", SqlKeyword::End),
    ("EXISTS", SqlKeyword::Exists),
    ("FROM", SqlKeyword::From),
    ("GRANT", SqlKeyword::Grant),
    ("GROUP BY", SqlKeyword::GroupBy),
    ("INSERT INTO", SqlKeyword::InsertInto),
    ("ORDER BY", SqlKeyword::OrderBy),
    ("SELECT", SqlKeyword::Select),
    ("SET", SqlKeyword::Set),
    ("UPDATE", SqlKeyword::Update),
    ("VALUES", SqlKeyword::Values),
    ("WHERE", SqlKeyword::Where),
];

/// Detect which vocabulary keywords appear as whole words in `text`,
/// case-insensitively. The command text is padded with boundary spaces and
/// newlines are flattened so tokens at the edges still match.
pub fn scan_keywords(text: &str) -> Vec<SqlKeyword> {
    let padded = format!(" {} ", text.to_ascii_uppercase().replace(['\r', '\n'], " "));
    VOCABULARY
        .iter()
        .filter(|(token, _)| padded.contains(&format!(" {token} ")))
        .map(|&(_, keyword)| keyword)
        .collect()
}
