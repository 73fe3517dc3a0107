use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

mod parsers;
mod scanner;

use parsers::{
    is_block_comment_end, is_block_comment_start, is_line_comment_start, matches_tag,
    try_start_dollar_quote,
};
use scanner::{State, is_identifier_byte, scan_digits, scan_identifier};

use crate::schema::{POSTGRES_SCHEMA, SQLITE_SCHEMA, SchemaStatement};
use crate::types::{DatabaseType, RowValues};

/// Portable function spellings and their `PostgreSQL` equivalents.
const PORTABLE_FUNCTIONS: &[(&str, &str)] = &[("IFNULL", "COALESCE")];

lazy_static! {
    static ref INSERT_STATEMENT: Regex =
        Regex::new(r"(?i)^\s*INSERT\b").expect("insert pattern is valid");
    static ref RETURNING_CLAUSE: Regex =
        Regex::new(r"(?i)\bRETURNING\b").expect("returning pattern is valid");
}

/// A query template paired with the parameters it binds, in the active backend's syntax.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery<'a> {
    pub sql: Cow<'a, str>,
    pub params: &'a [RowValues],
}

/// Backend-specific SQL spelling.
///
/// Templates are written once with bare `?` placeholders; each dialect turns them into what
/// its driver accepts. The façade only ever talks to this trait.
pub trait Dialect: Send + Sync {
    /// Backend this dialect targets.
    fn kind(&self) -> DatabaseType;

    /// Rewrite `sql` for this backend. The Nth placeholder keeps binding the Nth parameter.
    fn translate<'a>(&self, sql: &'a str, params: &'a [RowValues]) -> TranslatedQuery<'a>;

    /// Ordered, idempotent table definitions for this backend.
    fn schema(&self) -> &'static [SchemaStatement];
}

/// `PostgreSQL`: `?` becomes `$1, $2, …` and portable functions are respelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientServerDialect;

/// `SQLite`: templates are already native.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedDialect;

impl Dialect for ClientServerDialect {
    fn kind(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    fn translate<'a>(&self, sql: &'a str, params: &'a [RowValues]) -> TranslatedQuery<'a> {
        TranslatedQuery {
            sql: translate_placeholders(sql),
            params,
        }
    }

    fn schema(&self) -> &'static [SchemaStatement] {
        POSTGRES_SCHEMA
    }
}

impl Dialect for EmbeddedDialect {
    fn kind(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn translate<'a>(&self, sql: &'a str, params: &'a [RowValues]) -> TranslatedQuery<'a> {
        TranslatedQuery {
            sql: Cow::Borrowed(sql),
            params,
        }
    }

    fn schema(&self) -> &'static [SchemaStatement] {
        SQLITE_SCHEMA
    }
}

static CLIENT_SERVER: ClientServerDialect = ClientServerDialect;
static EMBEDDED: EmbeddedDialect = EmbeddedDialect;

/// Dialect for a backend kind.
#[must_use]
pub fn dialect_for(kind: DatabaseType) -> &'static dyn Dialect {
    match kind {
        DatabaseType::Postgres => &CLIENT_SERVER,
        DatabaseType::Sqlite => &EMBEDDED,
    }
}

fn portable_function(word: &str) -> Option<&'static str> {
    PORTABLE_FUNCTIONS
        .iter()
        .find(|(portable, _)| portable.eq_ignore_ascii_case(word))
        .map(|(_, native)| *native)
}

/// Rewrite `?` placeholders to `$N` and respell portable functions for `PostgreSQL`.
///
/// Bare `?` tokens are numbered by order of appearance. An explicit `?N` maps to `$N`
/// without consuming a slot. Quoted strings, quoted identifiers, comments and dollar-quoted
/// blocks are copied untouched by a lightweight state machine; it may still miss edge cases
/// in exotic SQL.
///
/// Returns a borrowed `Cow` when no changes are needed.
#[must_use]
pub fn translate_placeholders(sql: &str) -> Cow<'_, str> {
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut next_position = 1usize;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, close)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = close;
                    }
                }
                b'?' => {
                    let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 8));
                    buf.push_str(&sql[copied..idx]);
                    buf.push('$');
                    if let Some((digits_end, digits)) = scan_digits(bytes, idx + 1) {
                        buf.push_str(digits);
                        idx = digits_end;
                    } else {
                        buf.push_str(&next_position.to_string());
                        next_position += 1;
                        idx += 1;
                    }
                    copied = idx;
                    continue;
                }
                _ if is_identifier_byte(b) => {
                    let word_end = scan_identifier(bytes, idx);
                    if let Some(native) = portable_function(&sql[idx..word_end]) {
                        let buf =
                            out.get_or_insert_with(|| String::with_capacity(sql.len() + 8));
                        buf.push_str(&sql[copied..idx]);
                        buf.push_str(native);
                        copied = word_end;
                    }
                    idx = word_end;
                    continue;
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1; // escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

/// True for statements that begin with `INSERT`.
#[must_use]
pub fn is_insert(sql: &str) -> bool {
    INSERT_STATEMENT.is_match(sql)
}

/// True when the statement already asks for generated values back.
#[must_use]
pub fn has_returning(sql: &str) -> bool {
    RETURNING_CLAUSE.is_match(sql)
}

/// Append `RETURNING id` to an INSERT that does not already request a key.
#[must_use]
pub fn with_returning_id(sql: &str) -> Cow<'_, str> {
    if !is_insert(sql) || has_returning(sql) {
        return Cow::Borrowed(sql);
    }
    let trimmed = sql.trim_end().trim_end_matches(';').trim_end();
    Cow::Owned(format!("{trimmed} RETURNING id"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Placeholder numbers in the order they appear, ignoring literals.
    fn placeholder_order(sql: &str) -> Vec<usize> {
        let re = Regex::new(r"\$(\d+)").unwrap();
        re.captures_iter(sql)
            .map(|cap| cap[1].parse().unwrap())
            .collect()
    }

    #[test]
    fn numbers_bare_placeholders_left_to_right() {
        let sql = "select * from t where a = ? and b = ? and c = ?";
        let res = translate_placeholders(sql);
        assert_eq!(res, "select * from t where a = $1 and b = $2 and c = $3");
    }

    #[test]
    fn application_templates_keep_positional_binding() {
        let templates = [
            "INSERT INTO carousel_images (image_url, link_url, alt_text, file_name, display_order) VALUES (?, ?, ?, ?, (SELECT IFNULL(MAX(display_order), 0) + 1 FROM carousel_images))",
            "DELETE FROM settings WHERE setting_name = ?",
            "INSERT INTO settings (setting_name, setting_value) VALUES (?, ?)",
            "SELECT setting_name, setting_value FROM settings WHERE setting_name IN (?, ?, ?)",
            "SELECT id, username, password FROM users WHERE username = ?",
            "DELETE FROM users WHERE id = ?",
        ];
        for template in templates {
            let expected = template.matches('?').count();
            let translated = translate_placeholders(template);
            assert_eq!(
                placeholder_order(&translated),
                (1..=expected).collect::<Vec<_>>(),
                "template: {template}"
            );
            assert!(!translated.contains('?'));
        }
    }

    #[test]
    fn embedded_dialect_passes_through_untouched() {
        let params = [RowValues::Int(1), RowValues::Text("a".into())];
        let sql = "SELECT IFNULL(a, ?) FROM t WHERE b = ?";
        let translated = EmbeddedDialect.translate(sql, &params);
        assert!(matches!(translated.sql, Cow::Borrowed(_)));
        assert_eq!(translated.sql, sql);
        assert_eq!(translated.params, &params);
    }

    #[test]
    fn client_server_dialect_keeps_parameter_list() {
        let params = [RowValues::Text("k".into()), RowValues::Text("v".into())];
        let translated = ClientServerDialect.translate(
            "INSERT INTO settings (setting_name, setting_value) VALUES (?, ?)",
            &params,
        );
        assert_eq!(
            translated.sql,
            "INSERT INTO settings (setting_name, setting_value) VALUES ($1, $2)"
        );
        assert_eq!(translated.params, &params);
    }

    #[test]
    fn rewrites_portable_functions_as_whole_words() {
        let sql = "SELECT ifnull(MAX(display_order), 0) + 1, my_ifnull_col FROM t";
        let res = translate_placeholders(sql);
        assert_eq!(
            res,
            "SELECT COALESCE(MAX(display_order), 0) + 1, my_ifnull_col FROM t"
        );
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select '?', ? -- ?\n/* ? IFNULL */ from t where a = ? and b = 'IFNULL'";
        let res = translate_placeholders(sql);
        assert_eq!(
            res,
            "select '?', $1 -- ?\n/* ? IFNULL */ from t where a = $2 and b = 'IFNULL'"
        );
    }

    #[test]
    fn skips_dollar_quoted_blocks() {
        let sql = "$foo$ select ? from t $foo$ where a = ?";
        let res = translate_placeholders(sql);
        assert_eq!(res, "$foo$ select ? from t $foo$ where a = $1");
    }

    #[test]
    fn explicit_numbers_do_not_consume_slots() {
        let res = translate_placeholders("select ?2, ?, ?1");
        assert_eq!(res, "select $2, $1, $1");
    }

    #[test]
    fn preserves_multibyte_text() {
        let res = translate_placeholders("select 'école ?', ? as «x»");
        assert_eq!(res, "select 'école ?', $1 as «x»");
    }

    #[test]
    fn untouched_sql_is_borrowed() {
        let sql = "CREATE TABLE IF NOT EXISTS t (id SERIAL PRIMARY KEY)";
        assert!(matches!(translate_placeholders(sql), Cow::Borrowed(_)));
    }

    #[test]
    fn returning_clause_is_appended_once() {
        assert_eq!(
            with_returning_id("INSERT INTO users (username) VALUES ($1);"),
            "INSERT INTO users (username) VALUES ($1) RETURNING id"
        );
        let already = "insert into t (a) values ($1) returning a";
        assert_eq!(with_returning_id(already), already);
        let delete = "DELETE FROM t WHERE id = $1";
        assert_eq!(with_returning_id(delete), delete);
    }

    #[test]
    fn dialect_lookup_matches_kind() {
        assert_eq!(dialect_for(DatabaseType::Postgres).kind(), DatabaseType::Postgres);
        assert_eq!(dialect_for(DatabaseType::Sqlite).kind(), DatabaseType::Sqlite);
        assert_eq!(dialect_for(DatabaseType::Sqlite).schema().len(), 3);
    }
}
