//! Repair of loosely-quoted shell literals into strict JSON text
//!
//! Shell users (and query generators) write `{status: 'open', $or: [...]}`,
//! `ObjectId("...")` and `["$first", " ", "$last"]` with bare `$first`.
//! [`normalize`] rewrites such a fragment in four ordered passes:
//!
//! 1. [`normalize_quotes`]: single-quoted strings become double-quoted
//! 2. [`quote_bare_keys`]: `{key:` / `, $op:` get their key quoted
//! 3. [`rewrite_constructors`]: `ObjectId("..")` / `ISODate("..")` become
//!    `{"$oid": ".."}` / `{"$date": ".."}`
//! 4. [`quote_bare_array_elements`]: bare identifiers inside arrays get quoted
//!
//! Every pass is a character scan that leaves double-quoted strings alone, so
//! running it on strict JSON returns the input unchanged.

/// Run all repair passes over one argument fragment.
///
/// A blank fragment becomes `{}`.
pub fn normalize(fragment: &str) -> String {
    if fragment.trim().is_empty() {
        return "{}".to_string();
    }

    let text = normalize_quotes(fragment);
    let text = quote_bare_keys(&text);
    let text = rewrite_constructors(&text);
    quote_bare_array_elements(&text)
}

/// Pass 1: turn `'text'` into `"text"`.
///
/// Apostrophes inside double-quoted strings are content and stay. A `"`
/// inside a single-quoted string is escaped so the result stays one string.
pub fn normalize_quotes(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut state = ScanState::Normal;
    let mut escaped = false;

    for ch in input.chars() {
        match state {
            ScanState::Normal => match ch {
                '\'' => {
                    output.push('"');
                    state = ScanState::SingleString;
                }
                '"' => {
                    output.push('"');
                    state = ScanState::DoubleString;
                }
                _ => output.push(ch),
            },
            ScanState::DoubleString => {
                output.push(ch);
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '"' {
                    state = ScanState::Normal;
                }
            }
            ScanState::SingleString => {
                if escaped {
                    escaped = false;
                    if ch != '\'' {
                        output.push('\\');
                    }
                    output.push(ch);
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '\'' {
                    output.push('"');
                    state = ScanState::Normal;
                } else if ch == '"' {
                    output.push_str("\\\"");
                } else {
                    output.push(ch);
                }
            }
        }
    }

    output
}

/// Pass 2: quote bare mapping keys, operator keys included.
///
/// A key is an identifier (`[A-Za-z_$][A-Za-z0-9_$.]*`) preceded by `{` or
/// `,` and followed by `:`, ignoring whitespace on both sides.
pub fn quote_bare_keys(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut output = String::with_capacity(input.len() + 8);
    let mut prev_non_ws: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if ch == '"' {
            let end = string_end(&chars, i);
            output.extend(&chars[i..end]);
            prev_non_ws = Some('"');
            i = end;
            continue;
        }

        if is_ident_start(ch) && matches!(prev_non_ws, Some('{') | Some(',')) {
            let end = ident_end(&chars, i, true);
            if next_non_ws(&chars, end) == Some(':') {
                output.push('"');
                output.extend(&chars[i..end]);
                output.push('"');
                prev_non_ws = Some('"');
            } else {
                output.extend(&chars[i..end]);
                prev_non_ws = Some(chars[end - 1]);
            }
            i = end;
            continue;
        }

        output.push(ch);
        if !ch.is_whitespace() {
            prev_non_ws = Some(ch);
        }
        i += 1;
    }

    output
}

/// Pass 3: rewrite identifier constructors into extended-JSON mappings.
///
/// - `ObjectId("<24 hex>")` and `new ObjectId(..)` → `{"$oid": "<24 hex>"}`
/// - `ISODate("<text>")`, `new ISODate(..)`, `new Date("<text>")` → `{"$date": "<text>"}`
///
/// Calls that do not fit (wrong hex length, missing string argument) are
/// left as written and will fail decoding.
pub fn rewrite_constructors(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut output = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if ch == '"' {
            let end = string_end(&chars, i);
            output.extend(&chars[i..end]);
            i = end;
            continue;
        }

        let at_boundary = i == 0 || !is_ident_char(chars[i - 1]);
        if is_ident_start(ch) && at_boundary {
            let end = ident_end(&chars, i, false);
            let word: String = chars[i..end].iter().collect();

            if let Some((replacement, next)) = match_constructor(&chars, &word, end) {
                output.push_str(&replacement);
                i = next;
            } else {
                output.push_str(&word);
                i = end;
            }
            continue;
        }

        output.push(ch);
        i += 1;
    }

    output
}

/// Pass 4: quote bare identifiers standing alone as array elements.
///
/// `[$first, " ", $last]` → `["$first", " ", "$last"]`. JSON literals
/// (`true`, `false`, `null`) are left alone.
pub fn quote_bare_array_elements(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut output = String::with_capacity(input.len() + 8);
    let mut nesting: Vec<char> = Vec::new();
    let mut prev_non_ws: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if ch == '"' {
            let end = string_end(&chars, i);
            output.extend(&chars[i..end]);
            prev_non_ws = Some('"');
            i = end;
            continue;
        }

        if is_ident_start(ch)
            && nesting.last() == Some(&'[')
            && matches!(prev_non_ws, Some('[') | Some(','))
        {
            let end = ident_end(&chars, i, true);
            let word: String = chars[i..end].iter().collect();
            let standalone = matches!(next_non_ws(&chars, end), Some(',') | Some(']'));

            if standalone && !matches!(word.as_str(), "true" | "false" | "null") {
                output.push('"');
                output.push_str(&word);
                output.push('"');
                prev_non_ws = Some('"');
            } else {
                output.push_str(&word);
                prev_non_ws = Some(chars[end - 1]);
            }
            i = end;
            continue;
        }

        match ch {
            '[' | '{' => nesting.push(ch),
            ']' | '}' => {
                nesting.pop();
            }
            _ => {}
        }

        output.push(ch);
        if !ch.is_whitespace() {
            prev_non_ws = Some(ch);
        }
        i += 1;
    }

    output
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanState {
    Normal,
    SingleString,
    DoubleString,
}

/// Try to read `Ctor ( "arg" )` starting right after the constructor name.
///
/// Returns the replacement text and the index just past the closing paren.
fn match_constructor(chars: &[char], word: &str, after_word: usize) -> Option<(String, usize)> {
    let (name, name_end) = if word == "new" {
        let start = skip_ws(chars, after_word);
        if start == after_word || start >= chars.len() || !is_ident_start(chars[start]) {
            return None;
        }
        let end = ident_end(chars, start, false);
        (chars[start..end].iter().collect::<String>(), end)
    } else {
        (word.to_string(), after_word)
    };

    let with_new = word == "new";
    let key = match name.as_str() {
        "ObjectId" => "$oid",
        "ISODate" => "$date",
        "Date" if with_new => "$date",
        _ => return None,
    };

    let open = skip_ws(chars, name_end);
    if chars.get(open) != Some(&'(') {
        return None;
    }
    let quote = skip_ws(chars, open + 1);
    if chars.get(quote) != Some(&'"') {
        return None;
    }
    let literal_end = string_end(chars, quote);
    if literal_end > chars.len() || chars.get(literal_end - 1) != Some(&'"') || literal_end - quote < 2
    {
        return None;
    }
    let close = skip_ws(chars, literal_end);
    if chars.get(close) != Some(&')') {
        return None;
    }

    let literal: String = chars[quote + 1..literal_end - 1].iter().collect();
    if key == "$oid" && !is_object_id_hex(&literal) {
        return None;
    }

    Some((format!("{{\"{key}\": \"{literal}\"}}"), close + 1))
}

fn is_object_id_hex(text: &str) -> bool {
    text.len() == 24 && text.chars().all(|c| c.is_ascii_hexdigit())
}

/// Index just past the string literal opening at `start`.
fn string_end(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '"' => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

fn ident_end(chars: &[char], start: usize, allow_dots: bool) -> usize {
    let mut i = start;
    while i < chars.len() && (is_ident_char(chars[i]) || (allow_dots && chars[i] == '.')) {
        i += 1;
    }
    i
}

fn skip_ws(chars: &[char], start: usize) -> usize {
    let mut i = start;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

fn next_non_ws(chars: &[char], start: usize) -> Option<char> {
    chars.get(skip_ws(chars, start)).copied()
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || matches!(ch, '_' | '$')
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_text_is_unchanged() {
        for strict in [
            r#"{"status": "open"}"#,
            r#"[{"$match": {"a": 1}}, {"$limit": 5}]"#,
            r#"{"name": "O'Brien", "tags": ["x", true, null]}"#,
            r#""status""#,
        ] {
            assert_eq!(normalize(strict), strict);
        }
    }

    #[test]
    fn test_blank_fragment_is_empty_mapping() {
        assert_eq!(normalize(""), "{}");
        assert_eq!(normalize("  \n\t"), "{}");
    }

    #[test]
    fn test_normalize_quotes() {
        assert_eq!(normalize_quotes("{a: 'open'}"), r#"{a: "open"}"#);
        assert_eq!(normalize_quotes(r#"{a: 'say "hi"'}"#), r#"{a: "say \"hi\""}"#);
        assert_eq!(normalize_quotes(r"{a: 'it\'s'}"), r#"{a: "it's"}"#);
        assert_eq!(normalize_quotes(r#"{"a": "it's"}"#), r#"{"a": "it's"}"#);
    }

    #[test]
    fn test_quote_bare_keys() {
        assert_eq!(quote_bare_keys("{status: 1}"), r#"{"status": 1}"#);
        assert_eq!(
            quote_bare_keys("{ $or : [{a:1}, {b :2}] }"),
            r#"{ "$or" : [{"a":1}, {"b" :2}] }"#
        );
        assert_eq!(quote_bare_keys("{address.city: 1}"), r#"{"address.city": 1}"#);
        assert_eq!(quote_bare_keys(r#"{"a": "x, y: z"}"#), r#"{"a": "x, y: z"}"#);
    }

    #[test]
    fn test_quote_bare_keys_leaves_values() {
        assert_eq!(quote_bare_keys("{a: true, b: null}"), r#"{"a": true, "b": null}"#);
        assert_eq!(quote_bare_keys("[a, b]"), "[a, b]");
    }

    #[test]
    fn test_rewrite_object_id() {
        assert_eq!(
            rewrite_constructors(r#"{"_id": ObjectId("507f1f77bcf86cd799439011")}"#),
            r#"{"_id": {"$oid": "507f1f77bcf86cd799439011"}}"#
        );
        assert_eq!(
            rewrite_constructors(r#"{"_id": new ObjectId( "507f1f77bcf86cd799439011" )}"#),
            r#"{"_id": {"$oid": "507f1f77bcf86cd799439011"}}"#
        );
    }

    #[test]
    fn test_rewrite_dates() {
        assert_eq!(
            rewrite_constructors(r#"{"d": {"$gte": ISODate("2024-01-01T00:00:00Z")}}"#),
            r#"{"d": {"$gte": {"$date": "2024-01-01T00:00:00Z"}}}"#
        );
        assert_eq!(
            rewrite_constructors(r#"{"d": new Date("2024-01-01")}"#),
            r#"{"d": {"$date": "2024-01-01"}}"#
        );
    }

    #[test]
    fn test_rewrite_leaves_bad_constructors() {
        let short = r#"{"_id": ObjectId("abc")}"#;
        assert_eq!(rewrite_constructors(short), short);
        let bare_date = r#"{"d": Date("2024-01-01")}"#;
        assert_eq!(rewrite_constructors(bare_date), bare_date);
        let inside_string = r#"{"note": "ObjectId(\"507f1f77bcf86cd799439011\")"}"#;
        assert_eq!(rewrite_constructors(inside_string), inside_string);
    }

    #[test]
    fn test_quote_bare_array_elements() {
        assert_eq!(
            quote_bare_array_elements(r#"{"$concat": [$first, " ", $last.name]}"#),
            r#"{"$concat": ["$first", " ", "$last.name"]}"#
        );
        assert_eq!(
            quote_bare_array_elements("[true, false, null, 1]"),
            "[true, false, null, 1]"
        );
        assert_eq!(quote_bare_array_elements("{a: b}"), "{a: b}");
    }

    #[test]
    fn test_full_repair() {
        assert_eq!(
            normalize("{status:'open', $or:[{a:1}]}"),
            r#"{"status":"open", "$or":[{"a":1}]}"#
        );
        assert_eq!(normalize("'status'"), r#""status""#);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let loose = r#"[{$match: {_id: ObjectId('507f1f77bcf86cd799439011')}}, {$project: {n: {$concat: [$a, ' ', $b]}}}]"#;
        let once = normalize(loose);
        assert_eq!(normalize(&once), once);
    }
}
