//! Best-effort cleanup of JSON-like model output.
//!
//! Generation prompts demand a strict JSON array, but models drift: single
//! or typographic quotes, unquoted keys, trailing commas, Python-style
//! `None`. [`repair_json_like`] rewrites those patterns so a second parse
//! attempt can succeed. It is only ever applied to text that already failed
//! to parse, so the blunt replacements cannot damage valid output.

use std::sync::LazyLock;

use regex::Regex;

static BARE_KEYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([{,]\s*)([A-Za-z0-9_]+)\s*:").expect("static pattern"));

static TRAILING_COMMAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("static pattern"));

static BARE_NULLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*(?:null|None|undefined)\s*([,}\]])").expect("static pattern"));

/// Rewrite common near-JSON mistakes into parseable JSON.
///
/// Applied fixes, in order: typographic quotes become ASCII, single quotes
/// become double quotes, bare object keys gain quotes, trailing commas are
/// dropped, and bare `null`/`None`/`undefined` values become empty strings
/// (missing fields are filled with placeholders downstream).
pub fn repair_json_like(input: &str) -> String {
    let mut s = input.replace(['\u{2018}', '\u{2019}'], "'");
    s = s.replace(['\u{201C}', '\u{201D}'], "\"");
    s = s.replace('\'', "\"");
    s = BARE_KEYS.replace_all(&s, "${1}\"${2}\":").into_owned();
    s = TRAILING_COMMAS.replace_all(&s, "${1}").into_owned();
    s = BARE_NULLS.replace_all(&s, ": \"\"${1}").into_owned();
    s
}
