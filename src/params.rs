// src/params.rs
//! Query parameters understood by the collection APIs.
//!
//! Recognized keys: `ac` (action), `pg` (1-based page), `pagesize`, `wd`
//! (keyword), `ids` (comma-joined ids), `t` (category/type id). Anything else
//! goes through [`QueryParams::raw`] untouched.

use std::fmt;
use url::Url;

/// `ac` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Full records including poster and play-list.
    Detail,
    /// Lightweight listing; carries the `class` (category) table.
    List,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Detail => "detail",
            Self::List => "list",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Num(i64),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Num(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        Self::Num(n)
    }
}

impl From<i32> for ParamValue {
    fn from(n: i32) -> Self {
        Self::Num(i64::from(n))
    }
}

impl From<u32> for ParamValue {
    fn from(n: u32) -> Self {
        Self::Num(i64::from(n))
    }
}

/// Ordered parameter bag. Setting a key twice replaces the earlier value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, ParamValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(self, ac: Action) -> Self {
        self.raw("ac", ac.as_str())
    }

    /// Pages are 1-based; `0` is treated as the first page.
    pub fn page(self, pg: u32) -> Self {
        self.raw("pg", pg.max(1))
    }

    pub fn page_size(self, n: u32) -> Self {
        self.raw("pagesize", n)
    }

    pub fn keyword(self, wd: &str) -> Self {
        self.raw("wd", wd.trim())
    }

    /// Single id or several; joined with commas, blanks skipped.
    pub fn ids<S: AsRef<str>>(self, ids: &[S]) -> Self {
        let joined = ids
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        self.raw("ids", joined)
    }

    pub fn type_id(self, t: u32) -> Self {
        self.raw("t", t)
    }

    pub fn raw<V: Into<ParamValue>>(mut self, key: &str, value: V) -> Self {
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key.to_string(), value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// `base` with these params appended after any query it already has.
    pub fn apply_to(&self, base: &Url) -> Url {
        let mut url = base.clone();
        if !self.pairs.is_empty() {
            let mut q = url.query_pairs_mut();
            for (k, v) in &self.pairs {
                q.append_pair(k, &v.to_string());
            }
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_is_one_based() {
        let p = QueryParams::new().page(0);
        assert_eq!(p.get("pg"), Some(&ParamValue::Num(1)));
        let p = QueryParams::new().page(3);
        assert_eq!(p.get("pg"), Some(&ParamValue::Num(3)));
    }

    #[test]
    fn ids_are_comma_joined() {
        let p = QueryParams::new().ids(&["12", " 34 ", ""]);
        assert_eq!(p.get("ids"), Some(&ParamValue::Str("12,34".into())));
    }

    #[test]
    fn apply_keeps_order_and_existing_query() {
        let base = Url::parse("https://api.test/vod/at/json?from=m3u8").unwrap();
        let p = QueryParams::new()
            .action(Action::Detail)
            .keyword("三体")
            .page(2)
            .page_size(24);
        let url = p.apply_to(&base);
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("from".into(), "m3u8".into()),
                ("ac".into(), "detail".into()),
                ("wd".into(), "三体".into()),
                ("pg".into(), "2".into()),
                ("pagesize".into(), "24".into()),
            ]
        );
    }

    #[test]
    fn setting_twice_replaces() {
        let p = QueryParams::new().page(1).page(5);
        assert_eq!(p.iter().count(), 1);
        assert_eq!(p.get("pg"), Some(&ParamValue::Num(5)));
    }
}
