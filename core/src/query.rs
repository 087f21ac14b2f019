//! Query-string parameters in `application/x-www-form-urlencoded` form.
//!
//! Pairs keep the order they were given in. A raw string is parsed into pairs
//! first and then re-encoded, so hand-written query strings come out
//! normalized the same way as structured ones.

use std::collections::{BTreeMap, HashMap};

/// URL query parameters for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameters {
    Pairs(Vec<(String, String)>),
    Raw(String),
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters::Pairs(Vec::new())
    }
}

impl Parameters {
    pub fn pairs(&self) -> Vec<(String, String)> {
        match self {
            Parameters::Pairs(pairs) => pairs.clone(),
            Parameters::Raw(raw) => parse(raw),
        }
    }

    /// Encoded query string without the leading `?`. Empty when there are no
    /// pairs.
    pub fn to_query_string(&self) -> String {
        encode(&self.pairs())
    }
}

impl From<&str> for Parameters {
    fn from(raw: &str) -> Self {
        Parameters::Raw(raw.to_string())
    }
}

impl From<String> for Parameters {
    fn from(raw: String) -> Self {
        Parameters::Raw(raw)
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for Parameters {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Parameters::Pairs(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Parameters {
    fn from(pairs: [(K, V); N]) -> Self {
        Parameters::Pairs(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>> From<BTreeMap<K, V>> for Parameters {
    fn from(map: BTreeMap<K, V>) -> Self {
        Parameters::Pairs(map.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Hash maps have no stable order, so their pairs are sorted by key.
impl<K: Into<String>, V: Into<String>> From<HashMap<K, V>> for Parameters {
    fn from(map: HashMap<K, V>) -> Self {
        let mut pairs: Vec<(String, String)> = map.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        pairs.sort();
        Parameters::Pairs(pairs)
    }
}

/// Serialize pairs as `name=value` joined by `&`. Spaces become `+`; only
/// alphanumerics and `*-._` pass through unescaped.
pub fn encode(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Parse a query string into decoded pairs. A leading `?` is ignored, as are
/// empty segments. Malformed escapes are kept literally.
pub fn parse(raw: &str) -> Vec<(String, String)> {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect()
}
