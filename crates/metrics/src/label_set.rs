//! Canonical label-set keys.
//!
//! A label-set is rendered as `key="value"` pairs sorted by key and joined
//! with `,`. The rendered string is both the accumulator key inside the
//! registry and the label block of the text exposition, so two label slices
//! holding the same pairs in a different order always land on one series.

use std::{collections::BTreeMap, fmt};

/// Canonicalized label-set, e.g. `model="gpt-4",provider="openai"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelKey(String);

impl LabelKey {
    /// Canonicalize a label slice.
    pub fn new(labels: &[(&str, &str)]) -> Self {
        let mut pairs: Vec<&(&str, &str)> = labels.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));

        let mut out = String::new();
        for (i, (key, value)) in pairs.into_iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(key);
            out.push_str("=\"");
            escape_into(&mut out, value);
            out.push('"');
        }
        Self(out)
    }

    /// Build from owned pairs, as produced by the `metrics` facade.
    pub fn from_owned(labels: &[(String, String)]) -> Self {
        let borrowed: Vec<(&str, &str)> = labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        Self::new(&borrowed)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode the canonical string back into a label map.
    pub fn decode(&self) -> BTreeMap<String, String> {
        decode(&self.0)
    }
}

impl fmt::Display for LabelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn escape_into(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
}

/// Reverse of [`LabelKey::new`]: `a="1",b="x"` → `{a: 1, b: x}`.
///
/// Quoted values may contain `,` and `=`; escapes are undone.
pub fn decode(raw: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    let mut rest = raw;

    while !rest.is_empty() {
        let Some((key, after_eq)) = rest.split_once('=') else {
            break;
        };
        let Some(quoted) = after_eq.strip_prefix('"') else {
            break;
        };

        let mut value = String::new();
        let mut consumed = None;
        let mut chars = quoted.char_indices();
        while let Some((i, ch)) = chars.next() {
            match ch {
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, c)) => value.push(c),
                    None => break,
                },
                '"' => {
                    consumed = Some(i + 1);
                    break;
                },
                c => value.push(c),
            }
        }

        let Some(end) = consumed else {
            break;
        };
        labels.insert(key.to_string(), value);
        rest = quoted[end..].strip_prefix(',').unwrap_or(&quoted[end..]);
    }

    labels
}
