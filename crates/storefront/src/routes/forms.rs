//! Helpers for forms and query strings with repeated or dynamic keys.
//!
//! `serde_urlencoded` cannot collect `product=1&product=2` into a `Vec`, and
//! pack selections arrive as one `item_<slot>` field per slot, so those
//! handlers take the raw body or query and read it through [`FormPairs`].

use std::collections::BTreeMap;
use std::str::FromStr;

use axum::extract::Multipart;
use vitrine_core::{PackItemId, ProductId};

use crate::api::Upload;
use crate::error::AppError;

/// Prefix of pack slot fields: `item_<pack item id>=<product id>`.
pub const PACK_SLOT_PREFIX: &str = "item_";

/// Decoded `key=value` pairs in submission order.
#[derive(Debug, Clone, Default)]
pub struct FormPairs(Vec<(String, String)>);

impl FormPairs {
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        Self(
            url::form_urlencoded::parse(raw)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        )
    }

    #[must_use]
    pub fn from_query(raw: Option<&str>) -> Self {
        raw.map_or_else(Self::default, |q| Self::parse(q.as_bytes()))
    }

    /// First non-blank value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, v)| k == key && !v.trim().is_empty())
            .map(|(_, v)| v.trim())
    }

    /// Every value for `key` that parses, in order; duplicates kept.
    #[must_use]
    pub fn all<T: FromStr>(&self, key: &str) -> Vec<T> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .filter_map(|(_, v)| v.trim().parse().ok())
            .collect()
    }

    /// Whether a checkbox named `key` was ticked.
    #[must_use]
    pub fn checked(&self, key: &str) -> bool {
        self.0
            .iter()
            .any(|(k, v)| k == key && matches!(v.as_str(), "on" | "true" | "1"))
    }

    /// Pack slot choices from `item_<slot>=<product>` fields.
    #[must_use]
    pub fn pack_slots(&self) -> Vec<(PackItemId, ProductId)> {
        self.0
            .iter()
            .filter_map(|(k, v)| {
                let item = k.strip_prefix(PACK_SLOT_PREFIX)?.parse().ok()?;
                let product = v.trim().parse().ok()?;
                Some((item, product))
            })
            .collect()
    }

    /// Fields of repeated rows named `<prefix><index>.<field>`, one
    /// [`FormPairs`] per index in ascending order.
    #[must_use]
    pub fn rows(&self, prefix: &str) -> Vec<Self> {
        let mut rows: BTreeMap<usize, Self> = BTreeMap::new();
        for (key, value) in &self.0 {
            let Some((index, field)) = key
                .strip_prefix(prefix)
                .and_then(|rest| rest.split_once('.'))
            else {
                continue;
            };
            let Ok(index) = index.parse() else {
                continue;
            };
            rows.entry(index)
                .or_default()
                .0
                .push((field.to_string(), value.clone()));
        }
        rows.into_values().collect()
    }

    /// Non-blank `(suffix, value)` pairs for keys starting with `prefix`.
    #[must_use]
    pub fn prefixed(&self, prefix: &str) -> Vec<(&str, &str)> {
        self.0
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .filter_map(|(k, v)| Some((k.strip_prefix(prefix)?, v.trim())))
            .collect()
    }

    /// Whether every value is blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|(_, v)| v.trim().is_empty())
    }

    /// Re-encode as a query string.
    #[must_use]
    pub fn to_query(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter())
            .finish()
    }
}

/// Text fields and uploaded files from a multipart admin form.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: FormPairs,
    pub files: Vec<(String, Upload)>,
}

impl MultipartForm {
    /// Drain a multipart body. Empty file inputs are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadRequest`] if the body is malformed.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(ToString::to_string) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                    if file_name.is_empty() || bytes.is_empty() {
                        continue;
                    }
                    form.files.push((
                        name,
                        Upload {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    ));
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?;
                    form.fields.0.push((name, value));
                }
            }
        }
        Ok(form)
    }

    /// Files uploaded under `name`.
    #[must_use]
    pub fn take_files(&mut self, name: &str) -> Vec<Upload> {
        let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(field, _)| field == name);
        self.files = rest;
        matching.into_iter().map(|(_, upload)| upload).collect()
    }

    /// Text field that must be present and non-blank.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadRequest`] naming the missing field.
    pub fn required(&self, name: &str) -> Result<String, AppError> {
        self.fields
            .get(name)
            .map(ToString::to_string)
            .ok_or_else(|| AppError::BadRequest(format!("{name} is required")))
    }

    /// Text field parsed into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadRequest`] if missing or unparsable.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<T, AppError> {
        self.required(name)?
            .parse()
            .map_err(|_| AppError::BadRequest(format!("{name} is invalid")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_keys_are_collected() {
        let pairs = FormPairs::parse(b"product=3&product=5&product=x&name=Duo");
        assert_eq!(
            pairs.all::<ProductId>("product"),
            vec![ProductId::new(3), ProductId::new(5)]
        );
        assert_eq!(pairs.get("name"), Some("Duo"));
        assert_eq!(pairs.get("missing"), None);
    }

    #[test]
    fn test_pack_slots() {
        let pairs = FormPairs::from_query(Some("item_4=10&item_7=22&item_x=1&other=2"));
        assert_eq!(
            pairs.pack_slots(),
            vec![
                (PackItemId::new(4), ProductId::new(10)),
                (PackItemId::new(7), ProductId::new(22)),
            ]
        );
    }

    #[test]
    fn test_checkbox_and_blank_values() {
        let pairs = FormPairs::parse(b"enabled=on&title=+++");
        assert!(pairs.checked("enabled"));
        assert!(!pairs.checked("bestseller"));
        assert_eq!(pairs.get("title"), None);
    }

    #[test]
    fn test_rows_group_by_index() {
        let pairs = FormPairs::parse(
            b"variant1.price=12&variant0.price=10&variant0.attr.Size=M\
              &variant_type0.name=Size&variantx.price=1&variant1.attr.Size=",
        );
        let rows = pairs.rows("variant");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("price"), Some("10"));
        assert_eq!(rows[0].prefixed("attr."), vec![("Size", "M")]);
        assert_eq!(rows[1].get("price"), Some("12"));
        assert!(rows[1].prefixed("attr.").is_empty());
        assert!(!rows[1].is_blank());
        assert!(FormPairs::parse(b"a=+&b=").is_blank());
    }

    #[test]
    fn test_to_query_round_trips_order() {
        let pairs = FormPairs::parse(b"item_1=2&item_3=4");
        assert_eq!(pairs.to_query(), "item_1=2&item_3=4");
    }
}
