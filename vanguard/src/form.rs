//! Typed parsing of repeated field groups in urlencoded forms.
//!
//! Editors submit variable-length lists as `group[idx].field=value` pairs, e.g.
//! `meta[0].label=Ticket&meta[0].value=OPS-1182`. Keys are checked against a fixed
//! schema and indices must run contiguously from zero.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::PostMeta;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("malformed group key {0:?}")]
    MalformedKey(String),
    #[error("unknown field {field:?} in group {group:?}")]
    UnknownField { group: &'static str, field: String },
    #[error("duplicate field {0:?}")]
    DuplicateField(String),
    #[error("group {group:?} skips index {missing}")]
    IndexGap { group: &'static str, missing: usize },
    #[error("group {group:?} entry {index} is missing {field:?}")]
    MissingField { group: &'static str, index: usize, field: &'static str },
    #[error("field {0:?} is required")]
    Required(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct GroupSchema {
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

pub const POST_META: GroupSchema = GroupSchema { name: "meta", fields: &["label", "value"] };

/// One parsed group entry, keyed by schema field name.
pub type GroupRecord = BTreeMap<&'static str, String>;

/// Parse every `schema.name[idx].field` pair; other keys are left to the caller.
pub fn parse_groups(pairs: &[(String, String)], schema: &GroupSchema) -> Result<Vec<GroupRecord>, FormError> {
    let mut by_index: BTreeMap<usize, GroupRecord> = BTreeMap::new();

    for (key, value) in pairs {
        let Some(rest) = key.strip_prefix(schema.name).and_then(|r| r.strip_prefix('[')) else {
            continue;
        };
        let (index, field) = split_index_field(rest).ok_or_else(|| FormError::MalformedKey(key.clone()))?;
        let field = schema
            .fields
            .iter()
            .copied()
            .find(|f| *f == field)
            .ok_or_else(|| FormError::UnknownField { group: schema.name, field: field.to_string() })?;
        if by_index.entry(index).or_default().insert(field, value.clone()).is_some() {
            return Err(FormError::DuplicateField(key.clone()));
        }
    }

    let mut records = Vec::with_capacity(by_index.len());
    for (expected, (index, record)) in by_index.into_iter().enumerate() {
        if index != expected {
            return Err(FormError::IndexGap { group: schema.name, missing: expected });
        }
        if let Some(field) = schema.fields.iter().copied().find(|f| !record.contains_key(f)) {
            return Err(FormError::MissingField { group: schema.name, index, field });
        }
        records.push(record);
    }
    Ok(records)
}

// "<digits>].<field>"
fn split_index_field(rest: &str) -> Option<(usize, &str)> {
    let (digits, tail) = rest.split_once(']')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index = digits.parse().ok()?;
    let field = tail.strip_prefix('.')?;
    if field.is_empty() {
        return None;
    }
    Some((index, field))
}

/// Post meta rows from a submitted editor form. Rows with an empty label are dropped.
pub fn post_meta_from_form(pairs: &[(String, String)]) -> Result<Vec<PostMeta>, FormError> {
    let records = parse_groups(pairs, &POST_META)?;
    Ok(records
        .into_iter()
        .filter_map(|mut r| {
            let label = r.remove("label").unwrap_or_default().trim().to_string();
            let value = r.remove("value").unwrap_or_default().trim().to_string();
            (!label.is_empty()).then_some(PostMeta { label, value })
        })
        .collect())
}

/// First value submitted for a plain form field.
pub fn field<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
}

/// Like [`field`], but trimmed and required to be non-empty.
pub fn required_field(pairs: &[(String, String)], name: &'static str) -> Result<String, FormError> {
    field(pairs, name).map(str::trim).filter(|v| !v.is_empty()).map(str::to_string).ok_or(FormError::Required(name))
}
