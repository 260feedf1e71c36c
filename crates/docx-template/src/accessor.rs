/*
 * accessor.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Dot-path resolution over data records.
//!
//! Each path segment is consumed against the current value: records match it
//! as a case-insensitive key, lists parse it as a non-negative index.

use crate::error::DataAccessError;
use crate::value::{Record, Value};

/// Walk `path` through `data` and return the value it names.
pub fn lookup<'a, S: AsRef<str>>(
    data: &'a Record,
    path: &[S],
) -> Result<&'a Value, DataAccessError> {
    let full_path = join_path(path);
    let Some((first, rest)) = path.split_first() else {
        return Err(DataAccessError::PathNotFound { path: full_path });
    };

    let mut current = data.lookup(first.as_ref(), &full_path)?;
    for segment in rest {
        current = step(current, segment.as_ref(), &full_path)?;
    }
    Ok(current)
}

/// Walk `path` through `data` and render the leaf as text.
pub fn resolve<S: AsRef<str>>(data: &Record, path: &[S]) -> Result<String, DataAccessError> {
    lookup(data, path)?.to_text()
}

fn step<'a>(
    value: &'a Value,
    segment: &str,
    full_path: &str,
) -> Result<&'a Value, DataAccessError> {
    match value {
        Value::Record(record) => record.lookup(segment, full_path),
        Value::List(items) => {
            let index = parse_index(segment)?;
            items.get(index).ok_or(DataAccessError::IndexOutOfBounds {
                index,
                len: items.len(),
            })
        }
        _ => Err(DataAccessError::PathNotFound {
            path: full_path.to_string(),
        }),
    }
}

fn parse_index(segment: &str) -> Result<usize, DataAccessError> {
    let invalid = || DataAccessError::InvalidIndex {
        segment: segment.to_string(),
    };
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    segment.parse().map_err(|_| invalid())
}

pub(crate) fn join_path<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(".")
}
