//! In-process evaluation of the filter subset the API builds.
//!
//! Supported: top-level (and dotted) field equality, `$eq`, `$regex` with
//! `$options`, BSON regular expressions, `$or` and `$and`. Anything else is
//! rejected with [`StoreError::UnsupportedFilter`] instead of silently
//! matching.

use std::cmp::Ordering;

use bson::{Bson, Document};
use regex::{Regex, RegexBuilder};

use crate::{
    error::{StoreError, StoreResult},
    query::Projection,
};

pub(crate) fn matches(doc: &Document, filter: &Document) -> StoreResult<bool> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$or" => {
                let mut any = false;
                for branch in branches(key, condition)? {
                    if matches(doc, branch)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$and" => {
                let mut all = true;
                for branch in branches(key, condition)? {
                    if !matches(doc, branch)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            op if op.starts_with('$') => {
                return Err(StoreError::UnsupportedFilter(op.to_string()));
            }
            field => field_matches(lookup(doc, field), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn branches<'a>(op: &str, condition: &'a Bson) -> StoreResult<Vec<&'a Document>> {
    let Bson::Array(items) = condition else {
        return Err(StoreError::UnsupportedFilter(format!("{op} expects an array")));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => Ok(d),
            _ => Err(StoreError::UnsupportedFilter(format!("{op} expects documents"))),
        })
        .collect()
}

/// Resolve a possibly dotted path through embedded documents.
fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

fn field_matches(value: Option<&Bson>, condition: &Bson) -> StoreResult<bool> {
    match condition {
        Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => {
            operators_match(value, ops)
        }
        Bson::RegularExpression(re) => {
            let regex = compile(&re.pattern, &re.options)?;
            Ok(value.is_some_and(|v| regex_matches(&regex, v)))
        }
        expected => Ok(equals_or_contains(value, expected)),
    }
}

fn operators_match(value: Option<&Bson>, ops: &Document) -> StoreResult<bool> {
    for (op, operand) in ops {
        let ok = match op.as_str() {
            "$eq" => equals_or_contains(value, operand),
            "$regex" => {
                let pattern = operand
                    .as_str()
                    .ok_or_else(|| StoreError::UnsupportedFilter("$regex expects a string".into()))?;
                let options = ops.get_str("$options").unwrap_or_default();
                let regex = compile(pattern, options)?;
                value.is_some_and(|v| regex_matches(&regex, v))
            }
            "$options" => true,
            other => return Err(StoreError::UnsupportedFilter(other.to_string())),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn compile(pattern: &str, options: &str) -> StoreResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'))
        .build()
        .map_err(|e| StoreError::UnsupportedFilter(format!("bad pattern: {e}")))
}

fn regex_matches(regex: &Regex, value: &Bson) -> bool {
    match value {
        Bson::String(s) => regex.is_match(s),
        Bson::Array(items) => items.iter().any(|item| regex_matches(regex, item)),
        _ => false,
    }
}

/// Equality the way the store applies it: a missing field equals null, and an
/// array field matches if any element does.
fn equals_or_contains(value: Option<&Bson>, expected: &Bson) -> bool {
    match value {
        None => matches!(expected, Bson::Null),
        Some(actual) => {
            values_equal(actual, expected)
                || matches!(actual, Bson::Array(items) if items.iter().any(|i| values_equal(i, expected)))
        }
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// Cross-type ordering for sorting: null < numbers < strings < documents <
/// arrays < ObjectIds < booleans < dates. A missing field sorts as null.
pub(crate) fn compare(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let a = a.unwrap_or(&Bson::Null);
    let b = b.unwrap_or(&Bson::Null);
    match rank(a).cmp(&rank(b)) {
        Ordering::Equal => {}
        other => return other,
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

fn rank(value: &Bson) -> u8 {
    match value {
        Bson::Null | Bson::Undefined => 0,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 1,
        Bson::String(_) | Bson::Symbol(_) => 2,
        Bson::Document(_) => 3,
        Bson::Array(_) => 4,
        Bson::ObjectId(_) => 5,
        Bson::Boolean(_) => 6,
        Bson::DateTime(_) | Bson::Timestamp(_) => 7,
        _ => 8,
    }
}

pub(crate) fn project(doc: Document, projection: &Projection) -> Document {
    match projection {
        Projection::Include(names) => doc
            .into_iter()
            .filter(|(k, _)| k == carhub_core::fields::ID || names.iter().any(|n| *n == k.as_str()))
            .collect(),
        Projection::Exclude(names) => doc
            .into_iter()
            .filter(|(k, _)| !names.iter().any(|n| *n == k.as_str()))
            .collect(),
    }
}

/// Fields an upsert copies from its filter into the new document: top-level
/// plain equality clauses.
pub(crate) fn equality_fields(filter: &Document) -> Document {
    filter
        .iter()
        .filter(|(k, _)| !k.starts_with('$') && !k.contains('.'))
        .filter(|(_, v)| match v {
            Bson::Document(d) => !d.keys().any(|k| k.starts_with('$')),
            Bson::RegularExpression(_) => false,
            _ => true,
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use bson::{doc, oid::ObjectId, Regex as BsonRegex};

    use super::*;

    fn car() -> Document {
        doc! {
            "_id": ObjectId::new(),
            "name": "Toyota Corolla",
            "category": "Sedan",
            "rentalPrice": 45_i64,
            "availability": true,
            "provider": { "email": "p@x.com" },
            "tags": ["family", "eco"],
        }
    }

    #[test]
    fn case_insensitive_regex_on_either_field() {
        let filter = doc! { "$or": [
            { "name": { "$regex": "SEDAN", "$options": "i" } },
            { "category": { "$regex": "SEDAN", "$options": "i" } },
        ]};
        assert!(matches(&car(), &filter).unwrap());

        let case_sensitive = doc! { "category": { "$regex": "SEDAN" } };
        assert!(!matches(&car(), &case_sensitive).unwrap());
    }

    #[test]
    fn bson_regex_values_are_honoured() {
        let filter = doc! { "name": BsonRegex { pattern: "^toyota".into(), options: "i".into() } };
        assert!(matches(&car(), &filter).unwrap());
    }

    #[test]
    fn equality_is_numeric_across_widths_and_reaches_into_arrays() {
        assert!(matches(&car(), &doc! { "rentalPrice": 45 }).unwrap());
        assert!(matches(&car(), &doc! { "rentalPrice": 45.0 }).unwrap());
        assert!(matches(&car(), &doc! { "tags": "eco" }).unwrap());
        assert!(matches(&car(), &doc! { "provider.email": "p@x.com" }).unwrap());
        assert!(!matches(&car(), &doc! { "availability": false }).unwrap());
    }

    #[test]
    fn missing_field_equals_null() {
        assert!(matches(&car(), &doc! { "deletedAt": Bson::Null }).unwrap());
        assert!(!matches(&car(), &doc! { "deletedAt": "x" }).unwrap());
    }

    #[test]
    fn unknown_operators_are_errors() {
        let err = matches(&car(), &doc! { "rentalPrice": { "$gt": 10 } }).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedFilter(op) if op == "$gt"));
        assert!(matches(&car(), &doc! { "$where": "1" }).is_err());
    }

    #[test]
    fn projection_keeps_id_on_include() {
        let projected = project(car(), &Projection::Include(&["name"]));
        let keys: Vec<_> = projected.keys().cloned().collect();
        assert_eq!(keys, vec!["_id", "name"]);

        let excluded = project(car(), &Projection::Exclude(&["tags", "provider"]));
        assert!(excluded.contains_key("_id"));
        assert!(!excluded.contains_key("tags"));
    }

    #[test]
    fn ordering_follows_type_classes() {
        let one = Bson::Int32(1);
        let two = Bson::Double(2.5);
        let s = Bson::String("a".into());
        assert_eq!(compare(Some(&one), Some(&two)), Ordering::Less);
        assert_eq!(compare(Some(&s), Some(&two)), Ordering::Greater);
        assert_eq!(compare(None, Some(&one)), Ordering::Less);
    }

    #[test]
    fn upsert_seed_skips_operator_clauses() {
        let filter = doc! {
            "email": "a@x.com",
            "name": { "$regex": "a" },
            "$or": [ { "x": 1 } ],
        };
        assert_eq!(equality_fields(&filter), doc! { "email": "a@x.com" });
    }
}
