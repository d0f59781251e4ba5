//! Query vocabulary: filters, projections, sorting and pagination.
//!
//! Handlers describe a query with these types; each backend turns them into
//! its own calls.

use bson::{doc, Bson, Document};
use carhub_core::{fields, DocumentId};

/// Builds a filter document from optional request inputs.
///
/// Every clause is conditional: empty inputs add nothing, so an untouched
/// builder matches all documents.
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    clauses: Document,
    any_of: Vec<Vec<Document>>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match the document with this identifier.
    pub fn id(self, id: DocumentId) -> Self {
        self.eq(fields::ID, Bson::ObjectId(*id.as_object_id()))
    }

    /// Exact match on a field.
    pub fn eq(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.clauses.insert(field, value.into());
        self
    }

    /// Case-insensitive substring match of `term` against any of `fields`.
    ///
    /// The term is matched literally (regex metacharacters are escaped). One
    /// field attaches the pattern directly; several fields are OR-ed.
    pub fn search(mut self, fields: &[&str], term: Option<&str>) -> Self {
        let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };
        let pattern = regex::escape(term);
        let condition = || doc! { "$regex": pattern.as_str(), "$options": "i" };

        match fields {
            [] => {}
            [field] => {
                self.clauses.insert(*field, condition());
            }
            many => {
                let branches = many
                    .iter()
                    .map(|field| {
                        let mut branch = Document::new();
                        branch.insert(*field, condition());
                        branch
                    })
                    .collect();
                self.any_of.push(branches);
            }
        }
        self
    }

    /// Require `field: true` when the raw query value equals `sentinel`.
    pub fn flag(self, field: &str, raw: Option<&str>, sentinel: &str) -> Self {
        if raw == Some(sentinel) {
            self.eq(field, true)
        } else {
            self
        }
    }

    pub fn build(self) -> Document {
        let Self {
            mut clauses,
            mut any_of,
        } = self;

        match any_of.len() {
            0 => {}
            1 => {
                let branches = any_of.remove(0);
                clauses.insert("$or", branches);
            }
            _ => {
                let groups: Vec<Document> = any_of
                    .into_iter()
                    .map(|branches| doc! { "$or": branches })
                    .collect();
                clauses.insert("$and", groups);
            }
        }
        clauses
    }
}

/// Field projection. Inclusion and exclusion are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Keep only these fields (plus `_id`).
    Include(&'static [&'static str]),
    /// Drop these fields.
    Exclude(&'static [&'static str]),
}

impl Projection {
    pub fn to_document(&self) -> Document {
        let (names, flag) = match self {
            Projection::Include(names) => (names, 1),
            Projection::Exclude(names) => (names, 0),
        };
        names.iter().map(|name| (name.to_string(), Bson::Int32(flag))).collect()
    }
}

/// Single-field descending sort.
///
/// No tie-break field is defined; the order of equal keys is whatever the
/// backend returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    field: &'static str,
}

impl Sort {
    pub fn descending(field: &'static str) -> Self {
        Self { field }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn to_document(&self) -> Document {
        let mut sort = Document::new();
        sort.insert(self.field, -1);
        sort
    }
}

/// Pagination request.
///
/// `limit == 0` means unlimited (and no skip). Pages are 1-based; page 0 is
/// read as page 1. Values are otherwise trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: u64,
    limit: u64,
}

impl Page {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(1, 0)
    }

    pub fn skip(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn limit(&self) -> Option<u64> {
        (self.limit > 0).then_some(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// Options for a many-document read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub projection: Option<Projection>,
    pub sort: Option<Sort>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.skip = page.skip();
        self.limit = page.limit();
        self
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn empty_builder_matches_everything() {
        let filter = FilterBuilder::new()
            .search(&["name", "category"], Some("   "))
            .search(&["name"], None)
            .flag("availability", Some("all"), "available")
            .build();
        assert!(filter.is_empty());
    }

    #[test]
    fn multi_field_search_is_an_or_of_escaped_patterns() {
        let filter = FilterBuilder::new()
            .eq("providerEmail", "p@x.com")
            .search(&["name", "category"], Some("a.b"))
            .build();

        assert_eq!(
            filter,
            doc! {
                "providerEmail": "p@x.com",
                "$or": [
                    { "name": { "$regex": "a\\.b", "$options": "i" } },
                    { "category": { "$regex": "a\\.b", "$options": "i" } },
                ],
            }
        );
    }

    #[test]
    fn single_field_search_attaches_directly() {
        let filter = FilterBuilder::new().search(&["name"], Some("civic")).build();
        assert_eq!(filter, doc! { "name": { "$regex": "civic", "$options": "i" } });
    }

    #[test]
    fn two_searches_are_and_ed() {
        let filter = FilterBuilder::new()
            .search(&["name", "category"], Some("a"))
            .search(&["location", "providerName"], Some("b"))
            .build();
        let groups = filter.get_array("$and").unwrap();
        assert_eq!(groups.len(), 2);
        assert!(!filter.contains_key("$or"));
    }

    #[test]
    fn availability_flag_requires_the_sentinel() {
        let on = FilterBuilder::new().flag("availability", Some("available"), "available").build();
        assert_eq!(on, doc! { "availability": true });
    }

    #[test]
    fn projections_render_flags() {
        assert_eq!(
            Projection::Include(&["name", "image"]).to_document(),
            doc! { "name": 1, "image": 1 }
        );
        assert_eq!(Projection::Exclude(&["description"]).to_document(), doc! { "description": 0 });
        assert_eq!(Sort::descending("rating").to_document(), doc! { "rating": -1 });
    }

    #[test]
    fn zero_limit_is_unlimited() {
        let page = Page::new(7, 0);
        assert_eq!(page.skip(), 0);
        assert_eq!(page.limit(), None);
    }

    proptest! {
        #[test]
        fn skip_is_previous_pages_times_limit(page in 0u64..10_000, limit in 1u64..10_000) {
            let p = Page::new(page, limit);
            prop_assert_eq!(p.skip(), (page.max(1) - 1) * limit);
            prop_assert_eq!(p.limit(), Some(limit));
        }

        #[test]
        fn huge_pages_saturate(page in (u64::MAX / 2 + 2)..u64::MAX, limit in 2u64..100) {
            prop_assert_eq!(Page::new(page, limit).skip(), u64::MAX);
        }
    }
}
