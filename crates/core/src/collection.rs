//! The three independent collections of the marketplace.

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Cars,
    Bookings,
    Users,
}

impl Collection {
    /// Name of the collection in the document store.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Cars => "cars",
            Collection::Bookings => "bookings",
            Collection::Users => "users",
        }
    }
}

impl core::fmt::Display for Collection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
