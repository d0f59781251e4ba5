//! Document field names.
//!
//! Documents are stored as sent by clients, so these names are the contract
//! between the frontend and the query builders. The store enforces none of
//! them.

/// Primary key of every document.
pub const ID: &str = "_id";

pub mod car {
    pub const NAME: &str = "name";
    pub const CATEGORY: &str = "category";
    pub const RENTAL_PRICE: &str = "rentalPrice";
    pub const IMAGE: &str = "image";
    pub const DESCRIPTION: &str = "description";
    pub const RATING: &str = "rating";
    pub const AVAILABILITY: &str = "availability";
    pub const PROVIDER_EMAIL: &str = "providerEmail";
    pub const CREATED_AT: &str = "createdAt";
    pub const LOCATION: &str = "location";

    /// Text fields matched by free-text search.
    pub const SEARCHABLE: [&str; 2] = [NAME, CATEGORY];

    /// Query-string value that selects available cars only.
    pub const AVAILABLE_SENTINEL: &str = "available";
}

pub mod booking {
    pub const USER_EMAIL: &str = "userEmail";
}

pub mod user {
    pub const EMAIL: &str = "email";
}
