use serde::Deserialize;

/// List endpoints answer either with a bare array or with a page object
/// wrapping the rows in `items`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    List(Vec<T>),
    Paged { items: Vec<T> },
}

impl<T> Listing<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Listing::List(items) | Listing::Paged { items } => items,
        }
    }
}
