//! Query results and the document marker trait.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Anything that can be returned from a query and stored in the cache.
///
/// Implemented for every type that round-trips through serde and can cross
/// task boundaries, so domain structs only need the usual derives.
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Document for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// The shape a query produced.
///
/// Serializes without an envelope: `Empty` as `null`, `One` as the document
/// itself, `Many` as a JSON array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResult<T> {
    /// The query matched nothing (single-document lookup with no match).
    Empty,
    /// A single document.
    One(T),
    /// An ordered sequence of documents.
    Many(Vec<T>),
}

impl<T> QueryResult<T> {
    /// Number of documents carried.
    pub fn len(&self) -> usize {
        match self {
            QueryResult::Empty => 0,
            QueryResult::One(_) => 1,
            QueryResult::Many(docs) => docs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_many(&self) -> bool {
        matches!(self, QueryResult::Many(_))
    }

    /// Flatten into a vector, preserving order.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            QueryResult::Empty => Vec::new(),
            QueryResult::One(doc) => vec![doc],
            QueryResult::Many(docs) => docs,
        }
    }

    /// Take the single document, if this is a `One`.
    pub fn into_one(self) -> Option<T> {
        match self {
            QueryResult::One(doc) => Some(doc),
            _ => None,
        }
    }

    /// Borrow the first document, whatever the shape.
    pub fn first(&self) -> Option<&T> {
        match self {
            QueryResult::Empty => None,
            QueryResult::One(doc) => Some(doc),
            QueryResult::Many(docs) => docs.first(),
        }
    }
}

impl<T> From<Vec<T>> for QueryResult<T> {
    fn from(docs: Vec<T>) -> Self {
        QueryResult::Many(docs)
    }
}

impl<T> From<Option<T>> for QueryResult<T> {
    fn from(doc: Option<T>) -> Self {
        match doc {
            Some(doc) => QueryResult::One(doc),
            None => QueryResult::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Blog {
        title: String,
    }

    fn blog(title: &str) -> Blog {
        Blog {
            title: title.to_string(),
        }
    }

    #[test]
    fn test_serializes_without_envelope() {
        let empty: QueryResult<Blog> = QueryResult::Empty;
        assert_eq!(serde_json::to_value(&empty).unwrap(), json!(null));

        let one = QueryResult::One(blog("Hi"));
        assert_eq!(serde_json::to_value(&one).unwrap(), json!({"title": "Hi"}));

        let many = QueryResult::Many(vec![blog("a"), blog("b")]);
        assert_eq!(
            serde_json::to_value(&many).unwrap(),
            json!([{"title": "a"}, {"title": "b"}])
        );
    }

    #[test]
    fn test_len_and_into_vec() {
        assert_eq!(QueryResult::<Blog>::Empty.len(), 0);
        assert!(QueryResult::<Blog>::Empty.is_empty());
        assert_eq!(QueryResult::One(blog("x")).len(), 1);

        let many = QueryResult::from(vec![blog("a"), blog("b"), blog("c")]);
        assert!(many.is_many());
        assert_eq!(many.first(), Some(&blog("a")));
        let titles: Vec<String> = many.into_vec().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(QueryResult::from(Some(blog("x"))).into_one(), Some(blog("x")));
        assert_eq!(QueryResult::<Blog>::from(None), QueryResult::Empty);
    }

    #[test]
    fn test_empty_many_is_not_empty_variant() {
        let many: QueryResult<Blog> = QueryResult::Many(Vec::new());
        assert!(many.is_empty());
        assert!(many.is_many());
        assert_eq!(serde_json::to_value(&many).unwrap(), json!([]));
    }
}
