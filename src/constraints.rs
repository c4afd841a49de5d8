use crate::size_limit::SizeLimit;

/// Represents some rules to be applied on the stream and field's content size to prevent DoS attacks.
///
/// It's recommended to add some rules on field (specially text field) size to avoid potential DoS attacks from attackers running the server out of memory.
/// This type provides some API to apply constraints on basis of field name and the whole stream.
///
/// # Examples
///
/// ```
/// use parted::{Constraints, Multipart, SizeLimit};
///
/// let constraints = Constraints::new()
///     .allowed_fields(vec!["my_text_field", "my_file_field"])
///     .size_limit(
///         SizeLimit::new()
///             // Set 15mb as size limit for the whole stream body.
///             .whole_stream(15 * 1024 * 1024)
///             // Set 10mb as size limit for all fields.
///             .per_field(10 * 1024 * 1024)
///             // Set 30kb as size limit for our text field only.
///             .for_field("my_text_field", 30 * 1024),
///     );
///
/// let multipart = Multipart::with_constraints("X-BOUNDARY", constraints).unwrap();
/// # drop(multipart);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    pub(crate) size_limit: SizeLimit,
    pub(crate) allowed_fields: Option<Vec<String>>,
}

impl Constraints {
    /// Creates a set of rules with default behaviour.
    pub fn new() -> Constraints {
        Constraints::default()
    }

    /// Applies rules on field's content length.
    pub fn size_limit(self, size_limit: SizeLimit) -> Constraints {
        Constraints {
            size_limit,
            allowed_fields: self.allowed_fields,
        }
    }

    /// Specify which fields should be allowed, for any unknown field, the parser fails with
    /// [`Error::UnknownField`](crate::Error::UnknownField).
    pub fn allowed_fields<N: Into<String>>(self, allowed_fields: Vec<N>) -> Constraints {
        let allowed_fields = allowed_fields.into_iter().map(|item| item.into()).collect();

        Constraints {
            size_limit: self.size_limit,
            allowed_fields: Some(allowed_fields),
        }
    }

    pub(crate) fn is_it_allowed(&self, field: &str) -> bool {
        match self.allowed_fields {
            Some(ref allowed_fields) => allowed_fields.iter().any(|item| item == field),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_it_allowed() {
        let constraints = Constraints::new();
        assert!(constraints.is_it_allowed("anything"));

        let constraints = Constraints::new().allowed_fields(vec!["a", "b"]);
        assert!(constraints.is_it_allowed("a"));
        assert!(!constraints.is_it_allowed("c"));
        assert!(!constraints.is_it_allowed(""));
    }
}
