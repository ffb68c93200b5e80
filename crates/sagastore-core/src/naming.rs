//! Partition name sanitizing
//!
//! Saga type names and topic names are free-form; partitions need an
//! identifier drawn from `[A-Za-z0-9_]` that does not start with `_`.

/// Map an arbitrary string to a partition identifier.
///
/// Every character outside `[A-Za-z0-9_]` is removed, then all leading
/// underscores. The mapping is idempotent but not injective: `"a.b"` and
/// `"ab"` land in the same partition.
pub fn correct_name(input: &str) -> String {
    let kept: String = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    kept.trim_start_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_punctuation_and_generics() {
        assert_eq!(correct_name("orders.placed"), "ordersplaced");
        assert_eq!(
            correct_name("app::sagas::OrderSaga<u64>"),
            "appsagasOrderSagau64"
        );
        assert_eq!(correct_name("rebus-topic:v2"), "rebustopicv2");
    }

    #[test]
    fn test_strips_every_leading_underscore() {
        assert_eq!(correct_name("_private"), "private");
        assert_eq!(correct_name("__a"), "a");
        assert_eq!(correct_name("!_a"), "a");
        assert_eq!(correct_name("a_b_"), "a_b_");
    }

    #[test]
    fn test_non_ascii_is_removed() {
        assert_eq!(correct_name("Zählung"), "Zhlung");
        assert_eq!(correct_name("___"), "");
        assert_eq!(correct_name(""), "");
    }
}
