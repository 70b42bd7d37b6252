//! Combinators over collections of results.
//!
//! The `combine!` and `first_ok!` macros accept results as separate arguments; the
//! functions take any iterator. Arguments are already evaluated by the time either runs,
//! so "short-circuit" means the first `Err` (or `Ok`) in argument order decides.

/// Collect every success value, or return the first error in argument order.
pub fn combine<T, E, I>(results: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = Result<T, E>>,
{
    results.into_iter().collect()
}

/// List variant of [`combine`].
pub fn collect<T, E>(results: Vec<Result<T, E>>) -> Result<Vec<T>, E> {
    combine(results)
}

/// Return the first success, or every error in order when none succeeded.
pub fn first_ok<T, E, I>(results: I) -> Result<T, Vec<E>>
where
    I: IntoIterator<Item = Result<T, E>>,
{
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(value) => return Ok(value),
            Err(e) => errors.push(e),
        }
    }
    Err(errors)
}

/// Partition all values and all errors, each in input order.
pub fn collect_all<T, E, I>(results: I) -> (Vec<T>, Vec<E>)
where
    I: IntoIterator<Item = Result<T, E>>,
{
    let mut values = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(v) => values.push(v),
            Err(e) => errors.push(e),
        }
    }
    (values, errors)
}

/// Variadic form of [`combine`](crate::result::combine).
///
/// ```
/// use kitchen_resilience::combine;
///
/// let all: Result<Vec<i32>, &str> = combine!(Ok(1), Ok(2), Ok(3));
/// assert_eq!(all, Ok(vec![1, 2, 3]));
/// ```
#[macro_export]
macro_rules! combine {
    ($($result:expr),* $(,)?) => {
        $crate::result::combine([$($result),*])
    };
}

/// Variadic form of [`first_ok`](crate::result::first_ok).
#[macro_export]
macro_rules! first_ok {
    ($($result:expr),* $(,)?) => {
        $crate::result::first_ok([$($result),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_returns_all_values() {
        let r: Result<Vec<i32>, &str> = crate::combine!(Ok(1), Ok(2), Ok(3));
        assert_eq!(r, Ok(vec![1, 2, 3]));
    }

    #[test]
    fn combine_returns_first_error() {
        let r: Result<Vec<i32>, &str> = crate::combine!(Ok(1), Err("x"), Ok(3), Err("y"));
        assert_eq!(r, Err("x"));
    }

    #[test]
    fn combine_of_nothing_is_empty_ok() {
        let r: Result<Vec<i32>, &str> = combine(Vec::new());
        assert_eq!(r, Ok(vec![]));
    }

    #[test]
    fn collect_is_the_list_variant() {
        assert_eq!(collect::<i32, &str>(vec![Ok(1), Ok(2)]), Ok(vec![1, 2]));
        assert_eq!(collect(vec![Ok(1), Err("bad"), Err("worse")]), Err("bad"));
    }

    #[test]
    fn first_ok_prefers_earliest_success() {
        let r: Result<i32, Vec<&str>> = crate::first_ok!(Err("a"), Ok(2), Ok(3));
        assert_eq!(r, Ok(2));
    }

    #[test]
    fn first_ok_collects_errors_in_order() {
        let r: Result<i32, Vec<&str>> = crate::first_ok!(Err("a"), Err("b"), Err("c"));
        assert_eq!(r, Err(vec!["a", "b", "c"]));
    }

    #[test]
    fn collect_all_partitions_without_short_circuit() {
        let (values, errors) = collect_all(vec![Ok(1), Err("a"), Ok(3), Err("b")]);
        assert_eq!(values, vec![1, 3]);
        assert_eq!(errors, vec!["a", "b"]);
    }
}
