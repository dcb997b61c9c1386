use std::num::NonZeroUsize;

/// Splits `items` into at most `n` contiguous groups whose sizes differ by at
/// most one, the first `len % n` groups holding the extra item.
///
/// No empty group is returned, except for the single group of `n == 1`.
pub fn partition<T>(items: Vec<T>, n: NonZeroUsize) -> Vec<Vec<T>> {
    if n.get() == 1 {
        return vec![items];
    }

    let n = n.get().min(items.len());
    if n == 0 {
        return vec![];
    }

    let (length, remainder) = (items.len() / n, items.len() % n);
    let mut groups = Vec::with_capacity(n);
    let mut items = items.into_iter();
    for i in 0..n {
        let size = if i < remainder { length + 1 } else { length };
        groups.push(items.by_ref().take(size).collect());
    }

    groups
}
