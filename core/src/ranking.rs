// jokko/src/ranking.rs

//! Orders a listing page by network recommendations.

use std::cmp::Ordering;

/// Network-recommended (count > 0) before the rest; two recommended entries
/// by descending count. Any other pair compares equal, so a stable sort keeps
/// their baseline order.
pub fn network_order(a: u32, b: u32) -> Ordering {
  match (a > 0, b > 0) {
    (true, false) => Ordering::Less,
    (false, true) => Ordering::Greater,
    (true, true) => b.cmp(&a),
    (false, false) => Ordering::Equal,
  }
}

/// Stable in-place sort of `items` by [`network_order`] on `count`.
pub fn rank_by_network<T>(items: &mut [T], count: impl Fn(&T) -> u32) {
  items.sort_by(|a, b| network_order(count(a), count(b)));
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_counts_keep_baseline_order() {
    let mut items = vec![("a", 0), ("b", 2), ("c", 0), ("d", 5), ("e", 2), ("f", 0)];
    rank_by_network(&mut items, |(_, c)| *c);
    let names: Vec<&str> = items.iter().map(|(n, _)| *n).collect();
    assert_eq!(names, vec!["d", "b", "e", "a", "c", "f"]);
  }

  #[test]
  fn comparator_cases() {
    assert_eq!(network_order(1, 0), Ordering::Less);
    assert_eq!(network_order(0, 3), Ordering::Greater);
    assert_eq!(network_order(2, 3), Ordering::Greater);
    assert_eq!(network_order(3, 3), Ordering::Equal);
    assert_eq!(network_order(0, 0), Ordering::Equal);
  }
}
