//! Weighted random selection over a pool with repeated entries.

use rand::seq::SliceRandom;

use crate::load_balancer::LoadBalancer;

/// Uniform pick over the configured list; duplicates raise a URL's share.
#[derive(Debug, Default, Clone, Copy)]
pub struct WeightedRandom;

impl WeightedRandom {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for WeightedRandom {
    fn next_target<'a>(&self, targets: &'a [String]) -> Option<&'a str> {
        targets.choose(&mut rand::thread_rng()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Target;
    use crate::load_balancer::EmptyTargets;
    use std::collections::HashMap;

    #[test]
    fn test_single_target_unchanged() {
        let lb = WeightedRandom::new();
        let target = Target::from("http://backend/{id}");
        assert_eq!(lb.select(&target), Ok("http://backend/{id}"));
    }

    #[test]
    fn test_empty_pool_is_error() {
        let lb = WeightedRandom::new();
        assert_eq!(lb.select(&Target::Pool(vec![])), Err(EmptyTargets));
    }

    #[test]
    fn test_only_configured_targets_are_chosen() {
        let lb = WeightedRandom::new();
        let target = Target::Pool(vec!["http://a".into(), "http://b".into()]);
        for _ in 0..100 {
            let chosen = lb.select(&target).unwrap();
            assert!(chosen == "http://a" || chosen == "http://b");
        }
    }

    #[test]
    fn test_duplicates_weight_selection() {
        let lb = WeightedRandom::new();
        let target = Target::Pool(vec![
            "http://a".into(),
            "http://a".into(),
            "http://a".into(),
            "http://b".into(),
        ]);

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for _ in 0..4000 {
            *counts.entry(lb.select(&target).unwrap()).or_default() += 1;
        }

        // Expect roughly 3000 / 1000; the bounds are loose to keep this stable.
        let a = counts.get("http://a").copied().unwrap_or(0);
        let b = counts.get("http://b").copied().unwrap_or(0);
        assert!(a > 2500 && a < 3500, "a = {a}");
        assert!(b > 500 && b < 1500, "b = {b}");
    }

    #[test]
    fn test_listed_twice_is_picked_twice_as_often() {
        let lb = WeightedRandom::new();
        let target = Target::Pool(vec!["a".into(), "a".into(), "b".into()]);

        let mut a = 0usize;
        let mut b = 0usize;
        for _ in 0..30_000 {
            match lb.select(&target).unwrap() {
                "a" => a += 1,
                "b" => b += 1,
                other => panic!("unexpected target {other}"),
            }
        }

        let ratio = a as f64 / b as f64;
        assert!((1.8..=2.2).contains(&ratio), "a:b = {ratio}");
    }
}
