//! Property-based tests for path scoping, pointer parsing and the
//! correlation table.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::collections::HashSet;

use proptest::prelude::*;

use monosplit::core::correlation::{CorrelationError, CorrelationTable};
use monosplit::core::lfs::{object_path, LfsPointer};
use monosplit::core::types::{is_under, join_path, Oid, ScopePath};
use monosplit::engine::tree_merge::PathFilter;

/// Strategy for one path component.
fn component() -> impl Strategy<Value = String> {
    // A leading '.' could produce a relative component.
    "[A-Za-z0-9_][A-Za-z0-9_.-]{0,8}"
}

/// Strategy for normalized slash paths of 1-4 components.
fn scope_path() -> impl Strategy<Value = String> {
    prop::collection::vec(component(), 1..5).prop_map(|parts| parts.join("/"))
}

fn oid() -> impl Strategy<Value = Oid> {
    "[0-9a-f]{40}".prop_map(|s| Oid::new(s).unwrap())
}

proptest! {
    #[test]
    fn normalized_paths_are_accepted(path in scope_path()) {
        let scope = ScopePath::new(path.clone()).unwrap();
        prop_assert_eq!(scope.as_str(), path.as_str());
    }

    #[test]
    fn paths_with_empty_components_are_rejected(a in component(), b in component()) {
        let leading_slash = format!("/{}", a);
        let trailing_slash = format!("{}/", a);
        let double_slash = format!("{}//{}", a, b);
        let dot_dot = format!("{}/../{}", a, b);
        prop_assert!(ScopePath::new(leading_slash).is_err());
        prop_assert!(ScopePath::new(trailing_slash).is_err());
        prop_assert!(ScopePath::new(double_slash).is_err());
        prop_assert!(ScopePath::new(dot_dot).is_err());
    }

    #[test]
    fn joined_paths_are_under_their_prefix(dir in scope_path(), rest in scope_path()) {
        let joined = join_path(&dir, &rest);
        let scope = ScopePath::new(joined.clone()).unwrap();
        prop_assert!(is_under(&joined, &dir));
        prop_assert_eq!(scope.relative_to(&dir), Some(rest.as_str()));
        prop_assert!(ScopePath::new(dir.clone()).unwrap().contains(&joined));
    }

    #[test]
    fn sibling_with_shared_prefix_is_not_under(dir in scope_path(), suffix in "[a-z]{1,4}") {
        let sibling = format!("{dir}{suffix}/file");
        prop_assert!(!is_under(&sibling, &dir));
        prop_assert!(!ScopePath::new(dir.clone()).unwrap().contains(&sibling));
    }

    #[test]
    fn filter_excludes_exactly_the_mounted_subtrees(mount in scope_path(), rest in scope_path(), other in scope_path()) {
        let scope = ScopePath::new(mount.clone()).unwrap();
        let filter = PathFilter::new([&scope]);
        prop_assert!(filter.excludes(&mount));
        prop_assert!(filter.excludes(&join_path(&mount, &rest)));
        prop_assert_eq!(filter.excludes(&other), other == mount || is_under(&other, &mount));
    }

    #[test]
    fn pointer_round_trips_digest_and_size(digest in "[0-9a-f]{64}", size in 0u64..1_000_000_000) {
        let text = format!(
            "version https://git-lfs.github.com/spec/v1\noid sha256:{digest}\nsize {size}\n"
        );
        let pointer = LfsPointer::parse(text.as_bytes()).unwrap().unwrap();
        prop_assert_eq!(pointer.digest(), digest.as_str());
        prop_assert_eq!(pointer.size(), Some(size));
    }

    #[test]
    fn object_paths_are_sharded(digest in "[0-9a-f]{64}") {
        let path = object_path(std::path::Path::new("cache"), &digest);
        let expected = std::path::Path::new("cache")
            .join(&digest[0..2])
            .join(&digest[2..4])
            .join(&digest);
        prop_assert_eq!(path, expected);
    }

    #[test]
    fn arbitrary_bytes_never_panic_the_parser(content in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = LfsPointer::parse(&content);
    }

    #[test]
    fn table_maps_each_source_once(pairs in prop::collection::vec((oid(), oid()), 0..40)) {
        let mut table = CorrelationTable::new();
        let mut seen = HashSet::new();
        for (source, derived) in &pairs {
            let result = table.record(source.clone(), derived.clone());
            if seen.insert(source.clone()) {
                prop_assert!(result.is_ok());
            } else {
                let is_already_mapped = matches!(result, Err(CorrelationError::AlreadyMapped { .. }));
                prop_assert!(is_already_mapped);
            }
        }
        prop_assert_eq!(table.len(), seen.len());

        // The first record for each source wins.
        for (source, _) in &pairs {
            let first = pairs.iter().find(|(s, _)| s == source).map(|(_, d)| d);
            prop_assert_eq!(table.get(source), first);
        }
    }
}
