//! engine::tags
//!
//! TagPropagator: carry source tags over to a derived repository.
//!
//! A tag whose target commit has a correlation entry is created at the
//! mapped commit. Otherwise the first-parent chain is walked until a
//! mapped ancestor turns up (the number of steps is reported), or the chain
//! ends and the tag is dropped. Annotated tags stay annotated.

use crate::core::correlation::CorrelationTable;
use crate::core::types::Oid;
use crate::engine::report::TagSummary;
use crate::git::{Git, GitError, TagInfo};

/// How one tag was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOutcome {
    /// The tagged commit itself was mapped.
    Direct { target: Oid },
    /// A first-parent ancestor `hops` commits back was mapped.
    Ancestor { target: Oid, hops: usize },
    /// Nothing in the chain was mapped, or the tag does not point at a commit.
    Dropped,
    /// A tag with this name already exists in the derived repository.
    Conflict,
}

/// A resolved tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagResult {
    pub name: String,
    pub outcome: TagOutcome,
}

/// Creates tags in one derived repository.
#[derive(Debug)]
pub struct TagPropagator<'a> {
    target: &'a Git,
    correlation: &'a CorrelationTable,
}

impl<'a> TagPropagator<'a> {
    /// Propagate into `target` through `correlation`.
    pub fn new(target: &'a Git, correlation: &'a CorrelationTable) -> Self {
        Self {
            target,
            correlation,
        }
    }

    /// Find the nearest mapped commit on the first-parent chain starting at
    /// `commit` (inclusive), with the number of steps taken.
    pub fn resolve(&self, source: &Git, commit: &Oid) -> Result<Option<(Oid, usize)>, GitError> {
        let mut current = Some(commit.clone());
        let mut hops = 0;
        while let Some(oid) = current {
            if let Some(derived) = self.correlation.get(&oid) {
                return Ok(Some((derived.clone(), hops)));
            }
            hops += 1;
            current = source.first_parent(&oid)?;
        }
        Ok(None)
    }

    /// Propagate every tag of `source` whose name starts with `prefix`, in
    /// name order.
    pub fn propagate(&self, source: &Git, prefix: &str) -> Result<Vec<TagResult>, GitError> {
        let mut tags: Vec<TagInfo> = source
            .tags()?
            .into_iter()
            .filter(|t| t.name.starts_with(prefix))
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        let mut results = Vec::with_capacity(tags.len());
        for tag in tags {
            let outcome = self.propagate_one(source, &tag)?;
            results.push(TagResult {
                name: tag.name,
                outcome,
            });
        }
        Ok(results)
    }

    fn propagate_one(&self, source: &Git, tag: &TagInfo) -> Result<TagOutcome, GitError> {
        let Some(commit) = &tag.target else {
            return Ok(TagOutcome::Dropped);
        };
        let Some((target, hops)) = self.resolve(source, commit)? else {
            return Ok(TagOutcome::Dropped);
        };
        if !self
            .target
            .create_tag(&tag.name, &target, tag.annotation.as_ref())?
        {
            return Ok(TagOutcome::Conflict);
        }
        Ok(match hops {
            0 => TagOutcome::Direct { target },
            hops => TagOutcome::Ancestor { target, hops },
        })
    }
}

/// Count outcomes.
pub fn summarize(results: &[TagResult]) -> TagSummary {
    let mut summary = TagSummary::default();
    for result in results {
        match result.outcome {
            TagOutcome::Direct { .. } => summary.converted += 1,
            TagOutcome::Ancestor { .. } => summary.via_ancestor += 1,
            TagOutcome::Dropped => summary.dropped += 1,
            TagOutcome::Conflict => summary.conflicts += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Timestamp;
    use crate::git::{Identity, TagAnnotation};
    use tempfile::TempDir;

    fn ident() -> Identity {
        Identity {
            name: "T".into(),
            email: "t@example.com".into(),
            when: Timestamp {
                seconds: 1_500_000_000,
                offset_minutes: 0,
            },
        }
    }

    struct Fixture {
        _dirs: (TempDir, TempDir),
        source: Git,
        target: Git,
        chain: Vec<Oid>,
        derived: Vec<Oid>,
    }

    /// A four-commit source chain; only the first and third are mapped.
    fn fixture() -> Fixture {
        let s = TempDir::new().unwrap();
        let t = TempDir::new().unwrap();
        let source = Git::init(s.path(), "master").unwrap();
        let target = Git::init(t.path(), "master").unwrap();

        let chain: Vec<Oid> = (0..4)
            .map(|n| source.commit_index(&format!("c{n}"), &ident(), &ident()).unwrap())
            .collect();
        let derived: Vec<Oid> = (0..2)
            .map(|n| target.commit_index(&format!("d{n}"), &ident(), &ident()).unwrap())
            .collect();

        Fixture {
            _dirs: (s, t),
            source,
            target,
            chain,
            derived,
        }
    }

    fn table(fx: &Fixture) -> CorrelationTable {
        let mut table = CorrelationTable::new();
        table.record(fx.chain[0].clone(), fx.derived[0].clone()).unwrap();
        table.record(fx.chain[2].clone(), fx.derived[1].clone()).unwrap();
        table
    }

    #[test]
    fn direct_ancestor_and_conflict() {
        let fx = fixture();
        let table = table(&fx);
        fx.source.create_tag("A-direct", &fx.chain[2], None).unwrap();
        fx.source.create_tag("A-back", &fx.chain[3], None).unwrap();
        fx.source.create_tag("B-other", &fx.chain[3], None).unwrap();
        fx.target.create_tag("A-taken", &fx.derived[0], None).unwrap();
        fx.source.create_tag("A-taken", &fx.chain[0], None).unwrap();

        let results = TagPropagator::new(&fx.target, &table)
            .propagate(&fx.source, "A-")
            .unwrap();

        assert_eq!(
            results,
            vec![
                TagResult {
                    name: "A-back".into(),
                    outcome: TagOutcome::Ancestor {
                        target: fx.derived[1].clone(),
                        hops: 1
                    },
                },
                TagResult {
                    name: "A-direct".into(),
                    outcome: TagOutcome::Direct {
                        target: fx.derived[1].clone()
                    },
                },
                TagResult {
                    name: "A-taken".into(),
                    outcome: TagOutcome::Conflict,
                },
            ]
        );
        assert_eq!(fx.target.tag_target("A-back").unwrap(), Some(fx.derived[1].clone()));
        assert_eq!(fx.target.tag_target("B-other").unwrap(), None);

        let summary = summarize(&results);
        assert_eq!((summary.converted, summary.via_ancestor, summary.conflicts), (1, 1, 1));
    }

    #[test]
    fn unmapped_chain_is_dropped() {
        let fx = fixture();
        let empty = CorrelationTable::new();
        fx.source.create_tag("A-1.0", &fx.chain[3], None).unwrap();

        let results = TagPropagator::new(&fx.target, &empty)
            .propagate(&fx.source, "A-")
            .unwrap();
        assert_eq!(results[0].outcome, TagOutcome::Dropped);
        assert_eq!(fx.target.tag_target("A-1.0").unwrap(), None);
        assert_eq!(summarize(&results).dropped, 1);
    }

    #[test]
    fn hop_count_is_distance_to_mapped_ancestor() {
        let fx = fixture();
        let mut table = CorrelationTable::new();
        table.record(fx.chain[0].clone(), fx.derived[0].clone()).unwrap();

        let propagator = TagPropagator::new(&fx.target, &table);
        assert_eq!(
            propagator.resolve(&fx.source, &fx.chain[3]).unwrap(),
            Some((fx.derived[0].clone(), 3))
        );
        assert_eq!(
            propagator.resolve(&fx.source, &fx.chain[0]).unwrap(),
            Some((fx.derived[0].clone(), 0))
        );
    }

    #[test]
    fn annotation_is_preserved() {
        let fx = fixture();
        let table = table(&fx);
        let annotation = TagAnnotation {
            tagger: ident(),
            message: "Release 1.0\n".into(),
        };
        fx.source
            .create_tag("A-1.0", &fx.chain[2], Some(&annotation))
            .unwrap();

        TagPropagator::new(&fx.target, &table)
            .propagate(&fx.source, "A-")
            .unwrap();

        let tags = fx.target.tags().unwrap();
        let tag = tags.iter().find(|t| t.name == "A-1.0").unwrap();
        assert_eq!(tag.annotation.as_ref(), Some(&annotation));
        assert_eq!(tag.target.as_ref(), Some(&fx.derived[1]));
    }
}
