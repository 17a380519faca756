//! Overload disambiguation.
//!
//! A raw stack frame carries only (class, method name, line) — not enough
//! to tell two overloads of the same method apart. This module resolves a
//! frame to a stable [`MethodIdentity`] by consulting class metadata: when
//! the method name is unambiguous the identity carries no tag, when the
//! call site can be pinned to one overload it carries that overload's
//! descriptor, and when resolution fails it degrades to a line-qualified
//! tag — over-splitting rather than ever merging two different methods.
//!
//! Resolutions are cached per (class, method, line). The cache is
//! append-only for the session's lifetime and idempotent per key, so
//! concurrent readers during a live export are harmless.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::{Arc, RwLock};

use log::debug;

use crate::domain::{MethodIdentity, StackFrame};

/// One overload of a method, as described by class metadata.
#[derive(Debug, Clone)]
pub struct MethodDescription {
    /// Stable per-overload tag, e.g. a parameter descriptor like `(I)V`.
    pub descriptor: String,
    /// Source lines the overload's body spans, when known.
    pub lines: Option<RangeInclusive<u32>>,
}

/// Class metadata collaborator supplied by the host platform.
///
/// Lookups may be slow (they can hit class files or debug info); the
/// disambiguator calls them at most once per distinct (class, method, line).
pub trait ClassMetadata: Send + Sync {
    /// All overloads of `method_name` declared on `class_name`. An empty
    /// vec means the class or method is unknown.
    fn methods_named(
        &self,
        class_name: &str,
        method_name: &str,
    ) -> anyhow::Result<Vec<MethodDescription>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    class_name: String,
    method_name: String,
    line_number: Option<u32>,
}

/// Resolves frames to merge-stable method identities, caching results.
pub struct MethodDisambiguator {
    metadata: Option<Arc<dyn ClassMetadata>>,
    cache: RwLock<HashMap<CacheKey, MethodIdentity>>,
}

impl MethodDisambiguator {
    pub fn new(metadata: Option<Arc<dyn ClassMetadata>>) -> Self {
        Self {
            metadata,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn resolve(&self, frame: &StackFrame) -> MethodIdentity {
        let key = CacheKey {
            class_name: frame.class_name.clone(),
            method_name: frame.method_name.clone(),
            line_number: frame.line_number,
        };

        if let Ok(cache) = self.cache.read() {
            if let Some(hit) = cache.get(&key) {
                return hit.clone();
            }
        }

        let identity = self.resolve_uncached(frame);

        // Concurrent resolution of the same key computes the same value, so
        // last-write-wins is fine here.
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, identity.clone());
        }
        identity
    }

    fn resolve_uncached(&self, frame: &StackFrame) -> MethodIdentity {
        let Some(metadata) = &self.metadata else {
            return self.fallback(frame);
        };

        let overloads = match metadata.methods_named(&frame.class_name, &frame.method_name) {
            Ok(overloads) => overloads,
            Err(err) => {
                debug!(
                    "metadata lookup failed for {}.{}: {err}",
                    frame.class_name, frame.method_name
                );
                return self.fallback(frame);
            }
        };

        match overloads.as_slice() {
            [] => self.fallback(frame),
            [_single] => MethodIdentity::new(frame.class_name.clone(), frame.method_name.clone(), None),
            many => {
                if let Some(line) = frame.line_number {
                    if let Some(overload) = many
                        .iter()
                        .find(|m| m.lines.as_ref().is_some_and(|r| r.contains(&line)))
                    {
                        return MethodIdentity::new(
                            frame.class_name.clone(),
                            frame.method_name.clone(),
                            Some(overload.descriptor.clone()),
                        );
                    }
                }
                self.fallback(frame)
            }
        }
    }

    /// Line-qualified identity used when metadata can't settle the overload.
    /// Distinct call sites stay distinct; with no line either, there is
    /// nothing left to split on.
    fn fallback(&self, frame: &StackFrame) -> MethodIdentity {
        MethodIdentity::new(
            frame.class_name.clone(),
            frame.method_name.clone(),
            frame.line_number.map(|line| format!("line:{line}")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeMetadata {
        lookups: AtomicUsize,
        overloads: Vec<MethodDescription>,
        fail: bool,
    }

    impl FakeMetadata {
        fn with(overloads: Vec<MethodDescription>) -> Arc<Self> {
            Arc::new(Self {
                lookups: AtomicUsize::new(0),
                overloads,
                fail: false,
            })
        }
    }

    impl ClassMetadata for FakeMetadata {
        fn methods_named(
            &self,
            _class_name: &str,
            _method_name: &str,
        ) -> anyhow::Result<Vec<MethodDescription>> {
            self.lookups.fetch_add(1, Ordering::Relaxed);
            if self.fail {
                anyhow::bail!("class file unreadable");
            }
            Ok(self.overloads.clone())
        }
    }

    fn overload(descriptor: &str, lines: RangeInclusive<u32>) -> MethodDescription {
        MethodDescription {
            descriptor: descriptor.into(),
            lines: Some(lines),
        }
    }

    #[test]
    fn single_overload_gets_empty_disambiguator() {
        let metadata = FakeMetadata::with(vec![overload("(I)V", 1..=20)]);
        let disambiguator = MethodDisambiguator::new(Some(metadata));
        let id = disambiguator.resolve(&StackFrame::new("C", "run", Some(5)));
        assert_eq!(id.disambiguator, None);
    }

    #[test]
    fn overload_resolved_by_line_range() {
        let metadata = FakeMetadata::with(vec![
            overload("(I)V", 1..=20),
            overload("(J)V", 30..=50),
        ]);
        let disambiguator = MethodDisambiguator::new(Some(metadata));
        let a = disambiguator.resolve(&StackFrame::new("C", "run", Some(10)));
        let b = disambiguator.resolve(&StackFrame::new("C", "run", Some(40)));
        assert_eq!(a.disambiguator.as_deref(), Some("(I)V"));
        assert_eq!(b.disambiguator.as_deref(), Some("(J)V"));
        assert_ne!(a, b);
    }

    #[test]
    fn unmatched_line_falls_back_to_line_tag() {
        let metadata = FakeMetadata::with(vec![
            overload("(I)V", 1..=20),
            overload("(J)V", 30..=50),
        ]);
        let disambiguator = MethodDisambiguator::new(Some(metadata));
        let id = disambiguator.resolve(&StackFrame::new("C", "run", Some(25)));
        assert_eq!(id.disambiguator.as_deref(), Some("line:25"));
    }

    #[test]
    fn metadata_failure_is_not_fatal() {
        let metadata = Arc::new(FakeMetadata {
            lookups: AtomicUsize::new(0),
            overloads: vec![],
            fail: true,
        });
        let disambiguator = MethodDisambiguator::new(Some(metadata));
        let id = disambiguator.resolve(&StackFrame::new("C", "run", Some(7)));
        assert_eq!(id.disambiguator.as_deref(), Some("line:7"));
    }

    #[test]
    fn no_metadata_and_no_line_keeps_plain_identity() {
        let disambiguator = MethodDisambiguator::new(None);
        let id = disambiguator.resolve(&StackFrame::new("C", "run", None));
        assert_eq!(id.disambiguator, None);
    }

    #[test]
    fn resolutions_are_cached_per_call_site() {
        let metadata = FakeMetadata::with(vec![overload("(I)V", 1..=20)]);
        let disambiguator = MethodDisambiguator::new(Some(Arc::clone(&metadata)));
        let frame = StackFrame::new("C", "run", Some(5));
        disambiguator.resolve(&frame);
        disambiguator.resolve(&frame);
        disambiguator.resolve(&frame);
        assert_eq!(metadata.lookups.load(Ordering::Relaxed), 1);

        // a different line is a different cache key
        disambiguator.resolve(&StackFrame::new("C", "run", Some(6)));
        assert_eq!(metadata.lookups.load(Ordering::Relaxed), 2);
    }
}
