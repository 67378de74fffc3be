//! Process-wide decorator record storage.
//!
//! The store is an append-only multimap keyed by
//! `(class, member, parameter index)`. Records are written at
//! definition time (single writer, before the server accepts traffic)
//! and read concurrently afterwards. Records are immutable once stored.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use crate::error::{ReflectError, ReflectResult};
use crate::payload::{DecoratorOptions, DecoratorPayload};
use crate::registry::TypeRegistry;
use crate::types::ClassId;

/// Storage key for a decorator record.
///
/// `member: None` targets the class itself; `index: Some(_)` targets a
/// parameter of the named member (the member `"constructor"` addresses
/// constructor parameters).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataKey {
    /// The decorated class.
    pub class: ClassId,
    /// The decorated member, if any.
    pub member: Option<String>,
    /// The decorated parameter index, if any.
    pub index: Option<usize>,
}

/// A stored decorator record.
#[derive(Debug, Clone)]
pub struct DecoratorRecord {
    /// The decorator payload.
    pub payload: DecoratorPayload,
    /// Inheritance and shadowing options.
    pub options: DecoratorOptions,
    /// The class the record was declared on (used for generic symbol
    /// resolution and diagnostics).
    pub declared_on: ClassId,
}

/// Append-only decorator record store.
#[derive(Default)]
pub struct MetadataStore {
    records: RwLock<HashMap<MetadataKey, Vec<DecoratorRecord>>>,
}

impl MetadataStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record for the given slot.
    ///
    /// Records with `apply_to` member names are replicated under each
    /// named member so a class-level decorator can retroactively
    /// decorate members.
    ///
    /// # Errors
    ///
    /// Returns [`ReflectError::MissingIdentity`] when a non-repeatable
    /// record carries no identity key. This is a fatal configuration
    /// error and is raised at decoration time.
    pub fn set(
        &self,
        class: ClassId,
        member: Option<&str>,
        index: Option<usize>,
        payload: DecoratorPayload,
        options: DecoratorOptions,
    ) -> ReflectResult<()> {
        if !options.allow_multiple && payload.identity().is_none() {
            return Err(ReflectError::MissingIdentity {
                kind: payload.kind().to_string(),
            });
        }

        let mut records = self.records.write();
        for target in &options.apply_to {
            let key = MetadataKey {
                class,
                member: Some(target.clone()),
                index: None,
            };
            records.entry(key).or_default().push(DecoratorRecord {
                payload: payload.clone(),
                options: options.clone(),
                declared_on: class,
            });
        }
        let key = MetadataKey {
            class,
            member: member.map(str::to_string),
            index,
        };
        records.entry(key).or_default().push(DecoratorRecord {
            payload,
            options,
            declared_on: class,
        });
        Ok(())
    }

    /// Returns records declared directly on the given slot, excluding
    /// anything inherited.
    ///
    /// Required for constructor parameter metadata, which is never
    /// inherited (a subtype constructor has different parameters).
    #[must_use]
    pub fn get_own(
        &self,
        class: ClassId,
        member: Option<&str>,
        index: Option<usize>,
    ) -> Vec<DecoratorRecord> {
        let key = MetadataKey {
            class,
            member: member.map(str::to_string),
            index,
        };
        let records = self.records.read();
        let own = records.get(&key).cloned().unwrap_or_default();
        if member.is_none() {
            // A replicated class-level record with remove_applied set
            // no longer appears on the class slot.
            own.into_iter()
                .filter(|r| r.options.apply_to.is_empty() || !r.options.remove_applied)
                .collect()
        } else {
            own
        }
    }

    /// Returns own records plus inherited records not shadowed by
    /// non-repeatable identity collisions, walking the parent chain
    /// from the queried class to the root (child records first).
    ///
    /// # Errors
    ///
    /// Propagates [`ReflectError::CyclicInheritance`] from the chain
    /// walk.
    pub fn get(
        &self,
        registry: &TypeRegistry,
        class: ClassId,
        member: Option<&str>,
        index: Option<usize>,
    ) -> ReflectResult<Vec<DecoratorRecord>> {
        let chain = registry.chain(class)?;
        let mut merged = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for (depth, level) in chain.iter().enumerate() {
            for record in self.get_own(*level, member, index) {
                if depth > 0 && !record.options.inherit {
                    continue;
                }
                if !record.options.allow_multiple {
                    // Identity presence is enforced by `set`.
                    if let Some(identity) = record.payload.identity() {
                        if !seen.insert(identity) {
                            continue;
                        }
                    }
                }
                merged.push(record);
            }
        }
        Ok(merged)
    }

    /// Drops every stored record. Intended for test isolation.
    pub fn clear(&self) {
        self.records.write().clear();
    }
}
