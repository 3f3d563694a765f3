//! The inspection cache: `(type, role) -> ordered member list`.
//!
//! # Concurrency
//!
//! Entries live in a sharded [`DashMap`]. A miss walks the declaration
//! with no shard lock held, then inserts with `entry().or_insert`, so:
//!
//! - populating one type never blocks lookups or population of another;
//! - two threads racing on the same type both walk, but only the first
//!   insert is kept, and both return that one entry;
//! - entries are never replaced, mutated, or evicted.
//!
//! A declaration that fails validation is not stored; the next lookup
//! walks again and reports the same error.

use std::any::{Any, TypeId};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use hookwire_marker::{DeclarationError, Hooked, Member, Role, TypeDescriptor};

use crate::walk::walk;

/// A cached, ordered member list. Cloning it is an `Arc` bump.
pub type MemberList<T> = Arc<Vec<Member<T>>>;

type Entry = Arc<dyn Any + Send + Sync>;

static SHARED: OnceLock<Arc<InspectionCache>> = OnceLock::new();

/// How many members a type has per role.
///
/// The lifecycle adapter checks [`is_passthrough`](Self::is_passthrough)
/// once per decode to skip straight to the base codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Profile {
    pub pre_encode: usize,
    pub post_decode: usize,
    pub context_inject: usize,
    pub wrapped_objects: usize,
    pub wrapped_arrays: usize,
}

impl Profile {
    /// Number of members registered under `role`.
    pub fn count(&self, role: Role) -> usize {
        match role {
            Role::PreEncode => self.pre_encode,
            Role::PostDecode => self.post_decode,
            Role::ContextInject => self.context_inject,
            Role::WrappedObjectField => self.wrapped_objects,
            Role::WrappedArrayField => self.wrapped_arrays,
        }
    }

    /// `true` when the type has no hooks and no wrapped fields at all.
    pub fn is_passthrough(&self) -> bool {
        Role::ALL.iter().all(|role| self.count(*role) == 0)
    }

    /// `true` when any wrapped field (object or array) is declared.
    pub fn has_wrapped_fields(&self) -> bool {
        self.wrapped_objects + self.wrapped_arrays > 0
    }

    fn set(&mut self, role: Role, count: usize) {
        match role {
            Role::PreEncode => self.pre_encode = count,
            Role::PostDecode => self.post_decode = count,
            Role::ContextInject => self.context_inject = count,
            Role::WrappedObjectField => self.wrapped_objects = count,
            Role::WrappedArrayField => self.wrapped_arrays = count,
        }
    }
}

/// Memoized member lists, keyed by `(TypeId, Role)`.
///
/// Use [`InspectionCache::shared`] for the process-wide instance or
/// [`InspectionCache::new`] for an isolated one (handy in tests).
#[derive(Default)]
pub struct InspectionCache {
    entries: DashMap<(TypeId, Role), Entry>,
    profiles: DashMap<TypeId, Profile>,
}

impl InspectionCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache, created on first use.
    pub fn shared() -> Arc<Self> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::new())))
    }

    /// Returns the members of `T` carrying `role`, in the fixed order.
    ///
    /// The first lookup for `T` walks its declaration once and stores the
    /// lists for every role; each later lookup returns the stored `Arc`.
    ///
    /// # Errors
    /// Returns the [`DeclarationError`] found while validating `T`'s
    /// declaration. Nothing is cached in that case.
    pub fn members_for<T: Hooked>(
        &self,
        role: Role,
    ) -> Result<MemberList<T>, DeclarationError> {
        let key = (TypeId::of::<T>(), role);
        if let Some(entry) = self.entries.get(&key) {
            return Ok(downcast::<T>(Arc::clone(entry.value())));
        }

        self.populate::<T>()?;

        let entry = self
            .entries
            .get(&key)
            .map(|entry| Arc::clone(entry.value()))
            .expect("populate stores every role");
        Ok(downcast::<T>(entry))
    }

    /// Returns the per-role member counts of `T`.
    ///
    /// # Errors
    /// Same as [`members_for`](Self::members_for).
    pub fn profile<T: Hooked>(&self) -> Result<Profile, DeclarationError> {
        if let Some(profile) = self.profiles.get(&TypeId::of::<T>()) {
            return Ok(*profile);
        }
        self.populate::<T>()?;
        Ok(self
            .profiles
            .get(&TypeId::of::<T>())
            .map(|profile| *profile)
            .unwrap_or_default())
    }

    /// Number of stored `(type, role)` entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been inspected yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Walks `T` and stores one entry per role, keeping any entry another
    /// thread stored first.
    fn populate<T: Hooked>(&self) -> Result<(), DeclarationError> {
        let ty = TypeDescriptor::of::<T>();
        let members = walk::<T>().inspect_err(|e| {
            tracing::warn!(%ty, error = %e, "rejected hook declaration");
        })?;

        let mut profile = Profile::default();
        for role in Role::ALL {
            let list: Vec<Member<T>> = members
                .iter()
                .filter(|m| m.role() == role)
                .cloned()
                .collect();
            profile.set(role, list.len());

            let entry: Entry = Arc::new(list);
            self.entries.entry((ty.id(), role)).or_insert(entry);
        }
        self.profiles.entry(ty.id()).or_insert(profile);

        tracing::debug!(
            %ty,
            pre_encode = profile.pre_encode,
            post_decode = profile.post_decode,
            context_inject = profile.context_inject,
            wrapped = profile.wrapped_objects + profile.wrapped_arrays,
            "inspection cache populated"
        );
        Ok(())
    }
}

fn downcast<T: Hooked>(entry: Entry) -> MemberList<T> {
    // Entries are keyed by `TypeId::of::<T>()`, so the type always matches.
    entry
        .downcast::<Vec<Member<T>>>()
        .expect("cache entry type matches its key")
}
