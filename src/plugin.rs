// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Plugins: derived state attached to membership events.
//!
//! A [`Plugin`] observes every value that enters or leaves a set and folds it into an
//! *aggregate* of its own choosing. The aggregate lives next to the members (each set version
//! carries the aggregate matching its members), but plugins never see or touch the member map
//! except through the read-only [`SSet`] handed to [`Plugin::on_init`] and [`Plugin::query`].
//!
//! Plugins are registered under a name with [`SSet::add_plugins`], and their API is reached via
//! [`SSet::query`]:
//!
//! ```rust
//! use sset::{Plugin, Plugins, SSet, Value};
//!
//! /// Sums all numeric members.
//! struct Sum;
//!
//! impl Plugin for Sum {
//!     type Aggregate = i64;
//!     type Api<'set> = i64;
//!
//!     fn on_init(&self, set: &SSet) -> i64 {
//!         set.iter().filter_map(Value::as_i64).sum()
//!     }
//!
//!     fn on_add(&self, sum: i64, value: &Value) -> i64 {
//!         sum + value.as_i64().unwrap_or(0)
//!     }
//!
//!     fn on_remove(&self, sum: i64, value: &Value) -> i64 {
//!         sum - value.as_i64().unwrap_or(0)
//!     }
//!
//!     fn query<'set>(&self, _set: &'set SSet, sum: &'set i64) -> i64 {
//!         *sum
//!     }
//! }
//!
//! let set = sset::sset![1, 2].add_plugins(Plugins::new().with("sum", Sum))?;
//! let set = set.add(&39)?;
//! assert_eq!(set.query::<Sum>("sum")?, 42);
//! # Ok::<(), sset::Error>(())
//! ```
//!
//! The name `size` is reserved: it is the always-present built-in property of every set and
//! shares the `props` namespace with plugin aggregates when a set is serialized.
use crate::{Error, Result, SSet};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{
    any::{Any, TypeId},
    collections::BTreeMap,
    fmt,
    sync::Arc,
};

/// The name under which the size of a set is serialized, and which no plugin may use.
pub const RESERVED_NAME: &str = "size";

/// An observer that maintains derived state over the members of a set.
///
/// All methods must be pure: the same inputs must always produce the same outputs, and they must
/// not have side effects. Events are delivered in the order the set applies them; for operations
/// touching many values at once, that is ascending [`HashKey`](crate::HashKey) order.
pub trait Plugin: Send + Sync + 'static {
    /// The derived state kept per set version.
    ///
    /// It is serialized into the `props` of a set's serialized form, so that a receiving process
    /// does not need to recompute it.
    type Aggregate: Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static;

    /// What [`SSet::query`] returns for this plugin.
    type Api<'set>
    where
        Self: 'set;

    /// Produces the aggregate for a plugin newly attached to `set`.
    fn on_init(&self, set: &SSet) -> Self::Aggregate;

    /// Folds a value that was just added to the set into the aggregate.
    #[expect(unused_variables)]
    fn on_add(&self, aggregate: Self::Aggregate, value: &Value) -> Self::Aggregate {
        aggregate
    }

    /// Folds a value that was just removed from the set into the aggregate.
    #[expect(unused_variables)]
    fn on_remove(&self, aggregate: Self::Aggregate, value: &Value) -> Self::Aggregate {
        aggregate
    }

    /// Exposes this plugin's view of `set`.
    fn query<'set>(&self, set: &'set SSet, aggregate: &'set Self::Aggregate) -> Self::Api<'set>;
}

/// A type-erased, not-yet-attached plugin.
trait Definition: Send + Sync {
    fn init(&self, set: &SSet) -> Arc<dyn Active>;

    fn restore(&self, aggregate: Value) -> Result<Arc<dyn Active>, serde_json::Error>;

    fn plugin_type(&self) -> TypeId;
}

struct Shared<P>(Arc<P>);

impl<P: Plugin> Definition for Shared<P> {
    fn init(&self, set: &SSet) -> Arc<dyn Active> {
        Arc::new(Attached {
            plugin: Arc::clone(&self.0),
            aggregate: self.0.on_init(set),
        })
    }

    fn restore(&self, aggregate: Value) -> Result<Arc<dyn Active>, serde_json::Error> {
        Ok(Arc::new(Attached {
            plugin: Arc::clone(&self.0),
            aggregate: serde_json::from_value::<P::Aggregate>(aggregate)?,
        }))
    }

    fn plugin_type(&self) -> TypeId {
        TypeId::of::<P>()
    }
}

/// A type-erased plugin together with its aggregate for one set version.
pub(crate) trait Active: Send + Sync {
    fn on_add(&self, value: &Value) -> Arc<dyn Active>;

    fn on_remove(&self, value: &Value) -> Arc<dyn Active>;

    fn aggregate_json(&self) -> Result<Value, serde_json::Error>;

    fn debug_aggregate(&self) -> &dyn fmt::Debug;

    fn as_any(&self) -> &dyn Any;

    fn plugin_type(&self) -> TypeId;
}

pub(crate) struct Attached<P: Plugin> {
    plugin: Arc<P>,
    aggregate: P::Aggregate,
}

impl<P: Plugin> Active for Attached<P> {
    fn on_add(&self, value: &Value) -> Arc<dyn Active> {
        Arc::new(Attached {
            plugin: Arc::clone(&self.plugin),
            aggregate: self.plugin.on_add(self.aggregate.clone(), value),
        })
    }

    fn on_remove(&self, value: &Value) -> Arc<dyn Active> {
        Arc::new(Attached {
            plugin: Arc::clone(&self.plugin),
            aggregate: self.plugin.on_remove(self.aggregate.clone(), value),
        })
    }

    fn aggregate_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.aggregate)
    }

    fn debug_aggregate(&self) -> &dyn fmt::Debug {
        &self.aggregate
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn plugin_type(&self) -> TypeId {
        TypeId::of::<P>()
    }
}

/// A collection of named plugin definitions, to be attached to a set.
///
/// ```rust
/// # use sset::{Plugin, Plugins, SSet, Value};
/// # struct Count;
/// # impl Plugin for Count {
/// #     type Aggregate = usize;
/// #     type Api<'set> = usize;
/// #     fn on_init(&self, set: &SSet) -> usize { set.len() }
/// #     fn query<'set>(&self, _: &'set SSet, n: &'set usize) -> usize { *n }
/// # }
/// let plugins = Plugins::new().with("count", Count);
/// assert_eq!(plugins.names().collect::<Vec<_>>(), ["count"]);
/// ```
#[derive(Clone, Default)]
pub struct Plugins {
    definitions: BTreeMap<String, Arc<dyn Definition>>,
}

impl fmt::Debug for Plugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.definitions.keys()).finish()
    }
}

impl Plugins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `plugin` under `name`, replacing any definition previously given that name.
    pub fn with<P: Plugin>(mut self, name: impl Into<String>, plugin: P) -> Self {
        self.insert(name, plugin);
        self
    }

    /// Adds `plugin` under `name`, replacing any definition previously given that name.
    pub fn insert<P: Plugin>(&mut self, name: impl Into<String>, plugin: P) {
        self.definitions
            .insert(name.into(), Arc::new(Shared(Arc::new(plugin))));
    }

    /// Names of all contained definitions, in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }
}

/// The plugins attached to one set version, by name.
#[derive(Clone, Default)]
pub(crate) struct Registry {
    active: Arc<BTreeMap<String, Arc<dyn Active>>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.active.iter().map(|(k, v)| (k, v.debug_aggregate())))
            .finish()
    }
}

impl Registry {
    pub(crate) fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.active.contains_key(name)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&dyn Active> {
        self.active.get(name).map(|a| &**a)
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.active.keys().map(String::as_str)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &dyn Active)> {
        self.active.iter().map(|(k, v)| (k.as_str(), &**v))
    }

    pub(crate) fn notify_add(&mut self, value: &Value) {
        if self.is_empty() {
            return;
        }
        for active in Arc::make_mut(&mut self.active).values_mut() {
            *active = active.on_add(value);
        }
    }

    pub(crate) fn notify_remove(&mut self, value: &Value) {
        if self.is_empty() {
            return;
        }
        for active in Arc::make_mut(&mut self.active).values_mut() {
            *active = active.on_remove(value);
        }
    }

    fn insert(&mut self, name: String, active: Arc<dyn Active>) {
        Arc::make_mut(&mut self.active).insert(name, active);
    }

    fn remove(&mut self, name: &str) {
        Arc::make_mut(&mut self.active).remove(name);
    }
}

impl SSet {
    /// Attaches `plugins` to a copy of this set.
    ///
    /// Each new plugin's aggregate is produced by [`Plugin::on_init`] over the current members.
    ///
    /// Fails with [`Error::PluginAlreadyActive`], listing every offending name, if any of the
    /// names is already attached (or is the reserved name [`RESERVED_NAME`]).
    pub fn add_plugins(&self, plugins: Plugins) -> Result<SSet> {
        let colliding: Vec<String> = plugins
            .names()
            .filter(|name| *name == RESERVED_NAME || self.plugins.contains(name))
            .map(String::from)
            .collect();
        if !colliding.is_empty() {
            return Err(Error::PluginAlreadyActive { names: colliding });
        }

        let mut set = self.clone();
        for (name, definition) in plugins.definitions {
            tracing::debug!(plugin = %name, members = self.len(), "attaching plugin");
            set.plugins.insert(name, definition.init(self));
        }
        Ok(set)
    }

    /// Detaches the named plugins from a copy of this set.
    ///
    /// The aggregates of detached plugins are discarded; attaching the plugin again later starts
    /// over from [`Plugin::on_init`]. An empty list of names leaves the set as it is.
    ///
    /// Fails with [`Error::PluginNotActive`], listing every offending name, if any name is not
    /// attached.
    pub fn remove_plugins<I, S>(&self, names: I) -> Result<SSet>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = names.into_iter().collect();
        let mut missing: Vec<String> = names
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| !self.plugins.contains(name))
            .map(String::from)
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            missing.dedup();
            return Err(Error::PluginNotActive { names: missing });
        }

        let mut set = self.clone();
        for name in &names {
            tracing::debug!(plugin = name.as_ref(), "detaching plugin");
            set.plugins.remove(name.as_ref());
        }
        Ok(set)
    }

    /// Makes `plugins` the exact set of attached plugins of a copy of this set.
    ///
    /// Plugins that are already attached under a listed name keep their current aggregate (the
    /// passed definition is not used for them), plugins not listed are detached as with
    /// [`SSet::remove_plugins`], and the rest are attached as with [`SSet::add_plugins`].
    ///
    /// Fails with [`Error::PluginTypeMismatch`] if a listed name is attached as a different
    /// plugin type than the one passed for it.
    ///
    /// An empty `plugins` leaves the set as it is; detach everything with
    /// [`SSet::remove_plugins`] and [`SSet::active_plugins`] instead.
    pub fn only_use_plugins(&self, plugins: Plugins) -> Result<SSet> {
        if plugins.is_empty() {
            return Ok(self.clone());
        }
        if plugins.contains(RESERVED_NAME) {
            return Err(Error::PluginAlreadyActive {
                names: vec![RESERVED_NAME.to_owned()],
            });
        }

        if let Some(name) = plugins.definitions.iter().find_map(|(name, definition)| {
            let active = self.plugins.get(name)?;
            (active.plugin_type() != definition.plugin_type()).then(|| name.clone())
        }) {
            return Err(Error::PluginTypeMismatch { name });
        }

        let unlisted: Vec<String> = self
            .plugins
            .names()
            .filter(|name| !plugins.contains(name))
            .map(String::from)
            .collect();
        let mut set = self.remove_plugins(&unlisted)?;
        for (name, definition) in plugins.definitions {
            if set.plugins.contains(&name) {
                continue;
            }
            tracing::debug!(plugin = %name, members = self.len(), "attaching plugin");
            set.plugins.insert(name, definition.init(self));
        }
        Ok(set)
    }

    /// Names of all attached plugins, in ascending order.
    pub fn active_plugins(&self) -> Vec<&str> {
        self.plugins.names().collect()
    }

    /// Returns the API of the plugin attached under `name`.
    ///
    /// `P` must be the type the plugin was attached as; otherwise this fails with
    /// [`Error::PluginTypeMismatch`].
    pub fn query<P: Plugin>(&self, name: &str) -> Result<P::Api<'_>> {
        let attached = self.attached::<P>(name)?;
        Ok(attached.plugin.query(self, &attached.aggregate))
    }

    /// Returns the current aggregate of the plugin attached under `name`.
    pub fn aggregate<P: Plugin>(&self, name: &str) -> Result<&P::Aggregate> {
        self.attached::<P>(name).map(|a| &a.aggregate)
    }

    fn attached<P: Plugin>(&self, name: &str) -> Result<&Attached<P>> {
        let active = self.plugins.get(name).ok_or_else(|| Error::PluginNotActive {
            names: vec![name.to_owned()],
        })?;
        active
            .as_any()
            .downcast_ref::<Attached<P>>()
            .ok_or_else(|| Error::PluginTypeMismatch {
                name: name.to_owned(),
            })
    }

    /// Re-attaches `plugins` to a freshly reconstructed set.
    ///
    /// Aggregates found in `props` are restored as they are; plugins without a stored aggregate
    /// are initialized from the members.
    pub(crate) fn restore_plugins(
        mut self,
        plugins: Plugins,
        props: &mut serde_json::Map<String, Value>,
    ) -> Result<SSet> {
        if plugins.contains(RESERVED_NAME) {
            return Err(Error::PluginAlreadyActive {
                names: vec![RESERVED_NAME.to_owned()],
            });
        }
        let bare = self.clone();
        for (name, definition) in plugins.definitions {
            let active = match props.remove(&name) {
                Some(aggregate) => {
                    tracing::trace!(plugin = %name, "restoring plugin aggregate");
                    definition.restore(aggregate)?
                }
                None => {
                    tracing::debug!(plugin = %name, "no stored aggregate, initializing plugin");
                    definition.init(&bare)
                }
            };
            self.plugins.insert(name, active);
        }
        for name in props.keys() {
            tracing::trace!(plugin = %name, "ignoring aggregate of plugin that was not supplied");
        }
        Ok(self)
    }
}
