//! Delegate registry.
//!
//! Applications declare their views as trees of [`Route`]s: menu entries, nav
//! entries and free-standing routes. Each routable entry carries an explicit,
//! stable key. [`Registry::build`] walks every tree once, at app construction,
//! and collects the keys into an immutable lookup table shared by all
//! sessions.
//!
//! Resolving an unknown key is an ordinary failure (`NotFound`): a renderer
//! may hold a key from before a server restart.

use std::{collections::HashMap, fmt, sync::Arc};

use boxwire_proto::{Choice, Value};
use thiserror::Error;

/// Registry construction and lookup errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No route registered under this key
    #[error("route not found: {0}")]
    NotFound(String),

    /// Two different delegates declared under one key
    #[error("duplicate route key: {0}")]
    Duplicate(String),

    /// Route declared with an empty or whitespace-only key
    #[error("route key must not be empty")]
    EmptyKey,

    /// Root entry is a group, not a delegate route
    #[error("root route must name a delegate")]
    RootNotRoutable,
}

struct Target<D: ?Sized> {
    key: String,
    delegate: Arc<D>,
}

/// One entry of a route declaration tree.
///
/// Either a delegate route ([`Route::to`]) or a labelled group of child
/// entries ([`Route::group`]).
pub struct Route<D: ?Sized> {
    target: Option<Target<D>>,
    text: Option<String>,
    icon: Option<String>,
    caption: Option<String>,
    children: Vec<Route<D>>,
}

impl<D: ?Sized> Route<D> {
    /// Route `key` to `delegate`.
    pub fn to(key: impl Into<String>, delegate: Arc<D>) -> Self {
        Self {
            target: Some(Target { key: key.into(), delegate }),
            text: None,
            icon: None,
            caption: None,
            children: Vec::new(),
        }
    }

    /// A labelled group of routes (a submenu).
    pub fn group(text: impl Into<String>, children: impl IntoIterator<Item = Route<D>>) -> Self {
        Self {
            target: None,
            text: Some(text.into()),
            icon: None,
            caption: None,
            children: children.into_iter().collect(),
        }
    }

    /// Display text.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Icon name.
    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Secondary text.
    #[must_use]
    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Add a child entry.
    #[must_use]
    pub fn child(mut self, child: Route<D>) -> Self {
        self.children.push(child);
        self
    }

    /// Route key, if this entry names a delegate.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.target.as_ref().map(|t| t.key.as_str())
    }

    /// Delegate, if this entry names one.
    #[must_use]
    pub fn delegate(&self) -> Option<&Arc<D>> {
        self.target.as_ref().map(|t| &t.delegate)
    }

    /// Wire form of this entry.
    ///
    /// A routed choice's value is its key. A group's value is its text, or
    /// the empty string when it has none.
    #[must_use]
    pub fn to_choice(&self) -> Choice {
        let value = match &self.target {
            Some(target) => Value::from(target.key.as_str()),
            None => Value::from(self.text.as_deref().unwrap_or_default()),
        };

        let mut choice = Choice::new(value);
        choice.text.clone_from(&self.text);
        choice.icon.clone_from(&self.icon);
        choice.caption.clone_from(&self.caption);
        if !self.children.is_empty() {
            choice = choice.options(self.children.iter().map(Route::to_choice));
        }
        choice
    }

    fn collect(&self, table: &mut HashMap<String, Arc<D>>) -> Result<(), RegistryError> {
        if let Some(Target { key, delegate }) = &self.target {
            if key.trim().is_empty() {
                return Err(RegistryError::EmptyKey);
            }
            match table.get(key) {
                Some(existing) if !std::ptr::addr_eq(Arc::as_ptr(existing), Arc::as_ptr(delegate)) => {
                    return Err(RegistryError::Duplicate(key.clone()));
                },
                Some(_) => {},
                None => {
                    table.insert(key.clone(), Arc::clone(delegate));
                },
            }
        }

        self.children.iter().try_for_each(|child| child.collect(table))
    }
}

impl<D: ?Sized> Clone for Route<D> {
    fn clone(&self) -> Self {
        Self {
            target: self
                .target
                .as_ref()
                .map(|t| Target { key: t.key.clone(), delegate: Arc::clone(&t.delegate) }),
            text: self.text.clone(),
            icon: self.icon.clone(),
            caption: self.caption.clone(),
            children: self.children.clone(),
        }
    }
}

impl<D: ?Sized> fmt::Debug for Route<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("key", &self.key())
            .field("text", &self.text)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// Immutable route key to delegate table.
pub struct Registry<D: ?Sized> {
    routes: HashMap<String, Arc<D>>,
}

impl<D: ?Sized> Registry<D> {
    /// Collect every delegate route reachable from the declaration trees.
    ///
    /// The same delegate may appear under the same key in several trees (a
    /// page listed in both menu and nav).
    ///
    /// # Errors
    ///
    /// - `RegistryError::RootNotRoutable` if `root` is a group
    /// - `RegistryError::EmptyKey` for a blank key anywhere
    /// - `RegistryError::Duplicate` if one key names two delegates
    pub fn build(
        root: &Route<D>,
        menu: &[Route<D>],
        nav: &[Route<D>],
        routes: &[Route<D>],
    ) -> Result<Self, RegistryError> {
        if root.target.is_none() {
            return Err(RegistryError::RootNotRoutable);
        }

        let mut table = HashMap::new();
        for route in std::iter::once(root).chain(menu).chain(nav).chain(routes) {
            route.collect(&mut table)?;
        }

        Ok(Self { routes: table })
    }

    /// Delegate registered under `token`.
    ///
    /// # Errors
    ///
    /// - `RegistryError::NotFound` if the key was never declared
    pub fn resolve(&self, token: &str) -> Result<Arc<D>, RegistryError> {
        self.routes.get(token).cloned().ok_or_else(|| RegistryError::NotFound(token.to_string()))
    }

    /// Whether `token` is registered.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.routes.contains_key(token)
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl<D: ?Sized> fmt::Debug for Registry<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("keys", &self.keys()).finish()
    }
}
