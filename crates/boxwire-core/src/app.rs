//! Application definition shared by every session.
//!
//! An [`App`] is built once and shared behind an `Arc`: the root route, the
//! delegate registry and the session settings (title, menus, theme, plugins
//! and locale tables). Sessions only ever read it.

use std::{collections::BTreeMap, fmt, sync::Arc};

use boxwire_proto::{
    Choice,
    payloads::{Plugin, Settings, Theme},
};

use crate::registry::{Registry, RegistryError, Route};

/// Immutable application shared across sessions.
pub struct App<D: ?Sized> {
    root_key: String,
    root: Arc<D>,
    registry: Registry<D>,
    title: Option<String>,
    caption: Option<String>,
    menu: Vec<Choice>,
    nav: Vec<Choice>,
    theme: Option<Theme>,
    plugins: Vec<Plugin>,
    locales: BTreeMap<String, BTreeMap<String, String>>,
    default_locale: Option<String>,
}

impl<D: ?Sized> App<D> {
    /// Start building an app whose entry point is `root`.
    pub fn builder(root: Route<D>) -> AppBuilder<D> {
        AppBuilder {
            root,
            menu: Vec::new(),
            nav: Vec::new(),
            routes: Vec::new(),
            title: None,
            caption: None,
            theme: None,
            plugins: Vec::new(),
            locales: BTreeMap::new(),
            default_locale: None,
        }
    }

    /// Key of the root route.
    #[must_use]
    pub fn root_key(&self) -> &str {
        &self.root_key
    }

    /// Root delegate.
    #[must_use]
    pub fn root(&self) -> &Arc<D> {
        &self.root
    }

    /// Route table.
    #[must_use]
    pub fn registry(&self) -> &Registry<D> {
        &self.registry
    }

    /// Delegate registered under `token`.
    ///
    /// # Errors
    ///
    /// - `RegistryError::NotFound` if `token` was never declared
    pub fn resolve(&self, token: &str) -> Result<Arc<D>, RegistryError> {
        self.registry.resolve(token)
    }

    /// Pick the locale tag to use for a requested one.
    ///
    /// Tries the exact tag, then its primary language subtag (`de-AT` falls
    /// back to `de`), then the default locale. `None` when nothing matches.
    #[must_use]
    pub fn resolve_locale(&self, requested: Option<&str>) -> Option<&str> {
        let by_request = requested.and_then(|tag| {
            let primary = tag.split(['-', '_']).next().unwrap_or(tag);
            [tag, primary]
                .into_iter()
                .find_map(|candidate| self.locales.get_key_value(candidate))
                .map(|(key, _)| key.as_str())
        });

        by_request.or_else(|| {
            self.default_locale
                .as_deref()
                .and_then(|tag| self.locales.get_key_value(tag))
                .map(|(key, _)| key.as_str())
        })
    }

    /// Look up `key` in the string table of `locale`.
    #[must_use]
    pub fn translate(&self, locale: Option<&str>, key: &str) -> Option<&str> {
        self.locales.get(locale?)?.get(key).map(String::as_str)
    }

    /// Handshake acknowledgement for a session.
    ///
    /// Only fields the app actually configures are present.
    #[must_use]
    pub fn settings(&self, mode: Option<&str>, locale: Option<&str>) -> Settings {
        Settings {
            title: self.title.clone(),
            caption: self.caption.clone(),
            menu: (!self.menu.is_empty()).then(|| self.menu.clone()),
            nav: (!self.nav.is_empty()).then(|| self.nav.clone()),
            theme: self.theme.clone(),
            plugins: (!self.plugins.is_empty()).then(|| self.plugins.clone()),
            locale: locale.and_then(|tag| self.locales.get(tag)).cloned(),
            mode: mode.map(str::to_string),
        }
    }
}

impl<D: ?Sized> fmt::Debug for App<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root_key)
            .field("registry", &self.registry)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// Builder for [`App`].
pub struct AppBuilder<D: ?Sized> {
    root: Route<D>,
    menu: Vec<Route<D>>,
    nav: Vec<Route<D>>,
    routes: Vec<Route<D>>,
    title: Option<String>,
    caption: Option<String>,
    theme: Option<Theme>,
    plugins: Vec<Plugin>,
    locales: BTreeMap<String, BTreeMap<String, String>>,
    default_locale: Option<String>,
}

impl<D: ?Sized> AppBuilder<D> {
    /// Window title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Subtitle.
    #[must_use]
    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Append a main menu entry.
    #[must_use]
    pub fn menu(mut self, route: Route<D>) -> Self {
        self.menu.push(route);
        self
    }

    /// Append a navigation bar entry.
    #[must_use]
    pub fn nav(mut self, route: Route<D>) -> Self {
        self.nav.push(route);
        self
    }

    /// Register a route reachable only by switching to it.
    #[must_use]
    pub fn route(mut self, route: Route<D>) -> Self {
        self.routes.push(route);
        self
    }

    /// Color scheme.
    #[must_use]
    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    /// Append a renderer plugin.
    #[must_use]
    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Add a string table for locale `tag`.
    #[must_use]
    pub fn locale<K, V>(
        mut self,
        tag: impl Into<String>,
        table: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let table = table.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.locales.insert(tag.into(), table);
        self
    }

    /// Locale used when the renderer requests none or an unknown one.
    #[must_use]
    pub fn default_locale(mut self, tag: impl Into<String>) -> Self {
        self.default_locale = Some(tag.into());
        self
    }

    /// Build the route table and freeze the app.
    ///
    /// # Errors
    ///
    /// See [`Registry::build`].
    pub fn build(self) -> Result<Arc<App<D>>, RegistryError> {
        let registry = Registry::build(&self.root, &self.menu, &self.nav, &self.routes)?;
        let (Some(root_key), Some(root)) = (self.root.key(), self.root.delegate()) else {
            return Err(RegistryError::RootNotRoutable);
        };

        Ok(Arc::new(App {
            root_key: root_key.to_string(),
            root: Arc::clone(root),
            registry,
            title: self.title,
            caption: self.caption,
            menu: self.menu.iter().map(Route::to_choice).collect(),
            nav: self.nav.iter().map(Route::to_choice).collect(),
            theme: self.theme,
            plugins: self.plugins,
            locales: self.locales,
            default_locale: self.default_locale,
        }))
    }
}
