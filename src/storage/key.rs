//! Composite routing key and its SQL predicate.
//!
//! Every column is matched explicitly: `IsNull` renders `column IS NULL`,
//! `Equals` renders `column = <placeholder>` with the value bound. An empty
//! string is only ever compared for equality when a caller asks for it with
//! `KeyMatch::Equals(String::new())`.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum KeyMatch {
    #[default]
    IsNull,
    Equals(String),
}

impl KeyMatch {
    pub fn equals(value: impl Into<String>) -> Self {
        KeyMatch::Equals(value.into())
    }

    /// Absent and empty values both match NULL columns.
    pub fn from_option(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => KeyMatch::Equals(v.to_string()),
            _ => KeyMatch::IsNull,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            KeyMatch::IsNull => None,
            KeyMatch::Equals(v) => Some(v),
        }
    }
}

impl fmt::Display for KeyMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMatch::IsNull => f.write_str("NULL"),
            KeyMatch::Equals(v) => write!(f, "{v:?}"),
        }
    }
}

/// The (handle, slug, app, app_route, app_id) tuple identifying a destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LinkKey {
    pub handle: KeyMatch,
    pub slug: KeyMatch,
    pub app: KeyMatch,
    pub app_route: KeyMatch,
    pub app_id: KeyMatch,
}

impl LinkKey {
    /// Flat short link: `handle` plus a slug, app fields NULL.
    pub fn for_slug(handle: &str, slug: &str) -> Self {
        Self {
            handle: KeyMatch::from_option(Some(handle)),
            slug: KeyMatch::from_option(Some(slug)),
            ..Default::default()
        }
    }

    /// In-app deep link: `handle` plus the app triple, slug NULL.
    pub fn for_app_route(
        handle: &str,
        app: Option<&str>,
        app_route: Option<&str>,
        app_id: Option<&str>,
    ) -> Self {
        Self {
            handle: KeyMatch::from_option(Some(handle)),
            slug: KeyMatch::IsNull,
            app: KeyMatch::from_option(app),
            app_route: KeyMatch::from_option(app_route),
            app_id: KeyMatch::from_option(app_id),
        }
    }

    fn columns(&self) -> [(&'static str, &KeyMatch); 5] {
        [
            ("handle", &self.handle),
            ("slug", &self.slug),
            ("app", &self.app),
            ("app_route", &self.app_route),
            ("app_id", &self.app_id),
        ]
    }

    /// Render the WHERE predicate and the values to bind, in placeholder order.
    ///
    /// `placeholder` receives the 1-based bind index so backends can emit
    /// `?` or `$n` as they need.
    pub fn where_clause(&self, placeholder: impl Fn(usize) -> String) -> (String, Vec<String>) {
        let mut predicates = Vec::with_capacity(5);
        let mut binds = Vec::new();

        for (column, matcher) in self.columns() {
            match matcher {
                KeyMatch::IsNull => predicates.push(format!("{column} IS NULL")),
                KeyMatch::Equals(value) => {
                    binds.push(value.clone());
                    predicates.push(format!("{column} = {}", placeholder(binds.len())));
                }
            }
        }

        (predicates.join(" AND "), binds)
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "handle={} slug={} app={} app_route={} app_id={}",
            self.handle, self.slug, self.app, self.app_route, self.app_id
        )
    }
}
