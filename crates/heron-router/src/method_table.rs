//! Per-path method table.
//!
//! A [`MethodTable`] holds the declared route target for each verb on one
//! path, plus the `Allow` value of the derived OPTIONS route.

use http::Method;

/// Verbs an endpoint can declare a handler for.
///
/// OPTIONS is deliberately absent: every path gets a derived OPTIONS route
/// that declarations cannot replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `PATCH`
    Patch,
}

impl Verb {
    /// All declarable verbs, in `Allow` header order.
    pub const ALL: [Self; 5] = [Self::Get, Self::Post, Self::Put, Self::Delete, Self::Patch];

    /// Maps an HTTP method to a declarable verb.
    #[must_use]
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Self::Get),
            Method::POST => Some(Self::Post),
            Method::PUT => Some(Self::Put),
            Method::DELETE => Some(Self::Delete),
            Method::PATCH => Some(Self::Patch),
            _ => None,
        }
    }

    /// The corresponding HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
            Self::Delete => Method::DELETE,
            Self::Patch => Method::PATCH,
        }
    }

    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Route targets for one path, indexed by verb.
///
/// ```rust
/// use heron_router::{MethodTable, Verb};
///
/// let mut table = MethodTable::new();
/// table.insert(Verb::Post, "register").unwrap();
/// table.insert(Verb::Get, "whoAmI").unwrap();
///
/// assert_eq!(table.allow(), "GET, POST");
/// assert!(table.insert(Verb::Get, "again").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct MethodTable<T> {
    slots: [Option<T>; 5],
    allow: String,
}

impl<T> Default for MethodTable<T> {
    fn default() -> Self {
        Self {
            slots: [None, None, None, None, None],
            allow: String::new(),
        }
    }
}

impl<T> MethodTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `target` for `verb`.
    ///
    /// Returns the target back if the verb is already taken.
    pub fn insert(&mut self, verb: Verb, target: T) -> Result<(), T> {
        let slot = &mut self.slots[verb.index()];
        if slot.is_some() {
            return Err(target);
        }
        *slot = Some(target);
        self.allow = self
            .verbs()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Ok(())
    }

    /// The target registered for `verb`.
    #[must_use]
    pub fn get(&self, verb: Verb) -> Option<&T> {
        self.slots[verb.index()].as_ref()
    }

    /// Verbs with a registered target, in `Allow` order.
    pub fn verbs(&self) -> impl Iterator<Item = Verb> + '_ {
        Verb::ALL
            .into_iter()
            .filter(|v| self.slots[v.index()].is_some())
    }

    /// `Allow` header value: the registered verbs joined by `", "`.
    #[must_use]
    pub fn allow(&self) -> &str {
        &self.allow
    }

    /// Returns true if no verb is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_round_trip() {
        for verb in Verb::ALL {
            assert_eq!(Verb::from_method(&verb.method()), Some(verb));
        }
        assert_eq!(Verb::from_method(&Method::OPTIONS), None);
        assert_eq!(Verb::from_method(&Method::HEAD), None);
    }

    #[test]
    fn test_allow_is_ordered_regardless_of_insertion() {
        let mut table = MethodTable::new();
        table.insert(Verb::Patch, 1).unwrap();
        table.insert(Verb::Get, 2).unwrap();
        table.insert(Verb::Delete, 3).unwrap();
        assert_eq!(table.allow(), "GET, DELETE, PATCH");
    }

    #[test]
    fn test_duplicate_insert_returns_target() {
        let mut table = MethodTable::new();
        table.insert(Verb::Get, "first").unwrap();
        assert_eq!(table.insert(Verb::Get, "second"), Err("second"));
        assert_eq!(table.get(Verb::Get), Some(&"first"));
    }

    #[test]
    fn test_empty_table() {
        let table: MethodTable<()> = MethodTable::new();
        assert!(table.is_empty());
        assert_eq!(table.allow(), "");
    }
}
