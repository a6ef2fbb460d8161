//! Command parameters and the collection that owns them.

mod lookup;

use std::ops::Index;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Db2Error;
use crate::types::{DbType, Value};

use lookup::NameLookup;
pub use lookup::{LOOKUP_THRESHOLD, strip_sigil};

static NEXT_COLLECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A named bind value.
///
/// The name is kept as supplied (trimmed); [`clean_name`](Self::clean_name) is the
/// form used for resolution and for emitted markers.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: Value,
    db_type: Option<DbType>,
    auto_named: bool,
    owner: Option<u64>,
}

impl Parameter {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            value: value.into(),
            db_type: None,
            auto_named: false,
            owner: None,
        }
    }

    #[must_use]
    pub fn with_db_type(mut self, db_type: DbType) -> Self {
        self.db_type = Some(db_type);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without its `:`/`@` sigil.
    #[must_use]
    pub fn clean_name(&self) -> &str {
        strip_sigil(&self.name)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into().trim().to_string();
        self.auto_named = false;
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.value = value.into();
    }

    #[must_use]
    pub fn db_type(&self) -> Option<DbType> {
        self.db_type
    }

    pub fn set_db_type(&mut self, db_type: Option<DbType>) {
        self.db_type = db_type;
    }

    /// True when the collection generated the name.
    #[must_use]
    pub fn is_auto_named(&self) -> bool {
        self.auto_named
    }

    /// True while some collection holds this parameter (or a clone of one it holds).
    #[must_use]
    pub fn is_owned(&self) -> bool {
        self.owner.is_some()
    }

    /// Copy that belongs to no collection.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            owner: None,
            ..self.clone()
        }
    }
}

/// Ordered parameters of one command.
///
/// ```rust
/// use db2_middleware::prelude::*;
///
/// let mut params = ParameterCollection::new();
/// params.add_with_value(":ID", 42_i32).unwrap();
/// params.add_with_value("", "auto").unwrap();
/// assert_eq!(params.index_of("id"), Some(0));
/// assert_eq!(params[1].name(), ":Parameter2");
/// ```
#[derive(Debug)]
pub struct ParameterCollection {
    id: u64,
    items: Vec<Parameter>,
    lookup: NameLookup,
}

impl Default for ParameterCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterCollection {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_COLLECTION_ID.fetch_add(1, Ordering::Relaxed),
            items: Vec::new(),
            lookup: NameLookup::default(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.items.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Parameter] {
        &self.items
    }

    fn adopt(&self, mut param: Parameter, slot: usize) -> Result<Parameter, Db2Error> {
        if param.owner.is_some() {
            return Err(Db2Error::ParameterOwned);
        }
        if param.name.is_empty() || param.name == ":" {
            param.name = format!(":Parameter{slot}");
            param.auto_named = true;
        }
        param.owner = Some(self.id);
        Ok(param)
    }

    fn release(mut param: Parameter) -> Parameter {
        param.owner = None;
        param
    }

    /// Append a parameter, returning its index.
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::ParameterOwned` if the parameter already belongs to a collection.
    pub fn add(&mut self, param: Parameter) -> Result<usize, Db2Error> {
        let param = self.adopt(param, self.items.len() + 1)?;
        self.items.push(param);
        self.lookup.invalidate();
        Ok(self.items.len() - 1)
    }

    /// # Errors
    ///
    /// Never fails for a fresh parameter; kept fallible to match [`add`](Self::add).
    pub fn add_with_value(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<usize, Db2Error> {
        self.add(Parameter::new(name, value))
    }

    /// # Errors
    ///
    /// Returns `Db2Error::ParameterIndexOutOfRange` past the end, or `Db2Error::ParameterOwned`.
    pub fn insert(&mut self, index: usize, param: Parameter) -> Result<(), Db2Error> {
        if index > self.items.len() {
            return Err(Db2Error::ParameterIndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        let param = self.adopt(param, self.items.len() + 1)?;
        self.items.insert(index, param);
        self.lookup.invalidate();
        Ok(())
    }

    /// Replace the parameter at `index`, returning the old one detached.
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::ParameterIndexOutOfRange` or `Db2Error::ParameterOwned`.
    pub fn set(&mut self, index: usize, param: Parameter) -> Result<Parameter, Db2Error> {
        let len = self.items.len();
        if index >= len {
            return Err(Db2Error::ParameterIndexOutOfRange { index, len });
        }
        let param = self.adopt(param, index + 1)?;
        let old = std::mem::replace(&mut self.items[index], param);
        self.lookup.invalidate();
        Ok(Self::release(old))
    }

    /// # Errors
    ///
    /// Returns `Db2Error::ParameterNotFound` or `Db2Error::ParameterOwned`.
    pub fn set_by_name(&mut self, name: &str, param: Parameter) -> Result<Parameter, Db2Error> {
        let index = self.require_index(name)?;
        self.set(index, param)
    }

    /// # Errors
    ///
    /// Returns `Db2Error::ParameterIndexOutOfRange` past the end.
    pub fn remove_at(&mut self, index: usize) -> Result<Parameter, Db2Error> {
        let len = self.items.len();
        if index >= len {
            return Err(Db2Error::ParameterIndexOutOfRange { index, len });
        }
        let removed = self.items.remove(index);
        self.lookup.invalidate();
        Ok(Self::release(removed))
    }

    /// # Errors
    ///
    /// Returns `Db2Error::ParameterNotFound` when no parameter carries `name`.
    pub fn remove(&mut self, name: &str) -> Result<Parameter, Db2Error> {
        let index = self.require_index(name)?;
        self.remove_at(index)
    }

    /// Remove the parameter equal to `param`, which must be one this collection holds.
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::ParameterNotOwned` otherwise.
    pub fn remove_param(&mut self, param: &Parameter) -> Result<Parameter, Db2Error> {
        let index = self.position_of(param).ok_or(Db2Error::ParameterNotOwned)?;
        self.remove_at(index)
    }

    /// Index of a parameter held by this collection.
    #[must_use]
    pub fn position_of(&self, param: &Parameter) -> Option<usize> {
        if param.owner != Some(self.id) {
            return None;
        }
        self.items.iter().position(|p| p == param)
    }

    pub fn clear(&mut self) {
        for param in &mut self.items {
            param.owner = None;
        }
        self.items.clear();
        self.lookup.invalidate();
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Resolve a name (with or without sigil); exact match wins over case-insensitive.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.index_of(&self.items, name)
    }

    fn require_index(&self, name: &str) -> Result<usize, Db2Error> {
        self.index_of(name)
            .ok_or_else(|| Db2Error::ParameterNotFound(name.to_string()))
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Parameter> {
        self.items.get(index)
    }

    /// # Errors
    ///
    /// Returns `Db2Error::ParameterNotFound` when no parameter carries `name`.
    pub fn get_by_name(&self, name: &str) -> Result<&Parameter, Db2Error> {
        let index = self.require_index(name)?;
        Ok(&self.items[index])
    }

    #[must_use]
    pub fn try_get(&self, name: &str) -> Option<&Parameter> {
        self.index_of(name).map(|index| &self.items[index])
    }

    /// Mutable access; name lookups are rebuilt afterwards.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Parameter> {
        self.lookup.invalidate();
        self.items.get_mut(index)
    }

    /// # Errors
    ///
    /// Returns `Db2Error::ParameterNotFound` when no parameter carries `name`.
    pub fn get_mut_by_name(&mut self, name: &str) -> Result<&mut Parameter, Db2Error> {
        let index = self.require_index(name)?;
        self.lookup.invalidate();
        Ok(&mut self.items[index])
    }

    /// # Errors
    ///
    /// Returns `Db2Error::ParameterIndexOutOfRange` past the end.
    pub fn rename(&mut self, index: usize, name: impl Into<String>) -> Result<(), Db2Error> {
        let len = self.items.len();
        let param = self
            .items
            .get_mut(index)
            .ok_or(Db2Error::ParameterIndexOutOfRange { index, len })?;
        param.set_name(name);
        self.lookup.invalidate();
        Ok(())
    }
}

impl Index<usize> for ParameterCollection {
    type Output = Parameter;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl<'a> IntoIterator for &'a ParameterCollection {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_names_blank_and_bare_sigil() {
        let mut params = ParameterCollection::new();
        params.add_with_value(":A", 1_i32).unwrap();
        params.add_with_value("  ", 2_i32).unwrap();
        params.add_with_value(":", 3_i32).unwrap();
        assert_eq!(params[1].name(), ":Parameter2");
        assert_eq!(params[2].name(), ":Parameter3");
        assert!(params[2].is_auto_named());
        assert!(!params[0].is_auto_named());
    }

    #[test]
    fn rejects_parameter_owned_elsewhere() {
        let mut first = ParameterCollection::new();
        let mut second = ParameterCollection::new();
        first.add_with_value(":A", 1_i32).unwrap();
        let stolen = first[0].clone();
        assert!(matches!(second.add(stolen), Err(Db2Error::ParameterOwned)));
        assert!(second.add(first[0].duplicate()).is_ok());
    }

    #[test]
    fn removed_parameter_can_move() {
        let mut first = ParameterCollection::new();
        let mut second = ParameterCollection::new();
        first.add_with_value(":A", 1_i32).unwrap();
        let moved = first.remove(":a").unwrap();
        assert!(!moved.is_owned());
        second.add(moved).unwrap();
        assert!(first.is_empty());
        assert!(second.contains("A"));
    }

    #[test]
    fn remove_missing_name_is_an_error() {
        let mut params = ParameterCollection::new();
        assert!(matches!(params.remove("nope"), Err(Db2Error::ParameterNotFound(n)) if n == "nope"));
    }

    #[test]
    fn remove_param_requires_membership() {
        let mut params = ParameterCollection::new();
        params.add_with_value(":A", 1_i32).unwrap();
        let foreign = Parameter::new(":A", 1_i32);
        assert!(matches!(params.remove_param(&foreign), Err(Db2Error::ParameterNotOwned)));
        let member = params[0].clone();
        assert!(params.remove_param(&member).is_ok());
    }

    #[test]
    fn lookups_follow_renames_and_mutations() {
        let mut params = ParameterCollection::new();
        for name in [":a", ":b", ":c", ":d", ":e", ":f"] {
            params.add_with_value(name, Value::Null).unwrap();
        }
        assert_eq!(params.index_of("c"), Some(2));
        params.rename(2, ":zz").unwrap();
        assert_eq!(params.index_of("c"), None);
        assert_eq!(params.index_of("ZZ"), Some(2));
        params.get_mut(0).unwrap().set_name(":q");
        assert_eq!(params.index_of("q"), Some(0));
        params.remove_at(0).unwrap();
        assert_eq!(params.index_of("zz"), Some(1));
    }

    #[test]
    fn insert_and_set_keep_ownership_rules() {
        let mut params = ParameterCollection::new();
        params.add_with_value(":a", 1_i32).unwrap();
        params.insert(0, Parameter::new(":b", 2_i32)).unwrap();
        assert_eq!(params.index_of("b"), Some(0));
        let old = params.set(1, Parameter::new(":c", 3_i32)).unwrap();
        assert_eq!(old.name(), ":a");
        assert!(!old.is_owned());
        assert!(matches!(
            params.insert(9, Parameter::new(":d", 4_i32)),
            Err(Db2Error::ParameterIndexOutOfRange { index: 9, len: 2 })
        ));
        assert_eq!(params.try_get("C").map(Parameter::value), Some(&Value::Int32(3)));
    }

    #[test]
    fn clear_releases_everything() {
        let mut params = ParameterCollection::new();
        params.add_with_value(":a", 1_i32).unwrap();
        params.clear();
        assert!(params.is_empty());
        assert!(!params.contains("a"));
    }
}
