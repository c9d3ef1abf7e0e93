//! Command parameters and the ordered parameter collection.

use crate::error::{FakeDbError, FakeDbResult};
use crate::types::ParameterDirection;
use crate::value::DbValue;

/// A single command parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FakeDbParameter {
    pub name: String,
    pub value: DbValue,
    pub direction: ParameterDirection,
    pub size: usize,
    pub is_nullable: bool,
    pub source_column: String,
}

impl FakeDbParameter {
    /// Create an input parameter.
    pub fn new(name: impl Into<String>, value: impl Into<DbValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Set the direction.
    pub fn direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Set the size.
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Mark the parameter nullable.
    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }
}

/// Strip leading `:` / `@` sigils, so `@id`, `:id` and `id` name the same parameter.
fn normalized_name(name: &str) -> &str {
    name.trim_start_matches([':', '@'])
}

/// Ordered collection of command parameters.
///
/// Names are not unique; every name lookup resolves to the first match in
/// insertion order, comparing sigil-stripped names case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeDbParameterCollection {
    parameters: Vec<FakeDbParameter>,
}

impl FakeDbParameterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Append a parameter and return its index.
    pub fn add(&mut self, parameter: FakeDbParameter) -> usize {
        self.parameters.push(parameter);
        self.parameters.len() - 1
    }

    /// Shortcut for `add(FakeDbParameter::new(name, value))`.
    pub fn add_with_value(&mut self, name: impl Into<String>, value: impl Into<DbValue>) -> usize {
        self.add(FakeDbParameter::new(name, value))
    }

    pub fn add_range(&mut self, parameters: impl IntoIterator<Item = FakeDbParameter>) {
        self.parameters.extend(parameters);
    }

    /// Insert at `index`, shifting later parameters.
    pub fn insert(&mut self, index: usize, parameter: FakeDbParameter) -> FakeDbResult<()> {
        if index > self.parameters.len() {
            return Err(self.out_of_range(index));
        }
        self.parameters.insert(index, parameter);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.parameters.clear();
    }

    /// Position of the first parameter whose normalized name matches.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        let wanted = normalized_name(name).to_lowercase();
        self.parameters
            .iter()
            .position(|p| normalized_name(&p.name).to_lowercase() == wanted)
    }

    /// Position of the first parameter whose value equals `value`.
    pub fn index_of_value(&self, value: &DbValue) -> Option<usize> {
        self.parameters.iter().position(|p| &p.value == value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn contains_value(&self, value: &DbValue) -> bool {
        self.index_of_value(value).is_some()
    }

    /// Remove the first parameter equal to `parameter`; returns whether one was found.
    pub fn remove(&mut self, parameter: &FakeDbParameter) -> bool {
        match self.parameters.iter().position(|p| p == parameter) {
            Some(index) => {
                self.parameters.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn remove_at(&mut self, index: usize) -> FakeDbResult<FakeDbParameter> {
        if index >= self.parameters.len() {
            return Err(self.out_of_range(index));
        }
        Ok(self.parameters.remove(index))
    }

    pub fn remove_named(&mut self, name: &str) -> FakeDbResult<FakeDbParameter> {
        let index = self.require_index(name)?;
        Ok(self.parameters.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&FakeDbParameter> {
        self.parameters.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut FakeDbParameter> {
        self.parameters.get_mut(index)
    }

    pub fn get_named(&self, name: &str) -> FakeDbResult<&FakeDbParameter> {
        let index = self.require_index(name)?;
        Ok(&self.parameters[index])
    }

    /// Replace the parameter at `index`.
    pub fn set(&mut self, index: usize, parameter: FakeDbParameter) -> FakeDbResult<()> {
        let count = self.parameters.len();
        let slot = self
            .parameters
            .get_mut(index)
            .ok_or(FakeDbError::IndexOutOfRange { index, count })?;
        *slot = parameter;
        Ok(())
    }

    /// Replace the first parameter matching `name`.
    pub fn set_named(&mut self, name: &str, parameter: FakeDbParameter) -> FakeDbResult<()> {
        let index = self.require_index(name)?;
        self.parameters[index] = parameter;
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FakeDbParameter> {
        self.parameters.iter()
    }

    fn require_index(&self, name: &str) -> FakeDbResult<usize> {
        self.index_of(name).ok_or_else(|| FakeDbError::UnknownParameter {
            name: name.to_string(),
            available: self.parameters.iter().map(|p| p.name.clone()).collect(),
        })
    }

    fn out_of_range(&self, index: usize) -> FakeDbError {
        FakeDbError::IndexOutOfRange {
            index,
            count: self.parameters.len(),
        }
    }
}

impl std::ops::Index<usize> for FakeDbParameterCollection {
    type Output = FakeDbParameter;

    fn index(&self, index: usize) -> &FakeDbParameter {
        &self.parameters[index]
    }
}

impl<'a> IntoIterator for &'a FakeDbParameterCollection {
    type Item = &'a FakeDbParameter;
    type IntoIter = std::slice::Iter<'a, FakeDbParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.parameters.iter()
    }
}

impl FromIterator<FakeDbParameter> for FakeDbParameterCollection {
    fn from_iter<I: IntoIterator<Item = FakeDbParameter>>(iter: I) -> Self {
        Self {
            parameters: iter.into_iter().collect(),
        }
    }
}
