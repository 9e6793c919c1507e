// Copyright (c) 2025 - Cowboy AI, Inc.
//! Device Type Taxonomy
//!
//! Two-level classification of devices as stored in the address manager:
//! a [`DeviceType`] owns any number of [`DeviceSubtype`]s, keyed by name.
//! [`Taxonomy`] is the per-run working set of resolved types.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use super::EntityId;

/// Taxonomy consistency error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("Subtype '{subtype}' has parent {parent_id}, expected device type '{device_type}' ({type_id})")]
    ParentMismatch {
        subtype: String,
        parent_id: EntityId,
        device_type: String,
        type_id: EntityId,
    },
}

/// Device subtype, always bound to the remote id of its parent type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceSubtype {
    name: String,
    id: EntityId,
    parent_id: EntityId,
}

impl DeviceSubtype {
    pub fn new(name: impl Into<String>, id: EntityId, parent_id: EntityId) -> Self {
        Self {
            name: name.into(),
            id,
            parent_id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn parent_id(&self) -> EntityId {
        self.parent_id
    }
}

impl fmt::Display for DeviceSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Device type with its subtypes
///
/// Invariant: every subtype in `subtypes` has `parent_id == self.id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceType {
    name: String,
    id: EntityId,
    subtypes: HashMap<String, DeviceSubtype>,
}

impl DeviceType {
    pub fn new(name: impl Into<String>, id: EntityId) -> Self {
        Self {
            name: name.into(),
            id,
            subtypes: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn subtypes(&self) -> &HashMap<String, DeviceSubtype> {
        &self.subtypes
    }

    pub fn subtype(&self, name: &str) -> Option<&DeviceSubtype> {
        self.subtypes.get(name)
    }

    /// Whether `subtype` is the very subtype registered under its name here
    pub fn contains(&self, subtype: &DeviceSubtype) -> bool {
        self.subtypes.get(subtype.name()) == Some(subtype)
    }

    /// Register a subtype
    ///
    /// Returns `Ok(false)` without touching the map when a subtype of the same
    /// name is already present.
    pub fn add(&mut self, child: DeviceSubtype) -> Result<bool, TaxonomyError> {
        if child.parent_id != self.id {
            return Err(TaxonomyError::ParentMismatch {
                subtype: child.name,
                parent_id: child.parent_id,
                device_type: self.name.clone(),
                type_id: self.id,
            });
        }

        if self.subtypes.contains_key(&child.name) {
            return Ok(false);
        }

        self.subtypes.insert(child.name.clone(), child);
        Ok(true)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Working set of device types resolved during one run, keyed by
/// normalized type name
#[derive(Debug, Clone, Default, Serialize)]
pub struct Taxonomy {
    types: HashMap<String, DeviceType>,
}

impl Taxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&DeviceType> {
        self.types.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DeviceType> {
        self.types.get_mut(name)
    }

    /// Look up a (type, subtype) pair
    pub fn classify(&self, type_name: &str, subtype_name: &str) -> Option<(&DeviceType, &DeviceSubtype)> {
        let device_type = self.types.get(type_name)?;
        let subtype = device_type.subtype(subtype_name)?;
        Some((device_type, subtype))
    }

    /// Insert a type unless one with the same name is already present.
    /// Returns the entry stored under that name.
    pub fn insert(&mut self, device_type: DeviceType) -> &mut DeviceType {
        self.types
            .entry(device_type.name.clone())
            .or_insert(device_type)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Types sorted by name
    pub fn types(&self) -> Vec<&DeviceType> {
        let mut types: Vec<_> = self.types.values().collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_subtype() {
        let mut router = DeviceType::new("Router", 10);
        assert_eq!(router.add(DeviceSubtype::new("Core", 11, 10)), Ok(true));
        assert_eq!(router.subtype("Core").map(DeviceSubtype::id), Some(11));
    }

    #[test]
    fn test_add_subtype_idempotent() {
        let mut router = DeviceType::new("Router", 10);
        router.add(DeviceSubtype::new("Core", 11, 10)).unwrap();

        // Same name, different id: first registration wins
        assert_eq!(router.add(DeviceSubtype::new("Core", 99, 10)), Ok(false));
        assert_eq!(router.subtypes().len(), 1);
        assert_eq!(router.subtype("Core").map(DeviceSubtype::id), Some(11));
    }

    #[test]
    fn test_add_subtype_wrong_parent() {
        let mut router = DeviceType::new("Router", 10);
        let err = router.add(DeviceSubtype::new("Core", 11, 20)).unwrap_err();
        assert!(matches!(err, TaxonomyError::ParentMismatch { parent_id: 20, type_id: 10, .. }));
        assert!(router.subtypes().is_empty());
    }

    #[test]
    fn test_contains() {
        let mut router = DeviceType::new("Router", 10);
        let core = DeviceSubtype::new("Core", 11, 10);
        router.add(core.clone()).unwrap();

        assert!(router.contains(&core));
        assert!(!router.contains(&DeviceSubtype::new("Core", 12, 10)));
        assert!(!router.contains(&DeviceSubtype::new("Edge", 13, 10)));
    }

    #[test]
    fn test_taxonomy_insert_keeps_first() {
        let mut taxonomy = Taxonomy::new();
        taxonomy.insert(DeviceType::new("Switch", 1));
        let stored = taxonomy.insert(DeviceType::new("Switch", 2));
        assert_eq!(stored.id(), 1);
        assert_eq!(taxonomy.len(), 1);
    }

    #[test]
    fn test_classify() {
        let mut taxonomy = Taxonomy::new();
        let switch = taxonomy.insert(DeviceType::new("Switch", 1));
        switch.add(DeviceSubtype::new("Access", 2, 1)).unwrap();

        let (device_type, subtype) = taxonomy.classify("Switch", "Access").unwrap();
        assert_eq!(device_type.id(), 1);
        assert_eq!(subtype.id(), 2);
        assert!(taxonomy.classify("Switch", "Core").is_none());
        assert!(taxonomy.classify("Router", "Access").is_none());
    }
}
