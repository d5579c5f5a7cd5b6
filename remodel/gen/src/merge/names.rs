//! Resolution of current type names.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use super::marker::RenameMap;
use crate::errors::RemodelError;
use crate::naming::unique_name;
use crate::synth::ModelClassRecord;

/// Resolved canonical name → current type name for one regeneration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    names: BTreeMap<String, String>,
}

/// A rename that was adopted or dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub canonical: String,
    pub name: String,
}

/// What happened to the recorded names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameReport {
    /// Recorded names that differ from the default and were kept.
    pub carried: Vec<Rename>,
    /// Recorded names whose schema no longer exists.
    pub dropped: Vec<Rename>,
}

impl NameTable {
    /// Resolves current names for `models`.
    ///
    /// Recorded names win; remaining models get their default name, suffixed
    /// with a number when it is already taken. Defaults are assigned in
    /// canonical order so the result does not depend on document order.
    ///
    /// ## Errors
    ///
    /// [`RemodelError::MergeConsistency`] if two surviving schemas were
    /// recorded under the same type name.
    pub fn resolve(
        api: &str,
        models: &BTreeMap<String, ModelClassRecord>,
        renames: &RenameMap,
    ) -> Result<(Self, RenameReport), RemodelError> {
        let mut names = BTreeMap::new();
        let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
        let mut report = RenameReport::default();

        for (canonical, recorded) in renames.iter() {
            let Some(model) = models.get(canonical) else {
                warn!(api, schema = canonical, name = recorded, "schema is gone, dropping its type name");
                report.dropped.push(Rename {
                    canonical: canonical.to_string(),
                    name: recorded.to_string(),
                });
                continue;
            };
            if let Some(other) = owners.insert(recorded, canonical) {
                return Err(RemodelError::consistency(
                    api,
                    format!("type name `{recorded}` is recorded for both {other} and {canonical}"),
                ));
            }
            if recorded != model.current_name {
                debug!(api, schema = canonical, name = recorded, "keeping renamed type");
                report.carried.push(Rename {
                    canonical: canonical.to_string(),
                    name: recorded.to_string(),
                });
            }
            names.insert(canonical.to_string(), recorded.to_string());
        }

        let mut taken: BTreeSet<String> = owners.keys().map(|name| name.to_string()).collect();
        for (canonical, model) in models {
            if !names.contains_key(canonical) {
                let name = unique_name(&model.current_name, "", &mut taken);
                names.insert(canonical.clone(), name);
            }
        }

        Ok((Self { names }, report))
    }

    /// Current name of the model with the given canonical name.
    pub fn get(&self, canonical: &str) -> Option<&str> {
        self.names.get(canonical).map(String::as_str)
    }

    /// Like [`NameTable::get`], failing with a consistency error.
    pub fn require(&self, api: &str, canonical: &str) -> Result<&str, RemodelError> {
        self.get(canonical)
            .ok_or_else(|| RemodelError::consistency(api, format!("no type name for schema {canonical}")))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(c, n)| (c.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The same mapping as a [`RenameMap`], for comparison with a re-parsed module.
    pub fn to_rename_map(&self) -> RenameMap {
        self.names.clone().into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{ModelKind, TypeRef};

    const API: &str = "widgets/v1";

    fn model(canonical: &str, default: &str) -> (String, ModelClassRecord) {
        (
            canonical.to_string(),
            ModelClassRecord {
                canonical_name: canonical.to_string(),
                current_name: default.to_string(),
                description: None,
                kind: ModelKind::Alias(TypeRef::String),
            },
        )
    }

    fn renames(entries: &[(&str, &str)]) -> RenameMap {
        entries
            .iter()
            .map(|(c, n)| (c.to_string(), n.to_string()))
            .collect()
    }

    #[test]
    fn defaults_without_renames() {
        let models = BTreeMap::from([model("Widget", "Widget"), model("Thing", "Thing")]);
        let (table, report) = NameTable::resolve(API, &models, &RenameMap::default()).unwrap();
        assert_eq!(table.get("Widget"), Some("Widget"));
        assert_eq!(table.get("Thing"), Some("Thing"));
        assert_eq!(report, RenameReport::default());
    }

    #[test]
    fn recorded_names_win() {
        let models = BTreeMap::from([model("Widget", "Widget")]);
        let (table, report) =
            NameTable::resolve(API, &models, &renames(&[("Widget", "Gadget")])).unwrap();
        assert_eq!(table.get("Widget"), Some("Gadget"));
        assert_eq!(report.carried.len(), 1);
        assert_eq!(report.carried[0].name, "Gadget");
    }

    #[test]
    fn unchanged_recorded_names_are_not_reported() {
        let models = BTreeMap::from([model("Widget", "Widget")]);
        let (_, report) =
            NameTable::resolve(API, &models, &renames(&[("Widget", "Widget")])).unwrap();
        assert!(report.carried.is_empty());
    }

    #[test]
    #[tracing_test::traced_test]
    fn dead_renames_are_dropped() {
        let models = BTreeMap::from([model("Thing", "Thing")]);
        let (table, report) =
            NameTable::resolve(API, &models, &renames(&[("Widget", "Gadget")])).unwrap();
        assert_eq!(table.get("Widget"), None);
        assert_eq!(
            report.dropped,
            vec![Rename {
                canonical: "Widget".into(),
                name: "Gadget".into()
            }]
        );
        assert!(logs_contain("schema is gone, dropping its type name"));
    }

    #[test]
    fn defaults_yield_to_recorded_names() {
        // `Thing` was renamed to `Widget`; the new `Widget` schema must not collide.
        let models = BTreeMap::from([model("Thing", "Thing"), model("Widget", "Widget")]);
        let (table, _) =
            NameTable::resolve(API, &models, &renames(&[("Thing", "Widget")])).unwrap();
        assert_eq!(table.get("Thing"), Some("Widget"));
        assert_eq!(table.get("Widget"), Some("Widget2"));
    }

    #[test]
    fn colliding_defaults_are_numbered_in_canonical_order() {
        let models = BTreeMap::from([
            model("#/paths/~1a/get/responses/200/content/application~1json/schema", "AGetResponse"),
            model("#/paths/~1a~1/get/responses/200/content/application~1json/schema", "AGetResponse"),
        ]);
        let (table, _) = NameTable::resolve(API, &models, &RenameMap::default()).unwrap();
        let names: Vec<_> = table.iter().map(|(_, name)| name).collect();
        assert_eq!(names, vec!["AGetResponse", "AGetResponse2"]);
    }

    #[test]
    fn duplicate_recorded_name_is_inconsistent() {
        let models = BTreeMap::from([model("Thing", "Thing"), model("Widget", "Widget")]);
        let err = NameTable::resolve(
            API,
            &models,
            &renames(&[("Thing", "Gadget"), ("Widget", "Gadget")]),
        )
        .unwrap_err();
        assert!(matches!(err, RemodelError::MergeConsistency { .. }));
    }
}
