//! Assemblage de la table de passage : jointure des libellés et tri

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::aggregate::resolve_codes;
use crate::types::{
    CrosswalkRow, Dataset, UnitAttributes, UnitCode, UnitLabel, UnitRole, WeightedCorrespondence,
};
use crate::CrosswalkError;

/// Libellés par code, construits depuis les enregistrements avant agrégation
#[derive(Debug, Clone)]
pub struct AttributeTable {
    role: UnitRole,
    entries: BTreeMap<UnitCode, UnitAttributes>,
    conflicts: usize,
}

impl AttributeTable {
    /// Construit la table d'une année.
    ///
    /// Si plusieurs enregistrements d'un même code portent des libellés
    /// différents, le plus petit n-uplet (préfecture, ville, district) est retenu.
    pub fn from_dataset(dataset: &Dataset, role: UnitRole) -> Result<Self, CrosswalkError> {
        let codes = resolve_codes(dataset)?;

        let mut entries: BTreeMap<UnitCode, UnitAttributes> = BTreeMap::new();
        let mut conflicting: Vec<UnitCode> = Vec::new();

        for (code, record) in codes.into_iter().zip(&dataset.records) {
            let attributes = UnitAttributes {
                prefecture: record.prefecture.clone(),
                city: record.city.clone(),
                district: record
                    .district
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string),
            };

            match entries.entry(code) {
                Entry::Vacant(slot) => {
                    slot.insert(attributes);
                }
                Entry::Occupied(mut slot) => {
                    if slot.get() != &attributes {
                        if !conflicting.contains(slot.key()) {
                            conflicting.push(slot.key().clone());
                        }
                        if attributes < *slot.get() {
                            slot.insert(attributes);
                        }
                    }
                }
            }
        }

        for code in &conflicting {
            warn!(code = %code, role = %role, "Records disagree on unit names");
        }

        Ok(Self {
            role,
            entries,
            conflicts: conflicting.len(),
        })
    }

    pub fn role(&self) -> UnitRole {
        self.role
    }

    pub fn get(&self, code: &UnitCode) -> Option<&UnitAttributes> {
        self.entries.get(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nombre de codes dont les libellés divergent
    pub fn conflicts(&self) -> usize {
        self.conflicts
    }

    fn label(&self, code: &UnitCode, placeholder: &str) -> Result<UnitLabel, CrosswalkError> {
        let attributes = self.get(code).ok_or_else(|| CrosswalkError::UnresolvedCode {
            code: code.to_string(),
            role: self.role,
        })?;

        Ok(UnitLabel {
            code: code.clone(),
            prefecture: attributes.prefecture.clone(),
            city: attributes.city.clone(),
            district: attributes
                .district
                .clone()
                .unwrap_or_else(|| placeholder.to_string()),
        })
    }
}

/// Joint les libellés des deux années et ordonne les lignes.
///
/// Ordre : code de référence croissant, poids décroissant, code cible croissant.
/// Le poids est recopié sans modification.
pub fn assemble(
    correspondences: &[WeightedCorrespondence],
    reference: &AttributeTable,
    target: &AttributeTable,
    placeholder: &str,
) -> Result<Vec<CrosswalkRow>, CrosswalkError> {
    let mut rows = correspondences
        .iter()
        .map(|c| {
            Ok(CrosswalkRow {
                reference: reference.label(&c.reference_code, placeholder)?,
                target: target.label(&c.target_code, placeholder)?,
                weight: c.weight,
            })
        })
        .collect::<Result<Vec<_>, CrosswalkError>>()?;

    rows.sort_by(|a, b| {
        a.reference
            .code
            .cmp(&b.reference.code)
            .then_with(|| b.weight.total_cmp(&a.weight))
            .then_with(|| a.target.code.cmp(&b.target.code))
    });

    info!(rows = rows.len(), "Assembled crosswalk");
    Ok(rows)
}
