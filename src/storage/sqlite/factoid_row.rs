//! Row conversion for the `factoids` table.

use crate::models::{Chance, Factoid, FactoidId, FactoidKind, Provenance};
use crate::{Error, Result};
use rusqlite::Row;

/// Column list shared by every `SELECT` on the `factoids` table.
pub const FACTOID_COLUMNS: &str =
    "id, key, value, kind, chance, created, modified, accessed, access_count";

/// Raw column values for one factoid.
#[derive(Debug)]
pub struct FactoidRow {
    /// Factoid id.
    pub id: String,
    /// Normalized key.
    pub key: String,
    /// Display value.
    pub value: String,
    /// Kind name.
    pub kind: String,
    /// Emission probability.
    pub chance: f64,
    /// JSON-encoded creation provenance.
    pub created: String,
    /// JSON-encoded modification provenance.
    pub modified: String,
    /// JSON-encoded access provenance.
    pub accessed: String,
    /// Recall counter.
    pub access_count: i64,
}

impl FactoidRow {
    /// Reads a row selected with [`FACTOID_COLUMNS`].
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            key: row.get(1)?,
            value: row.get(2)?,
            kind: row.get(3)?,
            chance: row.get(4)?,
            created: row.get(5)?,
            modified: row.get(6)?,
            accessed: row.get(7)?,
            access_count: row.get(8)?,
        })
    }

    /// Encodes a factoid for storage.
    pub fn encode(factoid: &Factoid) -> Result<Self> {
        Ok(Self {
            id: factoid.id.as_str().to_string(),
            key: factoid.key.clone(),
            value: factoid.value.clone(),
            kind: factoid.kind.as_str().to_string(),
            chance: factoid.chance.value(),
            created: encode_provenance(&factoid.created)?,
            modified: encode_provenance(&factoid.modified)?,
            accessed: encode_provenance(&factoid.accessed)?,
            access_count: i64::try_from(factoid.access_count).unwrap_or(i64::MAX),
        })
    }

    /// Decodes the row into a factoid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if a stored column is corrupt.
    pub fn into_factoid(self) -> Result<Factoid> {
        let kind = FactoidKind::parse(&self.kind)
            .ok_or_else(|| Error::store("decode_factoid", format!("unknown kind '{}'", self.kind)))?;
        let chance = Chance::new(self.chance).map_err(|e| Error::store("decode_factoid", e))?;

        Ok(Factoid {
            id: FactoidId::new(self.id),
            key: self.key,
            value: self.value,
            kind,
            chance,
            created: decode_provenance(&self.created)?,
            modified: decode_provenance(&self.modified)?,
            accessed: decode_provenance(&self.accessed)?,
            access_count: u64::try_from(self.access_count).unwrap_or(0),
        })
    }
}

fn encode_provenance(provenance: &Provenance) -> Result<String> {
    serde_json::to_string(provenance).map_err(|e| Error::store("encode_provenance", e))
}

fn decode_provenance(raw: &str) -> Result<Provenance> {
    serde_json::from_str(raw).map_err(|e| Error::store("decode_provenance", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScopeId, Speaker};

    fn sample() -> Factoid {
        let provenance =
            Provenance::now(&Speaker::new("alice", "al", "host"), &ScopeId::new("#c"));
        let mut fact = Factoid::new("tea", "<action> pours tea", provenance);
        fact.chance = Chance::new(0.4).unwrap();
        fact.access_count = 3;
        fact
    }

    #[test]
    fn test_encode_then_decode_preserves_factoid() {
        let fact = sample();
        let row = FactoidRow::encode(&fact).unwrap();
        assert_eq!(row.kind, "action");
        assert_eq!(row.into_factoid().unwrap(), fact);
    }

    #[test]
    fn test_decode_rejects_corrupt_chance() {
        let mut row = FactoidRow::encode(&sample()).unwrap();
        row.chance = 3.0;
        assert!(matches!(
            row.into_factoid(),
            Err(Error::StoreUnavailable { ref operation, .. }) if operation == "decode_factoid"
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let mut row = FactoidRow::encode(&sample()).unwrap();
        row.kind = "song".to_string();
        assert!(row.into_factoid().is_err());
    }
}
