//! Partition keys
//!
//! A partition is addressed by `(prefix, entity, fiscal year)`. The entity is
//! normally a five digit facility code; [`ALL_ENTITIES`] marks the
//! consolidated partition covering every entity.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity value naming the consolidated partition
pub const ALL_ENTITIES: &str = "_all_";

/// Length of a well-formed entity code
pub const ENTITY_CODE_LEN: usize = 5;

/// File extension of partition files
pub const PARTITION_EXTENSION: &str = "parquet";

/// Entity (facility) code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityCode(String);

impl EntityCode {
    /// Create entity code
    #[inline]
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Consolidated sentinel
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self(ALL_ENTITIES.to_string())
    }

    /// Whether this is the consolidated sentinel
    #[inline]
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.0 == ALL_ENTITIES
    }

    /// Five ASCII digits, or the sentinel
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.is_all()
            || (self.0.len() == ENTITY_CODE_LEN && self.0.bytes().all(|b| b.is_ascii_digit()))
    }

    /// Code as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for EntityCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

/// Four digit fiscal (budget) year
///
/// Accepted from configuration as either a number or a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "YearRepr", into = "u16")]
pub struct FiscalYear(u16);

impl FiscalYear {
    /// Create fiscal year
    ///
    /// # Errors
    /// `StoreError::InvalidKey` unless `year` has exactly four digits.
    pub fn new(year: u16) -> StoreResult<Self> {
        if (1000..=9999).contains(&year) {
            Ok(Self(year))
        } else {
            Err(StoreError::InvalidKey(format!(
                "fiscal year must have four digits, got {year}"
            )))
        }
    }

    /// Year as number
    #[inline]
    #[must_use]
    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FiscalYear {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let year = trimmed
            .parse::<u16>()
            .map_err(|_| StoreError::InvalidKey(format!("invalid fiscal year '{trimmed}'")))?;
        Self::new(year)
    }
}

impl From<FiscalYear> for u16 {
    fn from(year: FiscalYear) -> Self {
        year.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum YearRepr {
    Number(u16),
    Text(String),
}

impl TryFrom<YearRepr> for FiscalYear {
    type Error = StoreError;

    fn try_from(repr: YearRepr) -> Result<Self, Self::Error> {
        match repr {
            YearRepr::Number(year) => Self::new(year),
            YearRepr::Text(text) => text.parse(),
        }
    }
}

/// Full partition address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    prefix: String,
    entity: EntityCode,
    year: FiscalYear,
}

impl PartitionKey {
    /// Create partition key
    ///
    /// An entity that is neither five digits nor the sentinel is accepted
    /// with a warning.
    ///
    /// # Errors
    /// `StoreError::InvalidKey` when the prefix is empty or contains a path
    /// separator.
    pub fn new(
        prefix: impl Into<String>,
        entity: impl Into<EntityCode>,
        year: FiscalYear,
    ) -> StoreResult<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        let entity = entity.into();
        if !entity.is_well_formed() {
            tracing::warn!(%prefix, %entity, "entity code is not five digits");
        }
        Ok(Self {
            prefix,
            entity,
            year,
        })
    }

    /// Key of the consolidated partition
    ///
    /// # Errors
    /// Same as [`PartitionKey::new`].
    pub fn consolidated(prefix: impl Into<String>, year: FiscalYear) -> StoreResult<Self> {
        Self::new(prefix, EntityCode::all(), year)
    }

    /// Dataset prefix
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Entity code
    #[inline]
    #[must_use]
    pub fn entity(&self) -> &EntityCode {
        &self.entity
    }

    /// Fiscal year
    #[inline]
    #[must_use]
    pub fn year(&self) -> FiscalYear {
        self.year
    }

    /// File name: `{prefix}_{entity}_{year}.parquet`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.{PARTITION_EXTENSION}",
            self.prefix, self.entity, self.year
        )
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.year, self.prefix, self.entity)
    }
}

fn validate_prefix(prefix: &str) -> StoreResult<()> {
    if prefix.is_empty() {
        return Err(StoreError::InvalidKey("dataset prefix is empty".to_string()));
    }
    if prefix.contains(['/', '\\']) || prefix == "." || prefix == ".." {
        return Err(StoreError::InvalidKey(format!(
            "dataset prefix '{prefix}' is not a plain name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn year(y: u16) -> FiscalYear {
        FiscalYear::new(y).unwrap()
    }

    #[test]
    fn entity_code_shapes() {
        assert!(EntityCode::new("10669").is_well_formed());
        assert!(EntityCode::all().is_well_formed());
        assert!(!EntityCode::new("1066").is_well_formed());
        assert!(!EntityCode::new("1066a").is_well_formed());
        assert!(!EntityCode::new("106690").is_well_formed());
    }

    #[test]
    fn malformed_entity_is_still_accepted() {
        let key = PartitionKey::new("s_anc", "abc", year(2024)).unwrap();
        assert_eq!(key.file_name(), "s_anc_abc_2024.parquet");
    }

    #[test]
    fn file_name_layout() {
        let key = PartitionKey::new("s_anc", "10669", year(2024)).unwrap();
        assert_eq!(key.file_name(), "s_anc_10669_2024.parquet");

        let all = PartitionKey::consolidated("s_anc", year(2024)).unwrap();
        assert_eq!(all.file_name(), "s_anc__all__2024.parquet");
        assert!(all.entity().is_all());
    }

    #[test]
    fn prefix_must_be_plain() {
        assert!(PartitionKey::new("", "10669", year(2024)).is_err());
        assert!(PartitionKey::new("a/b", "10669", year(2024)).is_err());
        assert!(PartitionKey::new("..", "10669", year(2024)).is_err());
    }

    #[test]
    fn fiscal_year_parsing() {
        assert_eq!(" 2024 ".parse::<FiscalYear>().unwrap().get(), 2024);
        assert!("24".parse::<FiscalYear>().is_err());
        assert!("twenty".parse::<FiscalYear>().is_err());
        assert!(FiscalYear::new(10_000).is_err());
    }

    #[test]
    fn fiscal_year_deserializes_from_number_or_string() {
        let from_number: FiscalYear = serde_json::from_str("2567").unwrap();
        let from_text: FiscalYear = serde_json::from_str("\"2567\"").unwrap();
        assert_eq!(from_number, from_text);
        assert!(serde_json::from_str::<FiscalYear>("\"abc\"").is_err());
    }
}
