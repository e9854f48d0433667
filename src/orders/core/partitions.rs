//! Monthly partition keys for the error evaluator.
//!
//! A partition is one calendar month identified by its first day. Keys are
//! accepted as `YYYY-MM` or `YYYY-MM-01` and rendered as `YYYY-MM-01`.
//! [`MonthlyPartitions`] describes the full partition set: every month from
//! a start month (January 2022 by default) onward.
use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::orders::errors::{ForecastError, ForecastResult};

/// One calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthPartition {
    year: i32,
    month: u32,
}

impl MonthPartition {
    /// Construct a partition, rejecting months outside `1..=12`.
    pub fn new(year: i32, month: u32) -> ForecastResult<Self> {
        let key = format!("{year:04}-{month:02}");
        NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or(ForecastError::InvalidPartitionKey { key, reason: "No such calendar month." })?;
        Ok(Self { year, month })
    }

    /// Resolve an optional key as supplied by a scheduler.
    ///
    /// # Errors
    /// - [`ForecastError::MissingPartitionKey`] for `None`.
    /// - [`ForecastError::InvalidPartitionKey`] for malformed keys.
    pub fn from_key(key: Option<&str>) -> ForecastResult<Self> {
        key.ok_or(ForecastError::MissingPartitionKey)?.parse()
    }

    /// Partition containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month; the date forecasts for this partition target.
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The following month.
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }
}

impl fmt::Display for MonthPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-01", self.year, self.month)
    }
}

impl FromStr for MonthPartition {
    type Err = ForecastError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| ForecastError::InvalidPartitionKey { key: key.to_string(), reason };
        let trimmed = key.trim();
        let date = match trimmed.len() {
            7 => NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d"),
            10 => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"),
            _ => return Err(invalid("Expected YYYY-MM or YYYY-MM-01.")),
        }
        .map_err(|_| invalid("Expected YYYY-MM or YYYY-MM-01."))?;
        if date.day() != 1 {
            return Err(invalid("Monthly partition keys start on day 01."));
        }
        Ok(Self::containing(date))
    }
}

impl Serialize for MonthPartition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthPartition {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(serde::de::Error::custom)
    }
}

/// The set of monthly partitions beginning at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyPartitions {
    start: MonthPartition,
}

impl Default for MonthlyPartitions {
    fn default() -> Self {
        Self { start: MonthPartition { year: 2022, month: 1 } }
    }
}

impl MonthlyPartitions {
    pub fn new(start: MonthPartition) -> Self {
        Self { start }
    }

    pub fn start(&self) -> MonthPartition {
        self.start
    }

    /// Parse `key` and check it belongs to this set.
    ///
    /// # Errors
    /// - Errors of [`MonthPartition::from_key`].
    /// - [`ForecastError::PartitionBeforeStart`] for months before `start`.
    pub fn resolve(&self, key: Option<&str>) -> ForecastResult<MonthPartition> {
        let partition = MonthPartition::from_key(key)?;
        if partition < self.start {
            return Err(ForecastError::PartitionBeforeStart {
                key: partition.to_string(),
                start: self.start.to_string(),
            });
        }
        Ok(partition)
    }

    /// All partitions from `start` through the month containing `last`.
    /// Empty when `last` precedes `start`.
    pub fn through(&self, last: NaiveDate) -> Vec<MonthPartition> {
        let end = MonthPartition::containing(last);
        let mut out = Vec::new();
        let mut current = self.start;
        while current <= end {
            out.push(current);
            current = current.succ();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_parse_in_both_forms() {
        let short: MonthPartition = "2023-03".parse().unwrap();
        let long: MonthPartition = "2023-03-01".parse().unwrap();

        assert_eq!(short, long);
        assert_eq!(short.to_string(), "2023-03-01");
        assert_eq!(short.start_date(), NaiveDate::from_ymd_opt(2023, 3, 1).unwrap());
    }

    #[test]
    fn malformed_keys_are_rejected() {
        for key in ["2023-13", "2023-03-15", "March", "2023/03/01", ""] {
            let err = key.parse::<MonthPartition>().unwrap_err();
            assert!(
                matches!(err, ForecastError::InvalidPartitionKey { .. }),
                "key {key:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        assert_eq!(MonthPartition::from_key(None).unwrap_err(), ForecastError::MissingPartitionKey);
    }

    #[test]
    // Purpose
    // -------
    // The default partition set starts in January 2022.
    //
    // Given
    // -----
    // - Keys for December 2021 and January 2022.
    //
    // Expect
    // ------
    // - December 2021 is rejected; January 2022 resolves.
    fn default_set_starts_in_2022() {
        let parts = MonthlyPartitions::default();

        assert!(matches!(
            parts.resolve(Some("2021-12")).unwrap_err(),
            ForecastError::PartitionBeforeStart { .. }
        ));
        assert_eq!(parts.resolve(Some("2022-01-01")).unwrap(), MonthPartition::new(2022, 1).unwrap());
    }

    #[test]
    fn enumeration_crosses_year_boundaries() {
        let parts = MonthlyPartitions::new(MonthPartition::new(2022, 11).unwrap());

        let keys: Vec<String> = parts
            .through(NaiveDate::from_ymd_opt(2023, 2, 14).unwrap())
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(keys, vec!["2022-11-01", "2022-12-01", "2023-01-01", "2023-02-01"]);
        assert!(parts.through(NaiveDate::from_ymd_opt(2022, 10, 31).unwrap()).is_empty());
    }
}
