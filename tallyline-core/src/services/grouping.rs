//! Row grouping
//!
//! Some exports split one economic event across several lines (a trade
//! filled in parts, a trade line plus a fee line). Rows sharing a group key
//! are merged into one representative row before entity construction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;

use crate::domain::{clean_decimal, Field, GroupRule, MappedRow, RawDate, RawRow};
use crate::ports::Normalizer;

/// A mapped row ready for the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedRow {
    /// Number of the first constituent row
    pub row: usize,
    /// All constituent row numbers
    pub members: Vec<usize>,
    pub mapped: MappedRow,
}

pub struct RowGrouper<'a> {
    normalizer: &'a dyn Normalizer,
    timezone: Option<Tz>,
    comma_as_decimal: bool,
}

impl<'a> RowGrouper<'a> {
    pub fn new(normalizer: &'a dyn Normalizer, timezone: Option<Tz>, comma_as_decimal: bool) -> Self {
        Self {
            normalizer,
            timezone,
            comma_as_decimal,
        }
    }

    /// Partition rows by the rule's key and merge every group with more than
    /// one member. Output keeps the position of each group's first row.
    pub fn group(&self, rule: Option<&GroupRule>, rows: Vec<(RawRow, MappedRow)>) -> Vec<GroupedRow> {
        let Some(rule) = rule else {
            return rows
                .into_iter()
                .map(|(raw, mapped)| GroupedRow {
                    row: raw.number,
                    members: vec![raw.number],
                    mapped,
                })
                .collect();
        };

        let mut slots: Vec<Vec<(usize, MappedRow)>> = Vec::new();
        let mut by_key: HashMap<String, usize> = HashMap::new();

        for (raw, mapped) in rows {
            let eligible = rule.eligible.map_or(true, |f| f(&mapped, &raw));
            let key = if eligible { (rule.key)(&mapped, &raw) } else { None };

            match key {
                Some(k) => match by_key.get(&k) {
                    Some(&slot) => slots[slot].push((raw.number, mapped)),
                    None => {
                        by_key.insert(k, slots.len());
                        slots.push(vec![(raw.number, mapped)]);
                    }
                },
                None => slots.push(vec![(raw.number, mapped)]),
            }
        }

        slots
            .into_iter()
            .filter_map(|members| {
                let numbers: Vec<usize> = members.iter().map(|(n, _)| *n).collect();
                let first = *numbers.first()?;
                let mapped = if members.len() == 1 {
                    members.into_iter().next()?.1
                } else {
                    self.merge(members.into_iter().map(|(_, m)| m).collect())
                };
                Some(GroupedRow {
                    row: first,
                    members: numbers,
                    mapped,
                })
            })
            .collect()
    }

    /// Sum amount fields, take the first value of every other field and
    /// pick the date by direction: earliest when the result receives
    /// something, latest otherwise.
    fn merge(&self, members: Vec<MappedRow>) -> MappedRow {
        let mut merged = MappedRow::new();

        for member in &members {
            for (field, value) in member.iter() {
                if field.is_amount() || field == Field::Date || merged.contains(field) {
                    continue;
                }
                merged.set(field, value);
            }
        }

        for field in Field::AMOUNTS {
            let values: Vec<&str> = members.iter().filter_map(|m| m.get(*field)).collect();
            if values.is_empty() {
                continue;
            }
            // an overflowing sum is kept out of range so validation rejects the row
            let total = values
                .iter()
                .map(|v| clean_decimal(v, self.comma_as_decimal))
                .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
                .unwrap_or(Decimal::MAX);
            merged.set(*field, total.normalize().to_string());
        }

        let receiving = merged.contains(Field::ToAmount) || merged.contains(Field::ToCurrency);
        if let Some(date) = self.pick_date(&members, receiving) {
            merged.set(Field::Date, date);
        }

        merged
    }

    fn pick_date(&self, members: &[MappedRow], earliest: bool) -> Option<String> {
        let parsed: Vec<(DateTime<Utc>, &str)> = members
            .iter()
            .filter_map(|m| m.get(Field::Date))
            .filter_map(|raw| {
                self.normalizer
                    .normalize_date(&RawDate::from(raw), self.timezone)
                    .map(|at| (at, raw))
            })
            .collect();

        let chosen = if earliest {
            parsed.iter().min_by_key(|(at, _)| *at)
        } else {
            parsed.iter().max_by_key(|(at, _)| *at)
        };

        chosen
            .map(|(_, raw)| raw.to_string())
            .or_else(|| members.iter().find_map(|m| m.get(Field::Date)).map(str::to_string))
    }
}
