use crate::error::AttendanceError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PERIOD_COUNT: u8 = 7;
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// A class period, 1 through 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(u8);

impl Period {
    pub fn new(index: u8) -> Result<Self, AttendanceError> {
        if (1..=PERIOD_COUNT).contains(&index) {
            Ok(Period(index))
        } else {
            Err(AttendanceError::InvalidPeriod(index))
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Period> {
        (1..=PERIOD_COUNT).map(Period)
    }

    fn slot(self) -> usize {
        usize::from(self.0 - 1)
    }
}

/// One student's attendance across the seven periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RecordWire", into = "RecordWire")]
pub struct AttendanceRecord {
    pub student_name: String,
    periods: [bool; PERIOD_COUNT as usize],
}

impl AttendanceRecord {
    pub fn new(student_name: impl Into<String>) -> Self {
        Self {
            student_name: student_name.into(),
            periods: [false; PERIOD_COUNT as usize],
        }
    }

    pub fn with_periods(student_name: impl Into<String>, present: &[u8]) -> Self {
        let mut record = Self::new(student_name);
        for p in present.iter().filter_map(|i| Period::new(*i).ok()) {
            record.set(p, true);
        }
        record
    }

    pub fn is_present(&self, period: Period) -> bool {
        self.periods[period.slot()]
    }

    pub fn set(&mut self, period: Period, present: bool) {
        self.periods[period.slot()] = present;
    }

    /// Flips the period and returns its new value.
    pub fn toggle(&mut self, period: Period) -> bool {
        let slot = &mut self.periods[period.slot()];
        *slot = !*slot;
        *slot
    }

    pub fn clear(&mut self) {
        self.periods = [false; PERIOD_COUNT as usize];
    }

    pub fn periods(&self) -> [bool; PERIOD_COUNT as usize] {
        self.periods
    }

    pub fn total_present(&self) -> u8 {
        self.periods.iter().filter(|p| **p).count() as u8
    }

    pub fn any_present(&self) -> bool {
        self.periods.iter().any(|p| *p)
    }
}

// Documents in the wild carry nulls or omit periods entirely; both read as absent.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordWire {
    #[serde(default)]
    student_name: Option<String>,
    #[serde(default)]
    period1: Option<bool>,
    #[serde(default)]
    period2: Option<bool>,
    #[serde(default)]
    period3: Option<bool>,
    #[serde(default)]
    period4: Option<bool>,
    #[serde(default)]
    period5: Option<bool>,
    #[serde(default)]
    period6: Option<bool>,
    #[serde(default)]
    period7: Option<bool>,
}

impl From<RecordWire> for AttendanceRecord {
    fn from(w: RecordWire) -> Self {
        let flags = [
            w.period1, w.period2, w.period3, w.period4, w.period5, w.period6, w.period7,
        ];
        Self {
            student_name: w.student_name.unwrap_or_default(),
            periods: flags.map(|f| f.unwrap_or(false)),
        }
    }
}

impl From<AttendanceRecord> for RecordWire {
    fn from(r: AttendanceRecord) -> Self {
        let [p1, p2, p3, p4, p5, p6, p7] = r.periods;
        Self {
            student_name: Some(r.student_name),
            period1: Some(p1),
            period2: Some(p2),
            period3: Some(p3),
            period4: Some(p4),
            period5: Some(p5),
            period6: Some(p6),
            period7: Some(p7),
        }
    }
}

/// The complete roster of one scope, keyed and ordered by student name.
///
/// Keys always equal the record's own `student_name`. A keyed payload whose
/// record disagrees with its key is stored under the key; blank keys are
/// rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, AttendanceRecord>",
    into = "BTreeMap<String, AttendanceRecord>"
)]
pub struct AttendanceSnapshot {
    records: BTreeMap<String, AttendanceRecord>,
}

impl AttendanceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from an ordered sequence. Nameless records are
    /// skipped and a later record replaces an earlier one with the same name.
    pub fn from_records(records: impl IntoIterator<Item = AttendanceRecord>) -> Self {
        let mut snapshot = Self::new();
        for record in records {
            if record.student_name.is_empty() {
                continue;
            }
            snapshot.insert(record);
        }
        snapshot
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, student_name: &str) -> bool {
        self.records.contains_key(student_name)
    }

    pub fn get(&self, student_name: &str) -> Option<&AttendanceRecord> {
        self.records.get(student_name)
    }

    pub fn get_mut(&mut self, student_name: &str) -> Option<&mut AttendanceRecord> {
        self.records.get_mut(student_name)
    }

    pub fn insert(&mut self, record: AttendanceRecord) -> Option<AttendanceRecord> {
        self.records.insert(record.student_name.clone(), record)
    }

    pub fn records(&self) -> impl Iterator<Item = &AttendanceRecord> {
        self.records.values()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut AttendanceRecord> {
        self.records.values_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(|k| k.as_str())
    }
}

impl TryFrom<BTreeMap<String, AttendanceRecord>> for AttendanceSnapshot {
    type Error = AttendanceError;

    fn try_from(raw: BTreeMap<String, AttendanceRecord>) -> Result<Self, Self::Error> {
        let mut records = BTreeMap::new();
        for (key, mut record) in raw {
            if key.trim().is_empty() {
                return Err(AttendanceError::MalformedPayload(
                    "student name must not be empty".to_string(),
                ));
            }
            record.student_name = key.clone();
            records.insert(key, record);
        }
        Ok(Self { records })
    }
}

impl From<AttendanceSnapshot> for BTreeMap<String, AttendanceRecord> {
    fn from(s: AttendanceSnapshot) -> Self {
        s.records
    }
}

/// Either response shape of a read: the keyed mapping, or the legacy ordered
/// sequence of records.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireSnapshot {
    Keyed(AttendanceSnapshot),
    Sequence(Vec<AttendanceRecord>),
}

impl From<WireSnapshot> for AttendanceSnapshot {
    fn from(wire: WireSnapshot) -> Self {
        match wire {
            WireSnapshot::Keyed(snapshot) => snapshot,
            WireSnapshot::Sequence(records) => AttendanceSnapshot::from_records(records),
        }
    }
}

impl From<AttendanceSnapshot> for WireSnapshot {
    fn from(snapshot: AttendanceSnapshot) -> Self {
        WireSnapshot::Keyed(snapshot)
    }
}

/// Which snapshot a read or replace targets.
///
/// `Undated` is the single roster the system always had; `Day` keeps one
/// roster per calendar date. Scopes never see each other's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SnapshotScope {
    #[default]
    Undated,
    Day(NaiveDate),
}

impl SnapshotScope {
    /// Parses an optional `YYYY-MM-DD` request parameter. Absent or blank
    /// means undated.
    pub fn from_param(raw: Option<&str>) -> Result<Self, AttendanceError> {
        let Some(t) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(SnapshotScope::Undated);
        };
        NaiveDate::parse_from_str(t, DAY_KEY_FORMAT)
            .map(SnapshotScope::Day)
            .map_err(|_| AttendanceError::MalformedPayload("date must be YYYY-MM-DD".to_string()))
    }

    /// Column value in the `attendance.day` column.
    pub fn storage_key(&self) -> String {
        match self {
            SnapshotScope::Undated => String::new(),
            SnapshotScope::Day(d) => d.format(DAY_KEY_FORMAT).to_string(),
        }
    }

    pub fn query_value(&self) -> Option<String> {
        match self {
            SnapshotScope::Undated => None,
            SnapshotScope::Day(d) => Some(d.format(DAY_KEY_FORMAT).to_string()),
        }
    }
}
