use crate::model::{AttendanceSnapshot, PERIOD_COUNT};
use chrono::{Months, NaiveDate};

/// Totals at or above this count are shown as present.
pub const PRESENT_THRESHOLD: u8 = 5;
pub const EMPTY_ROSTER_PLACEHOLDER: &str =
    "No students added yet. Click \"Add New Student\" to begin.";
pub const HEADER_DATE_FORMAT: &str = "%m-%d-%y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Present,
    Absent,
}

impl Standing {
    pub fn for_total(total: u8) -> Self {
        if total >= PRESENT_THRESHOLD {
            Standing::Present
        } else {
            Standing::Absent
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub student_name: String,
    pub periods: [bool; PERIOD_COUNT as usize],
    pub total_present: u8,
    pub total_label: String,
    pub standing: Standing,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub header_date: Option<String>,
    pub rows: Vec<RowView>,
    pub placeholder: Option<&'static str>,
}

impl ViewModel {
    pub fn visible_rows(&self) -> impl Iterator<Item = &RowView> {
        self.rows.iter().filter(|r| r.visible)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub display_date: Option<NaiveDate>,
    /// Hide students with no present period.
    pub present_only: bool,
}

pub fn render(snapshot: &AttendanceSnapshot, options: &RenderOptions) -> ViewModel {
    let rows: Vec<RowView> = snapshot
        .records()
        .map(|record| {
            let total = record.total_present();
            RowView {
                student_name: record.student_name.clone(),
                periods: record.periods(),
                total_present: total,
                total_label: format!("{}/{}", total, PERIOD_COUNT),
                standing: Standing::for_total(total),
                visible: !options.present_only || record.any_present(),
            }
        })
        .collect();
    let placeholder = rows.is_empty().then_some(EMPTY_ROSTER_PLACEHOLDER);
    ViewModel {
        header_date: options.display_date.map(format_header_date),
        rows,
        placeholder,
    }
}

pub fn format_header_date(date: NaiveDate) -> String {
    date.format(HEADER_DATE_FORMAT).to_string()
}

/// Moves the date by whole months. A day past the end of the target month
/// is clamped to its last day.
pub fn shift_month(date: NaiveDate, delta: i32) -> NaiveDate {
    let months = Months::new(delta.unsigned_abs());
    let shifted = if delta >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    };
    shifted.unwrap_or(date)
}
