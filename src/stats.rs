use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::{AttendanceRecord, AttendanceStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStats {
    /// e.g. "March 2024"
    pub label: String,
    pub year: i32,
    pub month: u32,
    pub present: u32,
    pub absent: u32,
    pub medical: u32,
    pub total: u32,
    pub percentage: f64,
}

/// Per-month tallies, newest month first. Percentage is present/total,
/// rounded to two decimals.
pub fn monthly_stats(records: &[AttendanceRecord]) -> Vec<MonthlyStats> {
    let mut months: BTreeMap<(i32, u32), MonthlyStats> = BTreeMap::new();
    for r in records {
        let (year, month) = (r.date.year(), r.date.month());
        let m = months.entry((year, month)).or_insert_with(|| MonthlyStats {
            label: r.date.format("%B %Y").to_string(),
            year,
            month,
            present: 0,
            absent: 0,
            medical: 0,
            total: 0,
            percentage: 0.0,
        });
        match r.status {
            AttendanceStatus::Present => m.present += 1,
            AttendanceStatus::Absent => m.absent += 1,
            AttendanceStatus::Medical => m.medical += 1,
        }
        m.total += 1;
    }

    months
        .into_values()
        .rev()
        .map(|mut m| {
            if m.total > 0 {
                let pct = f64::from(m.present) / f64::from(m.total) * 100.0;
                m.percentage = (pct * 100.0).round() / 100.0;
            }
            m
        })
        .collect()
}
