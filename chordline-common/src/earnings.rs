//! Earnings totals for the dashboard

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::{Earning, EarningType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EarningsStats {
    pub total: f64,
    /// Sum of earnings dated in the same month and year as `today`
    pub monthly: f64,
    pub show: f64,
    pub streaming: f64,
    pub merchandise: f64,
    /// Lessons and uncategorised income
    pub other: f64,
}

impl EarningsStats {
    pub fn compute(earnings: &[Earning], today: NaiveDate) -> Self {
        earnings.iter().fold(Self::default(), |mut stats, earning| {
            stats.total += earning.amount;
            if earning.date.year() == today.year() && earning.date.month() == today.month() {
                stats.monthly += earning.amount;
            }
            match earning.kind {
                EarningType::Show => stats.show += earning.amount,
                EarningType::Streaming => stats.streaming += earning.amount,
                EarningType::Merchandise => stats.merchandise += earning.amount,
                EarningType::Lessons | EarningType::Other => stats.other += earning.amount,
            }
            stats
        })
    }
}
