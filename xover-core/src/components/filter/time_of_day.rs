//! Time-of-day / weekday exclusion.
//!
//! The signal bar's close time is rounded up to the primary timeframe boundary
//! before its UTC hour and weekday are read, so a bar stamped 09:59:59.9 on a
//! 15-minute primary counts as the 10:00 close.

use std::collections::HashMap;

use chrono::{Datelike, Timelike, Weekday};

use crate::components::signal::SignalEvent;
use crate::config::ExcludedHours;

use super::{snapshot, FilterContext, RejectionReason, SignalEvaluation, SignalFilter};

#[derive(Debug, Clone)]
enum Exclusions {
    Every(Vec<u32>),
    ByWeekday(HashMap<Weekday, Vec<u32>>),
}

#[derive(Debug, Clone)]
pub struct TimeOfDayFilter {
    exclusions: Exclusions,
}

impl TimeOfDayFilter {
    /// Weekday names are validated with the configuration; unparseable ones are skipped here.
    pub fn new(hours: &ExcludedHours) -> Self {
        let exclusions = match hours {
            ExcludedHours::Flat(list) => Exclusions::Every(list.clone()),
            ExcludedHours::PerWeekday(map) => Exclusions::ByWeekday(
                map.iter()
                    .filter_map(|(day, list)| day.parse::<Weekday>().ok().map(|d| (d, list.clone())))
                    .collect(),
            ),
        };
        Self { exclusions }
    }

    pub fn is_excluded(&self, weekday: Weekday, hour: u32) -> bool {
        match &self.exclusions {
            Exclusions::Every(list) => list.contains(&hour),
            Exclusions::ByWeekday(map) => map.get(&weekday).is_some_and(|l| l.contains(&hour)),
        }
    }
}

impl SignalFilter for TimeOfDayFilter {
    fn name(&self) -> &str {
        "time_of_day"
    }

    fn evaluate(&self, _signal: &SignalEvent, ctx: &FilterContext<'_>) -> SignalEvaluation {
        let hour = ctx.close_time.hour();
        let weekday = ctx.close_time.weekday();
        let state = snapshot(&[
            ("hour", hour as f64),
            ("weekday", weekday.num_days_from_monday() as f64),
        ]);
        SignalEvaluation::check(
            self.name(),
            !self.is_excluded(weekday, hour),
            RejectionReason::TimeOfDay,
            state,
        )
    }
}
