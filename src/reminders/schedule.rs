//! Three-stage reminder schedule.
//!
//! The due stage of a task is re-derived on every scan from its creation
//! time, the stamps already written to its row, and the current time.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// A reminder stage, ordered by escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReminderStage {
    /// Shortly after the task was created.
    First,
    /// Late morning, local time.
    Second,
    /// Mid afternoon, local time.
    Third,
}

impl ReminderStage {
    /// Normalized header of the column stamped when this stage is sent.
    pub fn stamp_column(&self) -> &'static str {
        match self {
            ReminderStage::First => "taskfirstnotifiedat",
            ReminderStage::Second => "tasksecondnotifiedat",
            ReminderStage::Third => "taskthirdnotifiedat",
        }
    }
}

/// Stamps already written to a task row; only parseable values count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStamps {
    pub first: Option<DateTime<Utc>>,
    pub second: Option<DateTime<Utc>>,
    pub third: Option<DateTime<Utc>>,
}

impl StageStamps {
    /// Most escalated stage already sent.
    pub fn highest(&self) -> Option<ReminderStage> {
        if self.third.is_some() {
            Some(ReminderStage::Third)
        } else if self.second.is_some() {
            Some(ReminderStage::Second)
        } else if self.first.is_some() {
            Some(ReminderStage::First)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSchedule {
    pub timezone: Tz,
    /// Delay after creation before the first reminder.
    pub first_after: Duration,
    /// Local wall-clock time of the second reminder.
    pub second_at: NaiveTime,
    /// Local wall-clock time of the third reminder, on the second reminder's day.
    pub third_at: NaiveTime,
}

impl Default for ReminderSchedule {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Los_Angeles,
            first_after: Duration::minutes(30),
            second_at: NaiveTime::from_hms_opt(11, 30, 0).unwrap_or(NaiveTime::MIN),
            third_at: NaiveTime::from_hms_opt(15, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl ReminderSchedule {
    /// Short label shown next to each task in a reminder email.
    pub fn label(&self, stage: ReminderStage) -> String {
        match stage {
            ReminderStage::First => format!("{}-min", self.first_after.num_minutes()),
            ReminderStage::Second => self.second_at.format("%-H:%M").to_string(),
            ReminderStage::Third => self.third_at.format("%-I:%M %p").to_string(),
        }
    }

    /// Instant of `time` on local `date`. Inside a DST gap the first valid
    /// instant after the gap is used.
    fn local_instant(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let naive = date.and_time(time);
        self.timezone
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| {
                self.timezone
                    .from_local_datetime(&(naive + Duration::hours(1)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| naive.and_utc())
    }

    /// Second reminder: `second_at` on the creation day, or the next local
    /// day when the task was created after that time.
    pub fn second_due(&self, created: DateTime<Utc>) -> DateTime<Utc> {
        let day = created.with_timezone(&self.timezone).date_naive();
        let same_day = self.local_instant(day, self.second_at);
        if created <= same_day {
            same_day
        } else {
            self.local_instant(day.succ_opt().unwrap_or(day), self.second_at)
        }
    }

    /// Third reminder: `third_at` on the second reminder's local day.
    pub fn third_due(&self, created: DateTime<Utc>) -> DateTime<Utc> {
        let day = self
            .second_due(created)
            .with_timezone(&self.timezone)
            .date_naive();
        self.local_instant(day, self.third_at)
    }

    /// The single stage to send now, if any: the most escalated stage that
    /// is due and above every stage already stamped.
    pub fn due_stage(
        &self,
        now: DateTime<Utc>,
        created: DateTime<Utc>,
        stamps: &StageStamps,
    ) -> Option<ReminderStage> {
        let sent = stamps.highest();
        let unsent = |stage: ReminderStage| sent.is_none_or(|s| stage > s);

        if unsent(ReminderStage::Third) && now >= self.third_due(created) {
            Some(ReminderStage::Third)
        } else if unsent(ReminderStage::Second) && now >= self.second_due(created) {
            Some(ReminderStage::Second)
        } else if unsent(ReminderStage::First) && now - created >= self.first_after {
            Some(ReminderStage::First)
        } else {
            None
        }
    }
}

/// Offset-carrying layouts besides RFC 3339.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Naive layouts, read as UTC. Includes the US locale form the spreadsheet
/// shows once it has turned a cell into a date.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse a stored timestamp: RFC 3339, an ISO date-time with a numeric
/// offset, or a naive date-time taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
