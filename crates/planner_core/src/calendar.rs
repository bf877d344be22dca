use crate::error::AppError;
use crate::model::{DAYS_PER_WEEK, Day, Week};
use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, UtcOffset, Weekday};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// First day of a planner week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Ok(Self::Sunday),
            "monday" | "mon" => Ok(Self::Monday),
            other => Err(AppError::invalid_input(format!(
                "unknown week start '{other}' (expected sunday or monday)"
            ))),
        }
    }
}

pub fn parse_date(raw: &str) -> Result<Date, AppError> {
    Date::parse(raw.trim(), DATE_FORMAT)
        .map_err(|_| AppError::invalid_data(format!("date must be YYYY-MM-DD: {raw}")))
}

pub fn format_date(date: Date) -> Result<String, AppError> {
    date.format(DATE_FORMAT)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn short_day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sunday => "Sun",
        Weekday::Monday => "Mon",
        Weekday::Tuesday => "Tue",
        Weekday::Wednesday => "Wed",
        Weekday::Thursday => "Thu",
        Weekday::Friday => "Fri",
        Weekday::Saturday => "Sat",
    }
}

fn add_days(date: Date, days: i64) -> Result<Date, AppError> {
    date.checked_add(Duration::days(days))
        .ok_or_else(|| AppError::invalid_input("date is out of the supported range"))
}

/// Builds an empty week of seven consecutive days starting at `start`.
///
/// Ids are derived from the dates, so generating the same start date twice
/// yields the same week and day ids.
pub fn generate_week(start: Date) -> Result<Week, AppError> {
    let mut days = Vec::with_capacity(DAYS_PER_WEEK);
    for offset in 0..DAYS_PER_WEEK {
        let date = add_days(start, offset as i64)?;
        let date_string = format_date(date)?;
        days.push(Day {
            id: format!("day-{offset}-{date_string}"),
            date: date_string,
            day_name: short_day_name(date.weekday()).to_string(),
            tasks: Vec::new(),
        });
    }

    let start_string = format_date(start)?;
    let end_date = add_days(start, DAYS_PER_WEEK as i64 - 1)?;

    Ok(Week {
        id: format!("week-{start_string}"),
        start_date: start_string,
        end_date: format_date(end_date)?,
        days,
    })
}

pub fn current_week_start(today: Date, week_start: WeekStart) -> Date {
    let back = match week_start {
        WeekStart::Sunday => today.weekday().number_days_from_sunday(),
        WeekStart::Monday => today.weekday().number_days_from_monday(),
    };
    today
        .checked_sub(Duration::days(i64::from(back)))
        .unwrap_or(today)
}

/// The day after `week.end_date`.
pub fn next_week_start(week: &Week) -> Result<Date, AppError> {
    let end = parse_date(&week.end_date)?;
    add_days(end, 1)
}

fn short_month(date: Date) -> String {
    date.month().to_string().chars().take(3).collect()
}

/// Human label for a week, e.g. `Jan 5 - 11, 2025` or `Jan 29 - Feb 4, 2025`.
pub fn format_week_range(start_date: &str, end_date: &str) -> Result<String, AppError> {
    let start = parse_date(start_date)?;
    let end = parse_date(end_date)?;
    let start_month = short_month(start);
    let end_month = short_month(end);

    if start_month == end_month {
        Ok(format!(
            "{} {} - {}, {}",
            start_month,
            start.day(),
            end.day(),
            start.year()
        ))
    } else {
        Ok(format!(
            "{} {} - {} {}, {}",
            start_month,
            start.day(),
            end_month,
            end.day(),
            start.year()
        ))
    }
}

pub fn today_local() -> Date {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetDateTime::now_utc().to_offset(offset).date()
}
