//! Calendar and time grid generation
//!
//! Pure functions: given a reference date they lay out selectable cells.
//! Nothing here knows about sessions or transports.

use crate::ui::{Action, Button, Keyboard};
use chrono::{Datelike, Days, Months, NaiveDate, NaiveTime, Timelike};
use thiserror::Error;

/// Format accepted for manually typed dates
pub const MANUAL_DATE_FORMAT: &str = "%d.%m.%Y";
/// Format accepted for manually typed times
pub const MANUAL_TIME_FORMAT: &str = "%H:%M";
/// Resolution of the minute picker
pub const MINUTE_STEP: u32 = 5;

const WEEKDAY_LABELS: [&str; 7] = ["Пн", "Вт", "Ср", "Чт", "Пт", "Сб", "Вс"];
const MONTH_NAMES: [&str; 12] = [
    "Январь", "Февраль", "Март", "Апрель", "Май", "Июнь", "Июль", "Август", "Сентябрь",
    "Октябрь", "Ноябрь", "Декабрь",
];
const ROLLING_ROW_WIDTH: usize = 4;
const TIME_ROW_WIDTH: usize = 6;

/// Which date picker shape to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarLayout {
    /// Weekday-aligned grid of the whole month containing the reference date
    #[default]
    Month,
    /// `days` consecutive days starting at the reference date
    Rolling { days: u32 },
}

/// One position in a date grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Blank,
    Day { date: NaiveDate, enabled: bool },
}

/// A laid-out date picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateGrid {
    pub layout: CalendarLayout,
    /// Human heading, e.g. "Май 2025"
    pub caption: String,
    pub rows: Vec<Vec<Cell>>,
}

impl DateGrid {
    /// Build the grid for `layout`; days before `today` are disabled
    pub fn generate(layout: CalendarLayout, reference: NaiveDate, today: NaiveDate) -> Self {
        match layout {
            CalendarLayout::Month => month_grid(reference, today),
            CalendarLayout::Rolling { days } => rolling_window(reference, days),
        }
    }

    pub fn day_cells(&self) -> usize {
        self.cells()
            .filter(|cell| matches!(cell, Cell::Day { .. }))
            .count()
    }

    /// Blank cells before the first day
    pub fn leading_blanks(&self) -> usize {
        self.cells()
            .take_while(|cell| matches!(cell, Cell::Blank))
            .count()
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.rows.iter().flatten()
    }

    /// Render as buttons, followed by the "publish now" and "manual entry" actions
    pub fn keyboard(&self) -> Keyboard {
        let mut keyboard = Keyboard::new();

        if self.layout == CalendarLayout::Month {
            keyboard = keyboard.row(
                WEEKDAY_LABELS
                    .iter()
                    .map(|label| Button::new(*label, Action::Noop))
                    .collect(),
            );
        }

        for row in &self.rows {
            let buttons = row
                .iter()
                .map(|cell| match *cell {
                    Cell::Blank => Button::new(" ", Action::Noop),
                    Cell::Day { enabled: false, .. } => Button::new("·", Action::Noop),
                    Cell::Day {
                        date,
                        enabled: true,
                    } => Button::new(self.day_label(date), Action::PickDate(date)),
                })
                .collect();
            keyboard = keyboard.row(buttons);
        }

        keyboard
            .row(vec![
                Button::new("📤 Опубликовать сейчас", Action::PublishNow),
                Button::new("⌨️ Ввести вручную", Action::ManualEntry),
            ])
            .button("✖️ Отмена", Action::Cancel)
    }

    fn day_label(&self, date: NaiveDate) -> String {
        match self.layout {
            CalendarLayout::Month => date.day().to_string(),
            CalendarLayout::Rolling { .. } => date.format("%d.%m").to_string(),
        }
    }
}

/// Number of days in the month containing `date`
///
/// Computed as first-of-next-month minus first-of-this-month.
pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = first_of_month(date);
    match first.checked_add_months(Months::new(1)) {
        Some(next) => u32::try_from((next - first).num_days()).unwrap_or_default(),
        // December of the last representable year
        None => u32::try_from(
            first
                .iter_days()
                .take_while(|d| d.month() == first.month())
                .count(),
        )
        .unwrap_or_default(),
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Monday-first, 7-column grid for the month containing `reference`
pub fn month_grid(reference: NaiveDate, today: NaiveDate) -> DateGrid {
    let first = first_of_month(reference);
    let offset = first.weekday().num_days_from_monday() as usize;
    let length = days_in_month(reference) as usize;

    let mut cells = vec![Cell::Blank; offset];
    cells.extend(first.iter_days().take(length).map(|date| Cell::Day {
        date,
        enabled: date >= today,
    }));
    while cells.len() % 7 != 0 {
        cells.push(Cell::Blank);
    }

    DateGrid {
        layout: CalendarLayout::Month,
        caption: format!("{} {}", MONTH_NAMES[first.month0() as usize], first.year()),
        rows: cells.chunks(7).map(<[Cell]>::to_vec).collect(),
    }
}

/// `days` consecutive days starting at `reference`
pub fn rolling_window(reference: NaiveDate, days: u32) -> DateGrid {
    let cells: Vec<Cell> = reference
        .iter_days()
        .take(days as usize)
        .map(|date| Cell::Day {
            date,
            enabled: true,
        })
        .collect();

    let caption = match cells.last() {
        Some(Cell::Day { date, .. }) => format!(
            "{} – {}",
            reference.format("%d.%m"),
            date.format("%d.%m")
        ),
        _ => String::new(),
    };

    DateGrid {
        layout: CalendarLayout::Rolling { days },
        caption,
        rows: cells
            .chunks(ROLLING_ROW_WIDTH)
            .map(<[Cell]>::to_vec)
            .collect(),
    }
}

/// Hour and minute pickers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeGrid {
    pub hours: Vec<u32>,
    pub minutes: Vec<u32>,
    pub selected: Option<NaiveTime>,
}

impl TimeGrid {
    pub fn new(selected: Option<NaiveTime>) -> Self {
        Self {
            hours: (0..24).collect(),
            minutes: (0..60).step_by(MINUTE_STEP as usize).collect(),
            selected,
        }
    }

    pub fn keyboard(&self) -> Keyboard {
        let selected_hour = self.selected.map(|t| t.hour());
        let selected_minute = self.selected.map(|t| t.minute());

        let mut keyboard = Keyboard::new();
        for chunk in self.hours.chunks(TIME_ROW_WIDTH) {
            keyboard = keyboard.row(
                chunk
                    .iter()
                    .map(|&hour| {
                        let label = if selected_hour == Some(hour) {
                            format!("•{hour:02}")
                        } else {
                            format!("{hour:02}")
                        };
                        Button::new(label, Action::PickHour(hour))
                    })
                    .collect(),
            );
        }
        for chunk in self.minutes.chunks(TIME_ROW_WIDTH) {
            keyboard = keyboard.row(
                chunk
                    .iter()
                    .map(|&minute| {
                        let label = if selected_minute == Some(minute) {
                            format!("•:{minute:02}")
                        } else {
                            format!(":{minute:02}")
                        };
                        Button::new(label, Action::PickMinute(minute))
                    })
                    .collect(),
            );
        }

        keyboard
            .button("✅ Готово", Action::TimeDone)
            .button("✖️ Отмена", Action::Cancel)
    }
}

/// Errors from manual date/time entry
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateParseError {
    #[error("empty input")]
    Empty,
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("invalid time: {0}")]
    InvalidTime(String),
    #[error("unexpected trailing input: {0}")]
    TrailingInput(String),
}

/// A manually entered schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualSchedule {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
}

/// Parse `DD.MM.YYYY`, optionally followed by ` HH:MM`
pub fn parse_manual_date(input: &str) -> Result<ManualSchedule, DateParseError> {
    let mut parts = input.split_whitespace();
    let date_part = parts.next().ok_or(DateParseError::Empty)?;
    let date = NaiveDate::parse_from_str(date_part, MANUAL_DATE_FORMAT)
        .map_err(|_| DateParseError::InvalidDate(date_part.to_string()))?;
    let time = parts.next().map(parse_manual_time).transpose()?;

    if let Some(rest) = parts.next() {
        return Err(DateParseError::TrailingInput(rest.to_string()));
    }

    Ok(ManualSchedule { date, time })
}

/// Parse `HH:MM`
pub fn parse_manual_time(input: &str) -> Result<NaiveTime, DateParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DateParseError::Empty);
    }
    NaiveTime::parse_from_str(input, MANUAL_TIME_FORMAT)
        .map_err(|_| DateParseError::InvalidTime(input.to_string()))
}
