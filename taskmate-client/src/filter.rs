/// Task filtering and sorting for the board view
///
/// A task's "date" for range and quick filters is its due date, falling back
/// to its creation time. Quick filters both set the date range and apply
/// their own predicate; picking a custom range resets the quick filter.

use chrono::{DateTime, Duration, Months, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use taskmate_shared::models::TaskWithRelations;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
    Title,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickFilter {
    #[default]
    All,
    Today,
    ThisWeek,
    ThisMonth,
    Overdue,
    NoDueDate,
}

/// Inclusive date bounds; either side may be open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn is_set(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at <= to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub date_range: DateRange,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub quick_filter: QuickFilter,
}

impl FilterOptions {
    /// Selects a quick filter and the date range that goes with it.
    pub fn with_quick_filter(self, quick_filter: QuickFilter, now: DateTime<Utc>) -> Self {
        let today = start_of_day(now);
        let date_range = match quick_filter {
            QuickFilter::Today => DateRange {
                from: Some(today),
                to: Some(end_of_day(now)),
            },
            QuickFilter::ThisWeek => DateRange {
                from: Some(start_of_day(now - Duration::days(7))),
                to: Some(end_of_day(now)),
            },
            QuickFilter::ThisMonth => {
                let month_ago = now.checked_sub_months(Months::new(1)).unwrap_or(now - Duration::days(30));
                DateRange {
                    from: Some(start_of_day(month_ago)),
                    to: Some(end_of_day(now)),
                }
            }
            QuickFilter::Overdue => DateRange {
                from: None,
                to: Some(today),
            },
            QuickFilter::All | QuickFilter::NoDueDate => DateRange::default(),
        };

        Self {
            date_range,
            quick_filter,
            ..self
        }
    }

    /// A custom range replaces whatever quick filter was active.
    pub fn with_date_range(self, date_range: DateRange) -> Self {
        Self {
            date_range,
            quick_filter: QuickFilter::All,
            ..self
        }
    }

    /// Number of filter groups that differ from the defaults (0 to 3).
    pub fn active_count(&self) -> usize {
        let defaults = FilterOptions::default();
        [
            self.date_range.is_set(),
            self.sort_by != defaults.sort_by || self.sort_order != defaults.sort_order,
            self.quick_filter != QuickFilter::All,
        ]
        .iter()
        .filter(|active| **active)
        .count()
    }
}

fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&at.date_naive().and_time(NaiveTime::MIN))
}

fn end_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(at) + Duration::days(1) - Duration::milliseconds(1)
}

fn reference_date(task: &TaskWithRelations) -> DateTime<Utc> {
    task.due_date.unwrap_or(task.created_at)
}

fn matches_quick_filter(task: &TaskWithRelations, quick_filter: QuickFilter, now: DateTime<Utc>) -> bool {
    let date = reference_date(task);
    match quick_filter {
        QuickFilter::All => true,
        QuickFilter::Today => date.date_naive() == now.date_naive(),
        QuickFilter::ThisWeek => date >= now - Duration::days(7),
        QuickFilter::ThisMonth => date >= now - Duration::days(30),
        QuickFilter::Overdue => task.due_date.is_some_and(|due| due < now),
        QuickFilter::NoDueDate => task.due_date.is_none(),
    }
}

fn compare(a: &TaskWithRelations, b: &TaskWithRelations, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
        // Missing due dates sort after every real one.
        SortBy::DueDate => (a.due_date.is_none(), a.due_date).cmp(&(b.due_date.is_none(), b.due_date)),
        SortBy::Priority => a.priority.rank().cmp(&b.priority.rank()),
        SortBy::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortBy::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

/// Tasks of one board after the date range and quick filter, in sort order.
///
/// The sort is stable, so ties keep their incoming order.
pub fn filter_and_sort(
    tasks: &[TaskWithRelations],
    board_id: Uuid,
    filters: &FilterOptions,
    now: DateTime<Utc>,
) -> Vec<TaskWithRelations> {
    let mut selected: Vec<TaskWithRelations> = tasks
        .iter()
        .filter(|task| task.board_id == board_id)
        .filter(|task| filters.date_range.contains(reference_date(task)))
        .filter(|task| matches_quick_filter(task, filters.quick_filter, now))
        .cloned()
        .collect();

    selected.sort_by(|a, b| {
        let ordering = compare(a, b, filters.sort_by);
        match filters.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    selected
}
