use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::{Result, TrackerError};

pub const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Habit {
    pub id: u32,
    pub habit_title: String,
    /// Times per week.
    pub goal: u32,
}

pub fn habit_mark_key(id: u32, day: usize) -> String {
    format!("{}-{}", id, day)
}

/// Parse a weekday as `mon`..`sun`, a full day name, or an index `0..6`
/// (Monday is 0). `None` means today.
pub fn parse_weekday(day: Option<&str>) -> Option<usize> {
    let Some(day) = day else {
        return Some(Local::now().weekday().num_days_from_monday() as usize);
    };

    let lower = day.trim().to_lowercase();
    if let Ok(index) = lower.parse::<usize>() {
        return (index < 7).then_some(index);
    }

    match lower.as_str() {
        "mon" | "monday" => Some(0),
        "tue" | "tues" | "tuesday" => Some(1),
        "wed" | "wednesday" => Some(2),
        "thu" | "thur" | "thurs" | "thursday" => Some(3),
        "fri" | "friday" => Some(4),
        "sat" | "saturday" => Some(5),
        "sun" | "sunday" => Some(6),
        _ => None,
    }
}

impl Database {
    pub fn add_habit(&mut self, title: &str, goal: &str) -> Result<&Habit> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TrackerError::Invalid("habit title cannot be empty".to_string()));
        }

        let goal = goal
            .trim()
            .parse::<u32>()
            .map_err(|_| TrackerError::Invalid(format!("goal must be a number, got '{}'", goal)))?;

        let id = self.habits.iter().map(|h| h.id).max().unwrap_or(0) + 1;
        self.habits.push(Habit {
            id,
            habit_title: title.to_string(),
            goal,
        });

        Ok(&self.habits[self.habits.len() - 1])
    }

    pub fn remove_habit(&mut self, id: u32) -> Result<Habit> {
        let index = self
            .habits
            .iter()
            .position(|h| h.id == id)
            .ok_or_else(|| TrackerError::NotFound(format!("habit {}", id)))?;

        let habit = self.habits.remove(index);
        let prefix = format!("{}-", id);
        self.habit_marks.retain(|key, _| !key.starts_with(&prefix));
        Ok(habit)
    }

    /// Flips the mark for `day` (Monday is 0) and returns the new state.
    pub fn toggle_habit_day(&mut self, id: u32, day: usize) -> Result<bool> {
        if !self.habits.iter().any(|h| h.id == id) {
            return Err(TrackerError::NotFound(format!("habit {}", id)));
        }
        if day >= WEEKDAYS.len() {
            return Err(TrackerError::Invalid(format!("no weekday {}", day)));
        }

        let key = habit_mark_key(id, day);
        let checked = !self.habit_marks.get(&key).copied().unwrap_or(false);
        if checked {
            self.habit_marks.insert(key, true);
        } else {
            self.habit_marks.remove(&key);
        }
        Ok(checked)
    }

    pub fn is_habit_checked(&self, id: u32, day: usize) -> bool {
        self.habit_marks
            .get(&habit_mark_key(id, day))
            .copied()
            .unwrap_or(false)
    }

    /// Number of days checked this week.
    pub fn habit_progress(&self, id: u32) -> usize {
        (0..WEEKDAYS.len())
            .filter(|&day| self.is_habit_checked(id, day))
            .count()
    }
}

pub fn print_habits(db: &Database) {
    if db.habits.is_empty() {
        println!("No habits yet.");
        return;
    }

    println!("\nHabits:");
    println!("{}", "=".repeat(60));

    for habit in &db.habits {
        println!("\n[{}] {}", habit.id, habit.habit_title);
        println!(
            "  Goal: {} times per week ({} done)",
            habit.goal,
            db.habit_progress(habit.id)
        );

        let header: Vec<String> = WEEKDAYS.iter().map(|d| format!("{:^5}", d)).collect();
        let marks: Vec<String> = (0..WEEKDAYS.len())
            .map(|day| {
                let mark = if db.is_habit_checked(habit.id, day) {
                    "✓"
                } else {
                    "·"
                };
                format!("{:^5}", mark)
            })
            .collect();
        println!("  {}", header.join(""));
        println!("  {}", marks.join(""));
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_habit_assigns_ids() {
        let mut db = Database::default();
        assert_eq!(db.add_habit("Walk", "5").unwrap().id, 1);
        assert_eq!(db.add_habit("Read", " 3 ").unwrap().id, 2);

        db.remove_habit(1).unwrap();
        assert_eq!(db.add_habit("Stretch", "7").unwrap().id, 3);
    }

    #[test]
    fn test_add_habit_validation() {
        let mut db = Database::default();
        assert!(matches!(db.add_habit("  ", "3"), Err(TrackerError::Invalid(_))));
        assert!(matches!(db.add_habit("Walk", "often"), Err(TrackerError::Invalid(_))));
        assert!(db.habits.is_empty());
    }

    #[test]
    fn test_toggle_and_progress() {
        let mut db = Database::default();
        let id = db.add_habit("Walk", "3").unwrap().id;

        assert!(db.toggle_habit_day(id, 0).unwrap());
        assert!(db.toggle_habit_day(id, 4).unwrap());
        assert_eq!(db.habit_progress(id), 2);
        assert!(db.habit_marks.contains_key("1-4"));

        assert!(!db.toggle_habit_day(id, 0).unwrap());
        assert_eq!(db.habit_progress(id), 1);

        assert!(db.toggle_habit_day(id, 7).is_err());
        assert!(db.toggle_habit_day(99, 0).is_err());
    }

    #[test]
    fn test_remove_habit_clears_marks_of_that_habit_only() {
        let mut db = Database::default();
        db.add_habit("Walk", "3").unwrap();
        db.add_habit("Read", "3").unwrap();
        db.toggle_habit_day(1, 2).unwrap();
        db.toggle_habit_day(2, 2).unwrap();

        db.remove_habit(1).unwrap();
        assert!(!db.is_habit_checked(1, 2));
        assert!(db.is_habit_checked(2, 2));
        assert!(matches!(db.remove_habit(1), Err(TrackerError::NotFound(_))));
    }

    #[test]
    fn test_parse_weekday() {
        assert_eq!(parse_weekday(Some("mon")), Some(0));
        assert_eq!(parse_weekday(Some("Sunday")), Some(6));
        assert_eq!(parse_weekday(Some("3")), Some(3));
        assert_eq!(parse_weekday(Some("7")), None);
        assert_eq!(parse_weekday(Some("someday")), None);
        assert!(parse_weekday(None).unwrap() < 7);
    }
}
