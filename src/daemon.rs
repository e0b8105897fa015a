use std::collections::HashSet;
use std::path::Path;
use std::thread;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use log::{info, warn};
use notify_rust::Notification;

use crate::config::Config;
use crate::database::Database;
use crate::medication::intake_key;
use crate::time::{classify_time, is_time_due};

/// A dose that should be announced now.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub key: String,
    pub medication_name: String,
    pub dose: String,
    pub scheduled: String,
    pub label: String,
}

/// Doses that are due, not yet marked as taken, and not yet announced.
pub fn pending_reminders(
    db: &Database,
    notified: &HashSet<String>,
    is_due: impl Fn(&str) -> bool,
) -> Vec<Reminder> {
    let mut reminders = Vec::new();

    for med in &db.medications {
        for (slot, time) in med.time_to_take.iter().enumerate() {
            let key = intake_key(&med.medication_name, slot);
            if db.is_taken(&med.medication_name, slot) || notified.contains(&key) || !is_due(time)
            {
                continue;
            }

            let classification = classify_time(time);
            reminders.push(Reminder {
                key,
                medication_name: med.medication_name.clone(),
                dose: format!("{} {}", med.dose_amount, med.dose_unit),
                scheduled: classification.normalized,
                label: classification.label.to_string(),
            });
        }
    }

    reminders
}

/// What the daemon remembers between ticks.
#[derive(Debug, Default)]
struct ReminderState {
    current_day: Option<NaiveDate>,
    notified: HashSet<String>,
}

fn tick(
    data_file: &Path,
    state: &mut ReminderState,
    today: NaiveDate,
    is_due: impl Fn(&str) -> bool,
) {
    // Announcements belong to one day, whoever rolled the store over.
    if state.current_day != Some(today) {
        if state.current_day.is_some() {
            info!("new day, resetting reminders");
        }
        state.notified.clear();
        state.current_day = Some(today);
    }

    let mut db = match Database::load(data_file) {
        Ok(db) => db,
        Err(e) => {
            warn!("could not load medications: {}", e);
            return;
        }
    };

    if db.roll_over(today) {
        if let Err(e) = db.save(data_file) {
            warn!("could not save after day rollover: {}", e);
        }
    }

    // Forget announcements for doses that have since been marked taken.
    state.notified.retain(|key| !db.intake.contains_key(key));

    for reminder in pending_reminders(&db, &state.notified, is_due) {
        let result = Notification::new()
            .summary("Medication Reminder")
            .body(&format!(
                "Time to take: {} ({})\nScheduled for: {} ({})",
                reminder.medication_name, reminder.dose, reminder.scheduled, reminder.label
            ))
            .icon("medication")
            .timeout(0)
            .show();

        match result {
            Ok(_) => {
                info!(
                    "reminder sent: {} - {} at {}",
                    reminder.medication_name, reminder.dose, reminder.scheduled
                );
                state.notified.insert(reminder.key);
            }
            Err(e) => warn!(
                "failed to send notification for {}: {}",
                reminder.medication_name, e
            ),
        }
    }
}

pub fn run_daemon(config: &Config) {
    println!("Daemon started. Checking for medication reminders...");
    println!("Press Ctrl+C to stop.");

    let interval = Duration::from_secs(config.reminder_interval_secs.max(1));
    let mut state = ReminderState::default();

    loop {
        tick(
            &config.data_file,
            &mut state,
            Local::now().date_naive(),
            is_time_due,
        );
        thread::sleep(interval);
    }
}
