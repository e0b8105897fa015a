use log::debug;
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::{Result, TrackerError};
use crate::product::{parse_product_name, DoseUnit};
use crate::time::{classify_time, to_storage_time, TimeClassification};

/// Upper bound on scheduled doses per day.
pub const MAX_DOSES_PER_DAY: u32 = 10;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Medication {
    pub medication_name: String,
    pub dose_amount: u64,
    pub dose_unit: DoseUnit,
    pub amount_per_day: u32,
    /// One `HH:MM:SS` entry per daily dose.
    pub time_to_take: Vec<String>,
}

impl Medication {
    /// Daypart label and display time for every scheduled dose, in order.
    pub fn schedule(&self) -> Vec<TimeClassification> {
        self.time_to_take.iter().map(|t| classify_time(t)).collect()
    }
}

/// Input for `Database::add_medication`.
#[derive(Debug, Clone, Default)]
pub struct NewMedication {
    /// Product name as picked from the catalogue or typed by hand.
    pub product: String,
    pub amount_per_day: u32,
    pub times: Vec<String>,
    /// Manual dose, used when the product name carries none (or to override it).
    pub dose_amount: Option<u64>,
    pub dose_unit: Option<DoseUnit>,
}

/// Key of the intake mark for one scheduled dose.
pub fn intake_key(medication_name: &str, slot: usize) -> String {
    format!("{}-{}", medication_name, slot)
}

impl Database {
    pub fn find_medication(&self, name: &str) -> Option<&Medication> {
        let name_lower = name.trim().to_lowercase();
        self.medications
            .iter()
            .find(|m| m.medication_name.to_lowercase() == name_lower)
    }

    /// Adds a medication after validating its schedule.
    ///
    /// The dose is extracted from the product name; when that fails the
    /// manual `dose_amount` and `dose_unit` must both be present.
    pub fn add_medication(&mut self, new: NewMedication) -> Result<&Medication> {
        let name = new.product.trim();
        if name.is_empty() {
            return Err(TrackerError::Invalid(
                "medication name cannot be empty".to_string(),
            ));
        }

        if self.find_medication(name).is_some() {
            return Err(TrackerError::AlreadyExists(format!("medication '{}'", name)));
        }

        let (dose_amount, dose_unit) = match parse_product_name(name) {
            Ok(parsed) => {
                debug!("extracted {} {} from '{}'", parsed.dose_amount, parsed.dose_unit, name);
                (
                    new.dose_amount.unwrap_or(parsed.dose_amount),
                    new.dose_unit.unwrap_or(parsed.dose_unit),
                )
            }
            Err(failure) => match (new.dose_amount, new.dose_unit) {
                (Some(amount), Some(unit)) => (amount, unit),
                _ => {
                    return Err(TrackerError::Invalid(format!(
                        "{}; pass --dose and --unit to enter it manually",
                        failure
                    )))
                }
            },
        };

        if new.amount_per_day == 0 || new.amount_per_day > MAX_DOSES_PER_DAY {
            return Err(TrackerError::Invalid(format!(
                "doses per day must be between 1 and {}",
                MAX_DOSES_PER_DAY
            )));
        }

        if new.times.len() != new.amount_per_day as usize {
            return Err(TrackerError::Invalid(format!(
                "expected {} dose time(s), got {}",
                new.amount_per_day,
                new.times.len()
            )));
        }

        let time_to_take = new
            .times
            .iter()
            .map(|t| {
                if t.trim().is_empty() {
                    return Err(TrackerError::Invalid("dose time cannot be empty".to_string()));
                }
                to_storage_time(t).ok_or_else(|| {
                    TrackerError::Invalid(format!(
                        "invalid time '{}' (use e.g. '8:00', '20:30' or 'morning')",
                        t
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.medications.push(Medication {
            medication_name: name.to_string(),
            dose_amount,
            dose_unit,
            amount_per_day: new.amount_per_day,
            time_to_take,
        });

        Ok(&self.medications[self.medications.len() - 1])
    }

    /// Removes a medication together with its intake marks.
    pub fn remove_medication(&mut self, name: &str) -> Result<Medication> {
        let name_lower = name.trim().to_lowercase();
        let index = self
            .medications
            .iter()
            .position(|m| m.medication_name.to_lowercase() == name_lower)
            .ok_or_else(|| TrackerError::NotFound(format!("medication '{}'", name)))?;

        let med = self.medications.remove(index);
        let prefix = format!("{}-", med.medication_name);
        self.intake.retain(|key, _| {
            key.strip_prefix(&prefix)
                .map_or(true, |slot| slot.parse::<usize>().is_err())
        });
        Ok(med)
    }

    /// Sets the intake mark of dose `slot` (0-based). Returns false if the
    /// mark already had that value.
    pub fn set_taken(&mut self, name: &str, slot: usize, taken: bool) -> Result<bool> {
        let med = self
            .find_medication(name)
            .ok_or_else(|| TrackerError::NotFound(format!("medication '{}'", name)))?;

        if slot >= med.time_to_take.len() {
            return Err(TrackerError::Invalid(format!(
                "'{}' has {} dose(s) per day, there is no dose {}",
                med.medication_name,
                med.time_to_take.len(),
                slot + 1
            )));
        }

        let key = intake_key(&med.medication_name, slot);
        let previous = self.intake.get(&key).copied().unwrap_or(false);
        if taken {
            self.intake.insert(key, true);
        } else {
            self.intake.remove(&key);
        }
        Ok(previous != taken)
    }

    pub fn is_taken(&self, medication_name: &str, slot: usize) -> bool {
        self.intake
            .get(&intake_key(medication_name, slot))
            .copied()
            .unwrap_or(false)
    }
}

pub fn print_medications(db: &Database) {
    if db.medications.is_empty() {
        println!("No medications added yet. Use 'medtrack add' to get started.");
        return;
    }

    println!("\nMedications:");
    println!("{}", "=".repeat(60));

    for med in &db.medications {
        println!("\n{}", med.medication_name);
        println!(
            "  {} {} {}x per day",
            med.dose_amount, med.dose_unit, med.amount_per_day
        );
        println!("  Today's schedule:");
        for (slot, entry) in med.schedule().iter().enumerate() {
            let mark = if db.is_taken(&med.medication_name, slot) {
                "✓"
            } else {
                "✗"
            };
            println!(
                "    {}. {:<10} {:>5}  {}",
                slot + 1,
                entry.label,
                entry.normalized,
                mark
            );
        }
    }
    println!();
}
