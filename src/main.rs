use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::debug;

use catalogue::{load_catalogue, print_search_results, search};
use config::Config;
use daemon::run_daemon;
use database::Database;
use habit::{parse_weekday, print_habits, WEEKDAYS};
use medication::{print_medications, NewMedication};
use product::{parse_product_name, DoseUnit};
use time::classify_time;

pub mod catalogue;
pub mod config;
pub mod daemon;
pub mod database;
pub mod error;
pub mod habit;
pub mod heart;
pub mod medication;
pub mod product;
pub mod time;

#[derive(Parser)]
#[command(name = "medtrack")]
#[command(
    about = "Medication, habit and heart-rate tracker",
    long_about = "Track medications and the times you take them, keep weekly habits, and look at hourly heart-rate exports. Everything is saved as JSON for easy import/export."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new medication
    #[command(visible_aliases = ["a", "ad"])]
    Add {
        /// Product name, e.g. "Cetirizine 10 mg, tabletten" (dose is extracted from it)
        product: String,
        /// How many times per day (1-10)
        #[arg(short = 'n', long)]
        per_day: u32,
        /// Time of each dose, repeat once per dose (e.g. "8:00", "20:30", "morning")
        #[arg(short, long = "time", required = true)]
        times: Vec<String>,
        /// Dose amount, when the product name has none
        #[arg(short, long)]
        dose: Option<u64>,
        /// Dose unit (mg, g, mcg, µg, ml, IU), when the product name has none
        #[arg(short, long)]
        unit: Option<DoseUnit>,
    },
    /// Remove a medication
    #[command(visible_alias = "r")]
    Remove {
        /// Name of the medication
        name: String,
    },
    /// List medications with today's schedule
    #[command(visible_aliases = ["l", "s", "show"])]
    List,
    /// Mark a dose as taken
    #[command(visible_alias = "t")]
    Take {
        name: String,
        /// Which dose of the day (1-based)
        #[arg(default_value_t = 1)]
        dose: usize,
    },
    /// Mark a dose as NOT taken (undo)
    #[command(visible_alias = "u")]
    Untake {
        name: String,
        /// Which dose of the day (1-based)
        #[arg(default_value_t = 1)]
        dose: usize,
    },
    /// Manage weekly habits
    #[command(visible_alias = "hb")]
    Habit {
        #[command(subcommand)]
        action: HabitCommands,
    },
    /// Search the medicine catalogue by product name
    #[command(visible_alias = "f")]
    Search {
        term: String,
        /// Catalogue CSV (defaults to `catalogue_file` from the config)
        #[arg(long)]
        catalogue: Option<PathBuf>,
    },
    /// Show hourly heart rate and heart rate variability
    #[command(visible_alias = "hr")]
    Heart {
        #[arg(long)]
        heart_rate: Option<PathBuf>,
        #[arg(long)]
        hrv: Option<PathBuf>,
    },
    /// Extract name, dose and form from a product name
    #[command(visible_alias = "p")]
    Parse { product: String },
    /// Show the part of day for one or more times
    #[command(visible_alias = "c")]
    Classify {
        #[arg(required = true)]
        times: Vec<String>,
    },
    /// Start the background daemon for reminders
    #[command(visible_alias = "d")]
    Daemon,
}

#[derive(Subcommand)]
enum HabitCommands {
    /// Add a habit with a weekly goal
    #[command(visible_alias = "a")]
    Add {
        title: String,
        /// Times per week
        goal: String,
    },
    /// Remove a habit
    #[command(visible_alias = "r")]
    Remove { id: u32 },
    /// List habits and this week's marks
    #[command(visible_alias = "l")]
    List,
    /// Toggle a day for a habit
    #[command(visible_alias = "c")]
    Check {
        id: u32,
        /// mon..sun or 0-6 (default: today)
        day: Option<String>,
    },
}

/// Loads the database with stale intake and habit marks already cleared.
fn open_database(config: &Config) -> Result<Database> {
    let mut db = Database::load(&config.data_file)
        .with_context(|| format!("failed to load {}", config.data_file.display()))?;
    db.roll_over(Local::now().date_naive());
    Ok(db)
}

fn save_database(config: &Config, db: &Database) -> Result<()> {
    db.save(&config.data_file)
        .with_context(|| format!("failed to save {}", config.data_file.display()))
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    debug!("using data file {}", config.data_file.display());

    match cli.command {
        Commands::Add {
            product,
            per_day,
            times,
            dose,
            unit,
        } => {
            let mut db = open_database(&config)?;
            let med = db.add_medication(NewMedication {
                product,
                amount_per_day: per_day,
                times,
                dose_amount: dose,
                dose_unit: unit,
            })?;
            println!(
                "Added medication: {} ({} {}, {}x per day)",
                med.medication_name, med.dose_amount, med.dose_unit, med.amount_per_day
            );
            save_database(&config, &db)?;
        }
        Commands::Remove { name } => {
            let mut db = open_database(&config)?;
            let med = db.remove_medication(&name)?;
            save_database(&config, &db)?;
            println!("Removed medication: {}", med.medication_name);
        }
        Commands::List => {
            let db = open_database(&config)?;
            print_medications(&db);
        }
        Commands::Take { name, dose } | Commands::Untake { name, dose }
            if dose == 0 =>
        {
            bail!("dose numbers start at 1 (got 0 for '{}')", name);
        }
        Commands::Take { name, dose } => {
            let mut db = open_database(&config)?;
            if db.set_taken(&name, dose - 1, true)? {
                save_database(&config, &db)?;
                println!("Marked dose {} of '{}' as taken", dose, name);
            } else {
                println!("Dose {} of '{}' is already marked as taken", dose, name);
            }
        }
        Commands::Untake { name, dose } => {
            let mut db = open_database(&config)?;
            if db.set_taken(&name, dose - 1, false)? {
                save_database(&config, &db)?;
                println!("Unmarked dose {} of '{}' as taken", dose, name);
            } else {
                println!("Dose {} of '{}' is not currently marked as taken", dose, name);
            }
        }
        Commands::Habit { action } => run_habit(&config, action)?,
        Commands::Search { term, catalogue } => {
            let Some(path) = catalogue.or_else(|| config.catalogue_file.clone()) else {
                bail!("no catalogue file configured; pass --catalogue or set catalogue_file");
            };
            let entries = load_catalogue(&path)?;
            let results = search(&entries, &term);
            print_search_results(&results, &term);
        }
        Commands::Heart { heart_rate, hrv } => {
            let heart_rate = heart_rate.unwrap_or_else(|| config.heart_rate_file.clone());
            let hrv = hrv.unwrap_or_else(|| config.hrv_file.clone());
            heart::print_overview(&heart_rate, &hrv);
        }
        Commands::Parse { product } => match parse_product_name(&product) {
            Ok(parsed) => {
                println!("Name:  {}", parsed.name);
                println!("Dose:  {} {}", parsed.dose_amount, parsed.dose_unit);
                println!("Form:  {}", parsed.form);
            }
            Err(failure) => {
                println!("{}", failure);
                println!("Expected: <name> <amount> <unit>, <form> (units: mg, g, mcg, µg, ml, IU)");
            }
        },
        Commands::Classify { times } => {
            for time in times {
                let classification = classify_time(&time);
                println!("{:>10}  {}", classification.normalized, classification.label);
            }
        }
        Commands::Daemon => run_daemon(&config),
    }

    Ok(())
}

fn run_habit(config: &Config, action: HabitCommands) -> Result<()> {
    let mut db = open_database(config)?;

    match action {
        HabitCommands::Add { title, goal } => {
            let habit = db.add_habit(&title, &goal)?;
            println!(
                "Added habit [{}] {} ({} times per week)",
                habit.id, habit.habit_title, habit.goal
            );
        }
        HabitCommands::Remove { id } => {
            let habit = db.remove_habit(id)?;
            println!("Removed habit [{}] {}", habit.id, habit.habit_title);
        }
        HabitCommands::List => {
            print_habits(&db);
            return Ok(());
        }
        HabitCommands::Check { id, day } => {
            let Some(day_index) = parse_weekday(day.as_deref()) else {
                bail!("unknown day '{}' (use mon..sun or 0-6)", day.unwrap_or_default());
            };
            let checked = db.toggle_habit_day(id, day_index)?;
            println!(
                "Habit {} {} for {}",
                id,
                if checked { "checked" } else { "unchecked" },
                WEEKDAYS[day_index]
            );
        }
    }

    save_database(config, &db)
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
