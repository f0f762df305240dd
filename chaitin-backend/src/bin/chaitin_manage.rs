//! Maintenance commands run against the site database

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chaitin::config::Config;
use chaitin::db::Database;
use chaitin::models::Workshop;
use chaitin::{ics, passwords, validators};

#[derive(Parser, Debug)]
#[command(name = "chaitin-manage")]
#[command(about = "Chaitin School maintenance commands", long_about = None)]
struct Cli {
    /// Database path, defaults to DATABASE_URL
    #[arg(long, value_name = "DATABASE")]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the calendar file of one scheduled workshop
    GenerateIcs {
        /// Workshop id; asked for on stdin when omitted
        #[arg(long, value_name = "ID")]
        workshop: Option<i64>,

        /// Directory the .ics file is written to
        #[arg(long, value_name = "DIR", default_value = ".")]
        output: PathBuf,
    },
    /// Create a back-office account
    CreateSuperuser {
        #[arg(long)]
        username: String,

        #[arg(long, default_value = "")]
        email: String,

        #[arg(long)]
        password: String,
    },
}

/// Choose a workshop by id from the scheduled ones
fn pick_workshop(workshops: &[Workshop], id: i64) -> Option<&Workshop> {
    workshops.iter().find(|w| w.id == id)
}

fn prompt_workshop_id() -> Result<i64, Box<dyn Error>> {
    print!("Choose a workshop: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().parse()?)
}

fn generate_ics(
    db: &Database,
    config: &Config,
    workshop: Option<i64>,
    output: PathBuf,
) -> Result<(), Box<dyn Error>> {
    let workshops = db.list_scheduled_workshops()?;
    for w in &workshops {
        println!("{}: {}", w.id, w.title);
    }

    let id = match workshop {
        Some(id) => id,
        None => prompt_workshop_id()?,
    };
    let workshop = pick_workshop(&workshops, id)
        .ok_or_else(|| format!("No scheduled workshop with id {}", id))?;
    println!("Workshop selected: {}", workshop.title);

    let content = ics::workshop_ics(config, workshop)
        .ok_or_else(|| format!("Workshop {} has no date", workshop.slug))?;
    let path = output.join(format!("{}.ics", workshop.slug));
    std::fs::write(&path, content)?;

    println!("ICS file saved at {}", path.display());
    Ok(())
}

fn create_superuser(
    db: &Database,
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), Box<dyn Error>> {
    validators::validate_username(username)?;
    if db.get_user_by_username(username)?.is_some() {
        return Err(format!("User {} already exists", username).into());
    }

    let hash = passwords::hash_password(password)?;
    let user = db.create_user(username, email, &hash, true)?;
    println!("Superuser {} created (id {})", user.username, user.id);
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let database_url = cli.database.unwrap_or_else(|| config.database_url.clone());
    let db = Database::new(&database_url)?;

    match cli.command {
        Command::GenerateIcs { workshop, output } => generate_ics(&db, &config, workshop, output),
        Command::CreateSuperuser {
            username,
            email,
            password,
        } => create_superuser(&db, &username, &email, &password),
    }
}
