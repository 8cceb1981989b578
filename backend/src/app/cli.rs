use std::env;
use std::io;
use std::io::Write;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::app;
use crate::app::MigrationError;
use crate::auth;
use crate::core;
use crate::db::{DbError, NewAccount, Role};

#[rustfmt::skip]
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Migration creation failed")]
    MigrationCreateFailed { #[source] source: MigrationError },

    #[error("Checking migration status failed")]
    MigrationStatusCheckFailed { #[source] source: MigrationError },

    #[error("Running migrations failed")]
    MigrationRunFailed { #[source] source: MigrationError },

    #[error("Reading input failed")]
    InputFailed { #[from] source: io::Error },

    #[error("Password hashing failed: {0}")]
    PasswordHashingFailed(argon2::password_hash::Error),

    #[error("Creating the account failed")]
    AccountCreationFailed { #[source] source: DbError },

    #[error("{0}")]
    InvalidInput(String),
}

#[derive(Parser)]
#[command(name = "migrate")]
#[command(about = "Database maintenance utility", long_about = None)]
struct Cli {
    #[command(subcommand)]
    migrate_sub_command: MigrateSubCommands,
}

#[derive(Subcommand)]
enum MigrateSubCommands {
    /// Create a new migration file
    Create {
        /// Name of the migration
        name: String,
    },
    /// List all embedded migrations
    List,
    /// Check if there are pending migrations
    Status,
    /// Run all pending migrations
    Run,
    /// Create a super admin account that belongs to no tenant
    CreateSuperAdmin {
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
}

/// Runs `<bin> migrate ...` when requested and exits; otherwise returns immediately.
pub async fn run_cli(context: &core::Context) -> Result<(), CliError> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] != "migrate" {
        return Ok(());
    }

    // clap sees `migrate` as the binary name
    let cli = Cli::parse_from(args.iter().skip(1));
    let pool = context.db().pool().await;

    match cli.migrate_sub_command {
        MigrateSubCommands::Create { name } => {
            let filename = app::create_migration(&name).map_err(|e| CliError::MigrationCreateFailed { source: e })?;
            println!("Created new migration file: {filename}");
        }
        MigrateSubCommands::List => {
            let migrations = app::list_migrations();
            if migrations.is_empty() {
                println!("No migrations found.");
            } else {
                println!("Available migrations:");
                for (i, migration) in migrations.iter().enumerate() {
                    println!("{}. {}", i + 1, migration);
                }
            }
        }
        MigrateSubCommands::Status => match app::check_pending_migrations(&pool).await {
            Ok(true) => println!("There are pending migrations that need to be applied."),
            Ok(false) => println!("Database is up to date. No pending migrations."),
            Err(MigrationError::NoMigrationsApplied) => println!("No migrations have been applied yet."),
            Err(e) => return Err(CliError::MigrationStatusCheckFailed { source: e }),
        },
        MigrateSubCommands::Run => {
            app::run_migrations(&pool)
                .await
                .map_err(|e| CliError::MigrationRunFailed { source: e })?;
            println!("Migrations applied successfully.");
        }
        MigrateSubCommands::CreateSuperAdmin {
            email,
            first_name,
            last_name,
        } => {
            print!("Enter password for super admin '{email}': ");
            io::stdout().flush()?;
            let password = rpassword::read_password()?;

            let id = create_super_admin(context, &email, &first_name, &last_name, &password).await?;
            println!("Super admin '{email}' created with id {id}.");
        }
    }

    std::process::exit(0);
}

async fn create_super_admin(
    context: &core::Context,
    email: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
) -> Result<i64, CliError> {
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(CliError::InvalidInput("Email address is invalid".to_string()));
    }
    let min_length = context.settings.recovery.min_password_length;
    if password.chars().count() < min_length {
        return Err(CliError::InvalidInput(format!("Password must be at least {min_length} characters")));
    }

    let password_hash = auth::hash_password(password).map_err(CliError::PasswordHashingFailed)?;
    let new_account = NewAccount {
        email,
        password_hash,
        first_name: first_name.trim().to_string(),
        last_name: last_name.trim().to_string(),
        role: Role::SuperAdmin,
        tenant_id: None,
    };

    let account = context.store.create_account(&new_account).await.map_err(|e| {
        if e.is_unique_violation() {
            CliError::InvalidInput("An account with this email already exists".to_string())
        } else {
            CliError::AccountCreationFailed { source: e }
        }
    })?;
    Ok(account.id)
}
