use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use timetrack::config::{AppConfig, DEFAULT_SESSION_COOKIE_NAME, SessionConfig};

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve { config: AppConfig, json_logs: bool },
    Exit(i32),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum ConfigError {
    #[error("{flag} cannot be empty")]
    Empty { flag: &'static str },
    #[error("invalid {flag} '{value}'; expected <number>[s|m|h|d]")]
    InvalidDuration { flag: &'static str, value: String },
    #[error("{flag} must be greater than 0")]
    NotPositive { flag: &'static str },
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Migrate) => return RunOutcome::Exit(run_migrate(&cli.db_path)),
        Some(Command::HashPassword(ref args)) => {
            return RunOutcome::Exit(run_hash_password(args));
        }
        None => {}
    }

    match resolve_config(&cli) {
        Ok(config) => RunOutcome::Serve {
            config,
            json_logs: cli.json_logs,
        },
        Err(err) => {
            eprintln!("error: {err}");
            RunOutcome::Exit(2)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "timetrack",
    version,
    about = "Time tracker with live timer updates"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, env = "TIMETRACK_APP_NAME", default_value = "Timetrack")]
    app_name: String,
    #[arg(long, env = "TIMETRACK_DB_PATH", default_value = "timetrack.db")]
    db_path: PathBuf,
    #[arg(long, env = "TIMETRACK_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,
    #[arg(long, env = "TIMETRACK_REFRESH_INTERVAL")]
    refresh_interval: Option<String>,
    #[arg(long, env = "TIMETRACK_SESSION_TTL")]
    session_ttl: Option<String>,
    #[arg(long, env = "TIMETRACK_COOKIE_NAME")]
    cookie_name: Option<String>,
    #[arg(long, env = "TIMETRACK_COOKIE_SECURE")]
    cookie_secure: bool,
    #[arg(long, env = "TIMETRACK_JSON_LOGS")]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply database migrations and exit.
    Migrate,
    /// Print an argon2 verifier for a password.
    HashPassword(HashPasswordArgs),
}

#[derive(Args, Debug)]
struct HashPasswordArgs {
    password: String,
}

fn run_migrate(db_path: &std::path::Path) -> i32 {
    match timetrack::store::Store::open(db_path) {
        Ok(_) => {
            println!("database at {} is up to date", db_path.display());
            0
        }
        Err(err) => {
            eprintln!("failed to migrate database: {err}");
            1
        }
    }
}

fn run_hash_password(args: &HashPasswordArgs) -> i32 {
    match timetrack::auth::hash_password(&args.password) {
        Ok(hash) => {
            println!("{hash}");
            0
        }
        Err(err) => {
            eprintln!("failed to hash password: {err}");
            1
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    if let Some(name) = cli.cookie_name.as_deref()
        && name.trim().is_empty()
    {
        return Err(ConfigError::Empty {
            flag: "cookie name",
        });
    }

    let refresh_interval = match cli.refresh_interval.as_deref() {
        Some(raw) => {
            let interval = parse_duration("refresh interval", raw)?;
            std::time::Duration::try_from(interval).map_err(|_| {
                ConfigError::NotPositive {
                    flag: "refresh interval",
                }
            })?
        }
        None => timetrack::config::DEFAULT_REFRESH_INTERVAL,
    };
    let ttl = match cli.session_ttl.as_deref() {
        Some(raw) => parse_duration("session ttl", raw)?,
        None => SessionConfig::default().ttl,
    };
    let cookie_name = cli
        .cookie_name
        .as_deref()
        .map(|name| name.trim().to_string())
        .unwrap_or_else(|| DEFAULT_SESSION_COOKIE_NAME.to_string());

    Ok(AppConfig {
        app_name: cli.app_name.clone(),
        db_path: cli.db_path.clone(),
        bind: cli.bind,
        refresh_interval,
        session: SessionConfig {
            cookie_name,
            cookie_secure: cli.cookie_secure,
            ttl,
        },
    })
}

fn parse_duration(flag: &'static str, raw: &str) -> Result<time::Duration, ConfigError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ConfigError::Empty { flag });
    }
    let invalid = || ConfigError::InvalidDuration {
        flag,
        value: value.to_string(),
    };

    let (amount, unit) = match value.chars().last() {
        Some(ch) if ch.is_ascii_alphabetic() => {
            (&value[..value.len() - 1], ch.to_ascii_lowercase())
        }
        _ => (value, 's'),
    };

    let amount: i64 = amount.parse().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(ConfigError::NotPositive { flag });
    }

    match unit {
        's' => Ok(time::Duration::seconds(amount)),
        'm' => Ok(time::Duration::minutes(amount)),
        'h' => Ok(time::Duration::hours(amount)),
        'd' => Ok(time::Duration::days(amount)),
        _ => Err(invalid()),
    }
}
