use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use services::ProgressServiceConfig;

#[derive(Debug, Parser)]
#[command(author, version, about = "Chapter progress tracking service")]
pub struct Cli {
    /// SQLite database URL.
    #[arg(
        long,
        env = "PROGRESS_DB_URL",
        default_value = "sqlite:progress.sqlite3?mode=rwc",
        global = true
    )]
    pub db: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Create a demo course roster and one enrollment.
    Seed(SeedArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, env = "PROGRESS_ADDR", default_value = "127.0.0.1:8080")]
    pub addr: SocketAddr,

    /// Compare-and-swap attempts per request before answering 409.
    #[arg(long, env = "PROGRESS_MAX_ATTEMPTS", default_value_t = 5)]
    pub max_attempts: u32,

    #[arg(long, env = "PROGRESS_REQUEST_TIMEOUT_MS", default_value_t = 5_000)]
    pub request_timeout_ms: u64,
}

impl ServeArgs {
    #[must_use]
    pub fn service_config(&self) -> ProgressServiceConfig {
        ProgressServiceConfig::default().with_max_attempts(self.max_attempts)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Args)]
pub struct SeedArgs {
    #[arg(long, default_value_t = 1)]
    pub course_id: u64,

    /// Number of published chapters; content types rotate video, pdf, external resource.
    #[arg(long, default_value_t = 4)]
    pub chapters: u32,

    /// Id of the first chapter; the rest follow consecutively.
    #[arg(long, default_value_t = 1)]
    pub first_chapter_id: u64,

    #[arg(long, default_value_t = 1)]
    pub enrollment_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["progress-server", "serve"]).unwrap();
        assert_eq!(cli.db, "sqlite:progress.sqlite3?mode=rwc");
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.addr.to_string(), "127.0.0.1:8080");
        assert_eq!(args.service_config().max_attempts(), 5);
        assert_eq!(args.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let argv = ["progress-server", "serve", "--max-attempts", "0"];
        let cli = Cli::try_parse_from(argv).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.service_config().max_attempts(), 1);
    }

    #[test]
    fn db_flag_is_global() {
        let cli = Cli::try_parse_from([
            "progress-server",
            "seed",
            "--db",
            "sqlite::memory:",
            "--chapters",
            "6",
        ])
        .unwrap();
        assert_eq!(cli.db, "sqlite::memory:");
        let Command::Seed(args) = cli.command else {
            panic!("expected seed");
        };
        assert_eq!(args.chapters, 6);
    }
}
