//! PlayStreak - practice and performance tracking for musicians
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use playstreak::config::{playstreak_home, Config};
use playstreak::core::{ActivityType, ItemType, PieceId};
use playstreak::error::{exit_codes, PlayStreakError};
use playstreak::journal::Journal;
use playstreak::stats::Tier;
use playstreak::storage::FileStore;

// =============================================================================
// CLI Definition
// =============================================================================

/// PlayStreak - practice and performance tracking for musicians
#[derive(Parser)]
#[command(name = "playstreak")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add, list, favorite or remove pieces and techniques
    Piece {
        #[command(subcommand)]
        action: PieceCommands,
    },

    /// Record a practice session or performance
    Log {
        /// Piece or technique ID
        piece_id: PieceId,
        /// Practice or performance
        #[arg(long, short, value_enum, default_value = "practice")]
        kind: ActivityKindArg,
        /// Self-rated level (practice 1-4, performance 1-3)
        #[arg(long, short)]
        level: u8,
        /// Duration in minutes
        #[arg(long, short)]
        minutes: Option<u32>,
        /// Performance tag such as "online" or "live"
        #[arg(long)]
        performance_type: Option<String>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
        /// When it happened (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Change a logged activity
    Edit {
        /// Activity ID
        activity_id: u64,
        /// Move the activity to another piece
        #[arg(long)]
        piece: Option<PieceId>,
        /// New level
        #[arg(long, short)]
        level: Option<u8>,
        /// New duration in minutes
        #[arg(long, short)]
        minutes: Option<u32>,
        /// Mark the duration as not recorded
        #[arg(long, conflicts_with = "minutes")]
        clear_minutes: bool,
        /// New performance tag
        #[arg(long)]
        performance_type: Option<String>,
        /// New notes
        #[arg(long)]
        notes: Option<String>,
        /// New timestamp (RFC 3339)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Delete a logged activity
    Delete {
        /// Activity ID
        activity_id: u64,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show what to practice or perform next
    Suggest {
        /// Use this tier's caps instead of the configured tier
        #[arg(long, value_enum)]
        tier: Option<TierArg>,
        /// Also list abandoned pieces
        #[arg(long)]
        abandoned: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show the current and longest practice streak
    Streak {
        /// List every past run longer than one day
        #[arg(long)]
        history: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// List achievements, unlocking any the history supports
    Achievements {
        /// Hide locked achievements
        #[arg(long)]
        unlocked: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// List logged activities, newest first, with this week's totals
    History {
        /// Only the last N days, today included
        #[arg(long, short)]
        days: Option<u32>,
        /// Only list performances
        #[arg(long)]
        performances_only: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show cached per-piece statistics
    Stats {
        /// Only show this piece
        #[arg(long)]
        piece: Option<PieceId>,
        /// Compare cached statistics with the activity log
        #[arg(long)]
        validate: bool,
        /// Recompute every piece from the activity log
        #[arg(long)]
        rebuild: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

#[derive(Subcommand)]
enum PieceCommands {
    /// Add a piece or technique
    Add {
        /// Display name
        name: String,
        /// Track it as a technique exercise
        #[arg(long)]
        technique: bool,
        /// Mark it as a favorite
        #[arg(long, short)]
        favorite: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// List pieces and techniques
    List {
        /// Only favorites
        #[arg(long)]
        favorites: bool,
        /// Only this item type
        #[arg(long = "type", value_enum)]
        item_type: Option<ItemTypeArg>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Mark or unmark a favorite
    Favorite {
        /// Piece or technique ID
        id: PieceId,
        /// Clear the favorite flag instead
        #[arg(long)]
        off: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Remove a piece and all its activities
    Remove {
        /// Piece or technique ID
        id: PieceId,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ActivityKindArg {
    Practice,
    Performance,
}

impl From<ActivityKindArg> for ActivityType {
    fn from(kind: ActivityKindArg) -> Self {
        match kind {
            ActivityKindArg::Practice => ActivityType::Practice,
            ActivityKindArg::Performance => ActivityType::Performance,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ItemTypeArg {
    Piece,
    Technique,
}

impl From<ItemTypeArg> for ItemType {
    fn from(arg: ItemTypeArg) -> Self {
        match arg {
            ItemTypeArg::Piece => ItemType::Piece,
            ItemTypeArg::Technique => ItemType::Technique,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TierArg {
    Free,
    Pro,
}

impl From<TierArg> for Tier {
    fn from(arg: TierArg) -> Self {
        match arg {
            TierArg::Free => Tier::Free,
            TierArg::Pro => Tier::Pro,
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    init_logging();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("playstreak error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Install the stderr log subscriber.
///
/// Filtered by `PLAYSTREAK_LOG` (EnvFilter syntax), `warn` by default.
fn init_logging() {
    let filter =
        EnvFilter::try_from_env("PLAYSTREAK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.playstreak/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("playstreak panic: {}", info);

        if let Some(home) = playstreak_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let config = Config::load_from_cwd(&cwd);

    match cli.command {
        Commands::Piece { action } => run_piece(action, &config),
        Commands::Log {
            piece_id,
            kind,
            level,
            minutes,
            performance_type,
            notes,
            at,
            json,
            quiet,
        } => {
            use playstreak::cli::activity::{ActivityAction, LogRequest};
            let action = ActivityAction::Log(LogRequest {
                piece_id,
                activity_type: kind.into(),
                level,
                minutes,
                performance_type,
                notes,
                at,
            });
            run_activity(action, json, quiet, &config)
        }
        Commands::Edit {
            activity_id,
            piece,
            level,
            minutes,
            clear_minutes,
            performance_type,
            notes,
            at,
            json,
            quiet,
        } => {
            use playstreak::cli::activity::{ActivityAction, EditRequest};
            let action = ActivityAction::Edit(EditRequest {
                activity_id,
                piece_id: piece,
                level,
                minutes,
                clear_minutes,
                performance_type,
                notes,
                at,
            });
            run_activity(action, json, quiet, &config)
        }
        Commands::Delete {
            activity_id,
            json,
            quiet,
        } => {
            use playstreak::cli::activity::ActivityAction;
            run_activity(ActivityAction::Delete { activity_id }, json, quiet, &config)
        }
        Commands::Suggest {
            tier,
            abandoned,
            json,
            quiet,
        } => run_suggest(tier.map(Tier::from), abandoned, json, quiet, config),
        Commands::Streak {
            history,
            json,
            quiet,
        } => run_streak(history, json, quiet, &config),
        Commands::Achievements {
            unlocked,
            json,
            quiet,
        } => run_achievements(unlocked, json, quiet, &config),
        Commands::History {
            days,
            performances_only,
            json,
            quiet,
        } => run_history(days, performances_only, json, quiet, &config),
        Commands::Stats {
            piece,
            validate,
            rebuild,
            json,
            quiet,
        } => run_stats(piece, validate, rebuild, json, quiet, &config),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Open the journal over the configured data file.
fn open_journal(config: &Config) -> Result<Journal<FileStore>, Box<dyn std::error::Error>> {
    let path = config.data_file().ok_or_else(|| {
        PlayStreakError::config("Could not determine data file location (no home directory)")
    })?;
    Ok(Journal::new(FileStore::open(path)?))
}

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

fn print_output(formatted: String) {
    if !formatted.is_empty() {
        println!("{}", formatted);
    }
}

fn run_piece(
    action: PieceCommands,
    config: &Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use playstreak::cli::pieces::{PieceAction, PieceCommand, PieceOptions};

    let options = match action {
        PieceCommands::Add {
            name,
            technique,
            favorite,
            json,
            quiet,
        } => PieceOptions {
            json,
            quiet,
            action: PieceAction::Add {
                name,
                item_type: if technique {
                    ItemType::Technique
                } else {
                    ItemType::Piece
                },
                favorite,
            },
        },
        PieceCommands::List {
            favorites,
            item_type,
            json,
            quiet,
        } => PieceOptions {
            json,
            quiet,
            action: PieceAction::List {
                favorites_only: favorites,
                item_type: item_type.map(ItemType::from),
            },
        },
        PieceCommands::Favorite {
            id,
            off,
            json,
            quiet,
        } => PieceOptions {
            json,
            quiet,
            action: PieceAction::Favorite {
                piece_id: id,
                favorite: !off,
            },
        },
        PieceCommands::Remove { id, json, quiet } => PieceOptions {
            json,
            quiet,
            action: PieceAction::Remove { piece_id: id },
        },
    };

    let cmd = PieceCommand::new(open_journal(config)?);
    let output = cmd.run(&options);
    print_output(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_activity(
    action: playstreak::cli::activity::ActivityAction,
    json: bool,
    quiet: bool,
    config: &Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use playstreak::cli::activity::{ActivityCommand, ActivityOptions};

    let cmd = ActivityCommand::new(open_journal(config)?);
    let options = ActivityOptions {
        json,
        quiet,
        action,
    };

    let output = cmd.run(&options);
    print_output(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_suggest(
    tier: Option<Tier>,
    abandoned: bool,
    json: bool,
    quiet: bool,
    config: Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use playstreak::cli::suggest::{SuggestCommand, SuggestOptions};

    let journal = open_journal(&config)?;
    let cmd = SuggestCommand::new(journal, config);
    let options = SuggestOptions {
        json,
        quiet,
        tier,
        abandoned,
    };

    let output = cmd.run(&options);
    print_output(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_streak(
    history: bool,
    json: bool,
    quiet: bool,
    config: &Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use playstreak::cli::streak::{StreakCommand, StreakOptions};

    let cmd = StreakCommand::new(open_journal(config)?);
    let options = StreakOptions {
        json,
        quiet,
        history,
    };

    let output = cmd.run(&options);
    print_output(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_achievements(
    unlocked_only: bool,
    json: bool,
    quiet: bool,
    config: &Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use playstreak::cli::achievements::{AchievementsCommand, AchievementsOptions};

    let cmd = AchievementsCommand::new(open_journal(config)?);
    let options = AchievementsOptions {
        json,
        quiet,
        unlocked_only,
    };

    let output = cmd.run(&options);
    print_output(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_history(
    days: Option<u32>,
    performances_only: bool,
    json: bool,
    quiet: bool,
    config: &Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use playstreak::cli::history::{HistoryCommand, HistoryOptions};

    let cmd = HistoryCommand::new(open_journal(config)?);
    let options = HistoryOptions {
        json,
        quiet,
        days,
        performances_only,
    };

    let output = cmd.run(&options);
    print_output(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_stats(
    piece_id: Option<PieceId>,
    validate: bool,
    rebuild: bool,
    json: bool,
    quiet: bool,
    config: &Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use playstreak::cli::stats::{StatsCommand, StatsOptions};

    let cmd = StatsCommand::new(open_journal(config)?);
    let options = StatsOptions {
        json,
        quiet,
        piece_id,
        validate,
        rebuild,
    };

    let output = cmd.run(&options);
    print_output(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_success_to_exit_code() {
        assert_eq!(
            success_to_exit_code(true),
            ExitCode::from(exit_codes::SUCCESS as u8)
        );
        assert_eq!(
            success_to_exit_code(false),
            ExitCode::from(exit_codes::ERROR as u8)
        );
    }

    #[test]
    fn test_value_enum_conversions() {
        assert_eq!(ActivityType::from(ActivityKindArg::Performance), ActivityType::Performance);
        assert_eq!(ItemType::from(ItemTypeArg::Technique), ItemType::Technique);
        assert_eq!(Tier::from(TierArg::Pro), Tier::Pro);
    }

    #[test]
    fn test_cli_parse_piece_add() {
        let cli = Cli::parse_from(["playstreak", "piece", "add", "Clair de Lune", "--favorite"]);
        match cli.command {
            Commands::Piece {
                action:
                    PieceCommands::Add {
                        name,
                        technique,
                        favorite,
                        ..
                    },
            } => {
                assert_eq!(name, "Clair de Lune");
                assert!(!technique);
                assert!(favorite);
            }
            _ => panic!("Expected piece add"),
        }
    }

    #[test]
    fn test_cli_parse_piece_list_type() {
        let cli = Cli::parse_from(["playstreak", "piece", "list", "--type", "technique"]);
        match cli.command {
            Commands::Piece {
                action: PieceCommands::List { item_type, .. },
            } => assert_eq!(item_type, Some(ItemTypeArg::Technique)),
            _ => panic!("Expected piece list"),
        }
    }

    #[test]
    fn test_cli_parse_log_defaults_to_practice() {
        let cli = Cli::parse_from(["playstreak", "log", "3", "--level", "4", "-m", "30"]);
        match cli.command {
            Commands::Log {
                piece_id,
                kind,
                level,
                minutes,
                at,
                ..
            } => {
                assert_eq!(piece_id, 3);
                assert_eq!(kind, ActivityKindArg::Practice);
                assert_eq!(level, 4);
                assert_eq!(minutes, Some(30));
                assert!(at.is_none());
            }
            _ => panic!("Expected log"),
        }
    }

    #[test]
    fn test_cli_parse_log_performance_at() {
        let cli = Cli::parse_from([
            "playstreak",
            "log",
            "1",
            "--kind",
            "performance",
            "-l",
            "3",
            "--performance-type",
            "online",
            "--at",
            "2024-06-01T19:30:00Z",
        ]);
        match cli.command {
            Commands::Log {
                kind,
                performance_type,
                at,
                ..
            } => {
                assert_eq!(kind, ActivityKindArg::Performance);
                assert_eq!(performance_type.as_deref(), Some("online"));
                assert_eq!(at, Some(Utc.with_ymd_and_hms(2024, 6, 1, 19, 30, 0).unwrap()));
            }
            _ => panic!("Expected log"),
        }
    }

    #[test]
    fn test_cli_parse_log_requires_level() {
        assert!(Cli::try_parse_from(["playstreak", "log", "1"]).is_err());
    }

    #[test]
    fn test_cli_parse_edit_moves_piece() {
        let cli = Cli::parse_from(["playstreak", "edit", "12", "--piece", "4"]);
        match cli.command {
            Commands::Edit {
                activity_id,
                piece,
                level,
                ..
            } => {
                assert_eq!(activity_id, 12);
                assert_eq!(piece, Some(4));
                assert!(level.is_none());
            }
            _ => panic!("Expected edit"),
        }
    }

    #[test]
    fn test_cli_parse_edit_clear_minutes() {
        let cli = Cli::parse_from(["playstreak", "edit", "3", "--clear-minutes"]);
        match cli.command {
            Commands::Edit {
                minutes,
                clear_minutes,
                ..
            } => {
                assert!(minutes.is_none());
                assert!(clear_minutes);
            }
            _ => panic!("Expected edit"),
        }

        assert!(Cli::try_parse_from(["playstreak", "edit", "3", "-m", "20", "--clear-minutes"]).is_err());
    }

    #[test]
    fn test_cli_parse_suggest_tier() {
        let cli = Cli::parse_from(["playstreak", "suggest", "--tier", "pro", "--abandoned", "-j"]);
        match cli.command {
            Commands::Suggest {
                tier,
                abandoned,
                json,
                ..
            } => {
                assert_eq!(tier, Some(TierArg::Pro));
                assert!(abandoned);
                assert!(json);
            }
            _ => panic!("Expected suggest"),
        }
    }

    #[test]
    fn test_cli_parse_stats_flags() {
        let cli = Cli::parse_from(["playstreak", "stats", "--validate", "--rebuild"]);
        match cli.command {
            Commands::Stats {
                validate, rebuild, piece, ..
            } => {
                assert!(validate);
                assert!(rebuild);
                assert!(piece.is_none());
            }
            _ => panic!("Expected stats"),
        }
    }

    #[test]
    fn test_cli_parse_streak_and_achievements() {
        let cli = Cli::parse_from(["playstreak", "streak", "--history"]);
        assert!(matches!(cli.command, Commands::Streak { history: true, .. }));

        let cli = Cli::parse_from(["playstreak", "achievements", "--unlocked", "-q"]);
        assert!(matches!(
            cli.command,
            Commands::Achievements {
                unlocked: true,
                quiet: true,
                ..
            }
        ));
    }

    #[test]
    fn test_cli_parse_history() {
        let cli = Cli::parse_from(["playstreak", "history", "-d", "7", "--performances-only"]);
        match cli.command {
            Commands::History {
                days,
                performances_only,
                json,
                ..
            } => {
                assert_eq!(days, Some(7));
                assert!(performances_only);
                assert!(!json);
            }
            _ => panic!("Expected history"),
        }

        let cli = Cli::parse_from(["playstreak", "history"]);
        assert!(matches!(
            cli.command,
            Commands::History {
                days: None,
                performances_only: false,
                ..
            }
        ));
    }

    #[test]
    fn test_cli_debug_assert() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
