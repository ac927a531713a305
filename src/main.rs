use clap::Parser;
use ghist::cli::{Cli, Commands, commands};
use ghist::config::{CliOverrides, Config};
use ghist::logging::init_logging;
use ghist::sync::SyncMode;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let overrides = CliOverrides {
        db: cli.db.clone(),
        token_file: cli.token_file.clone(),
        project: cli.project.clone(),
    };
    let config = match Config::load(&overrides) {
        Ok(config) => config,
        Err(e) => handle_error(&e),
    };

    let result = match cli.command {
        Commands::Init => commands::init::execute(&config),
        Commands::Add { name } => commands::add::execute(&config, &name),
        Commands::Sync { projects } => {
            commands::sync::execute(&config, &projects, SyncMode::Incremental)
        }
        Commands::Resync { projects } => {
            commands::sync::execute(&config, &projects, SyncMode::Full)
        }
        Commands::Refill { projects } => commands::refill::execute(&config, &projects),
        Commands::Status => commands::status::execute(&config, cli.json),
        Commands::Show { number } => commands::show::execute(&config, number, cli.json),
        Commands::List { query } => commands::list::execute(&config, &query, cli.json),
        Commands::Edit { number } => commands::edit::execute_edit(&config, number),
        Commands::New => commands::edit::execute_new(&config),
        Commands::Bulk { query } => commands::edit::execute_bulk(&config, &query),
        Commands::Milestones => commands::milestones::execute(&config, cli.json),
        Commands::Report => commands::report::execute(&config, cli.json),
    };

    if let Err(e) = result {
        handle_error(&e);
    }
}

fn handle_error(err: &ghist::GhistError) -> ! {
    eprintln!("Error: {err}");
    if let Some(hint) = err.suggestion() {
        eprintln!("  {hint}");
    }
    std::process::exit(err.exit_code());
}
