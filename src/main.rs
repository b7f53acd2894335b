use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use weather_locator::location::{
    FavoriteOutcome, GeocodingClient, LocationService, NominatimClient, ResolutionFailure,
    StaticGeocoder, UserLocationStore, DEFAULT_MAX_SUGGESTIONS,
};
use weather_locator::{repl, server};

/// Weather Locator: resolve place names and coordinates for weather lookups.
///
/// Examples:
///   locator resolve "nyc"
///   locator suggest "spring" --limit 8
///   locator reverse 40.7128 -74.0060
///   locator default set "Chicago, IL"
///   locator serve --port 3000
#[derive(Parser)]
#[command(name = "locator", version, about, long_about = None)]
struct Cli {
    /// User data file. Defaults to ~/.weather-locator/user_locations.json.
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    /// Offline mode: only cached locations resolve.
    #[arg(long, global = true)]
    offline: bool,

    /// Do not write changes back to the data file.
    #[arg(long, global = true)]
    no_save: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a free-text location.
    Resolve { input: String },
    /// Coordinates for a weather lookup (saved default when no input).
    Weather { input: Option<String> },
    /// Autocomplete suggestions for partial input.
    Suggest {
        partial: String,
        #[arg(long, short = 'n', default_value_t = DEFAULT_MAX_SUGGESTIONS)]
        limit: usize,
    },
    /// Address at a coordinate pair.
    Reverse {
        #[arg(allow_hyphen_values = true)]
        lat: String,
        #[arg(allow_hyphen_values = true)]
        lon: String,
    },
    /// Show or set the default location.
    Default {
        #[command(subcommand)]
        action: Option<DefaultAction>,
    },
    /// Manage favorite locations.
    Favorite {
        #[command(subcommand)]
        action: FavoriteAction,
    },
    /// List favorite locations.
    Favorites,
    /// List recent searches.
    History,
    /// Drop all cached resolutions.
    ClearCache,
    /// Drop the search history.
    ClearHistory,
    /// Counts of saved state.
    Summary,
    /// Interactive search with suggestions.
    Interactive,
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, short = 'p', default_value_t = 3000)]
        port: u16,
    },
}

#[derive(Subcommand)]
enum DefaultAction {
    /// Resolve and save as the default location.
    Set { input: String },
}

#[derive(Subcommand)]
enum FavoriteAction {
    /// Resolve and add to favorites.
    Add { input: String },
}

type Service = LocationService<Box<dyn GeocodingClient + Send>>;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("weather_locator=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut service = build_service(&cli);

    match cli.command {
        Command::Resolve { input } => match service.resolve(&input) {
            Ok(resolved) => {
                eprintln!("  {} [{}]", resolved.location.short_name, resolved.source);
                print_json(&resolved);
            }
            Err(failure) => fail(&failure),
        },
        Command::Weather { input } => match service.weather_location(input.as_deref()) {
            Ok(location) => print_json(&location),
            Err(failure) => fail(&failure),
        },
        Command::Suggest { partial, limit } => {
            let suggestions = service.suggest(&partial, limit);
            if suggestions.is_empty() {
                eprintln!("No suggestions found for '{}'", partial);
            }
            for (i, s) in suggestions.iter().enumerate() {
                println!("{}. {} ({})", i + 1, s.short_name, s.place_type);
            }
        }
        Command::Reverse { lat, lon } => match service.reverse(&lat, &lon) {
            Ok(address) => print_json(&address),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Command::Default { action: None } => match &service.store().state().default_location {
            Some(saved) => print_json(saved),
            None => {
                eprintln!("No default location set.");
                std::process::exit(1);
            }
        },
        Command::Default {
            action: Some(DefaultAction::Set { input }),
        } => match service.set_default_location(&input) {
            Ok(record) => println!("Default location set to {}", record.short_name),
            Err(failure) => fail(&failure),
        },
        Command::Favorite {
            action: FavoriteAction::Add { input },
        } => match service.add_favorite(&input) {
            Ok((record, FavoriteOutcome::Added)) => println!("Added '{}' to favorites", record.short_name),
            Ok((record, FavoriteOutcome::AlreadyExists)) => {
                println!("'{}' is already in favorites", record.short_name)
            }
            Err(failure) => fail(&failure),
        },
        Command::Favorites => print_json(&service.store().state().favorites),
        Command::History => print_json(&service.store().state().history),
        Command::ClearCache => {
            service.clear_cache();
            println!("Location cache cleared.");
        }
        Command::ClearHistory => {
            service.clear_history();
            println!("Search history cleared.");
        }
        Command::Summary => print_json(&service.summary()),
        Command::Interactive => {
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            if let Err(e) = repl::run(&mut service, stdin.lock(), &mut stdout) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Command::Serve { host, port } => {
            let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
                eprintln!("Error: Cannot start runtime: {}", e);
                std::process::exit(1);
            });
            if let Err(e) = rt.block_on(server::start(&host, port, service)) {
                eprintln!("Error: Server on {}:{} failed: {}", host, port, e);
                std::process::exit(1);
            }
        }
    }
}

fn build_service(cli: &Cli) -> Service {
    let geocoder: Box<dyn GeocodingClient + Send> = if cli.offline {
        Box::new(StaticGeocoder::offline())
    } else {
        Box::new(NominatimClient::default())
    };

    let mut store = match &cli.data_file {
        Some(path) => UserLocationStore::load_from(path.clone()),
        None => UserLocationStore::load(),
    };
    if cli.no_save {
        store.preferences_mut().auto_save = false;
    }

    LocationService::new(geocoder, store)
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn fail(failure: &ResolutionFailure) -> ! {
    eprintln!("Error: {}", failure);
    for hint in &failure.suggestions {
        eprintln!("  - {}", hint);
    }
    std::process::exit(1);
}
