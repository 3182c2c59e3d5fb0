mod config;
mod library;
mod logging;
mod ports;
mod report;
mod services;
mod spotify_rs;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{OptionExt, WrapErr},
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    config::{Config, SyncSettings},
    library::SourceLibrary,
    logging::init_tracing,
    report::{write_plan, write_report},
    services::spotify::{
        client::{SpotifyApiCredentials, SpotifyHttpAdapter},
        reconcile::PlaylistReconciler,
    },
    spotify_rs::auth::{exchange_code_for_token, initiate_oauth, parse_redirect},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "SHAZAM_SYNC_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `shazam_playlist_sync=debug`
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: String,

    /// OTLP gRPC endpoint to export traces to
    #[arg(long, env = "OTLP_ENDPOINT", global = true)]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Spotify app credentials, overriding the config file when given.
#[derive(clap::Args, Debug)]
struct SpotifyArgs {
    /// Spotify app client id
    #[arg(long, env = "SPOTIFY_CLIENT_ID")]
    client_id: Option<String>,

    /// Spotify app client secret
    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add every track from the Shazam library to the playlist, then remove duplicates
    Sync {
        /// Shazam library CSV export
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Target playlist (URL, URI or id)
        #[arg(short, long)]
        playlist: Option<String>,

        /// Spotify user id owning the playlist
        #[arg(short, long)]
        user_id: Option<String>,

        /// Refresh token from `auth`
        #[arg(long, env = "SPOTIFY_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: Option<String>,

        /// Only report what would change
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        spotify: SpotifyArgs,
    },
    /// Authorize with Spotify and store a refresh token in the config file
    Auth {
        #[command(flatten)]
        spotify: SpotifyArgs,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

fn credentials(config: &Config, spotify: SpotifyArgs) -> Result<SpotifyApiCredentials> {
    let client_id = spotify
        .client_id
        .unwrap_or_else(|| config.spotify.client_id.clone());
    let client_secret = spotify
        .client_secret
        .unwrap_or_else(|| config.spotify.client_secret.clone());
    if client_id.is_empty() || client_secret.is_empty() {
        return Err(color_eyre::eyre::eyre!(
            "Spotify client id and secret are required. Set them in the config file or via SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET"
        ));
    }
    Ok(SpotifyApiCredentials::new(client_id, client_secret))
}

struct SyncOptions {
    csv: Option<PathBuf>,
    playlist: Option<String>,
    user_id: Option<String>,
    refresh_token: Option<String>,
    dry_run: bool,
}

async fn sync(
    config: &mut Config,
    config_path: Option<&Path>,
    credentials: SpotifyApiCredentials,
    options: SyncOptions,
) -> Result<()> {
    let settings = SyncSettings::new(
        options.user_id.as_deref().unwrap_or(&config.sync.user_id),
        options.playlist.as_deref().unwrap_or(&config.sync.playlist),
    )?;

    let csv_path = options.csv.unwrap_or_else(|| config.library_csv_path());
    let library = SourceLibrary::from_csv_path(&csv_path)?;
    if library.is_empty() {
        tracing::warn!("No tracks found in {}", csv_path.display());
    }

    let refresh_token = options
        .refresh_token
        .or_else(|| config.spotify.refresh_token.clone())
        .ok_or_eyre("No refresh token found. Run `shazam-playlist-sync auth` first")?;
    let (client, rotated) = SpotifyHttpAdapter::from_refresh_token(&credentials, &refresh_token)
        .await
        .wrap_err("Failed to obtain a Spotify access token")?;
    if config.rotate_refresh_token(rotated) {
        match config_path {
            Some(path) => {
                config.save(path)?;
                tracing::debug!("Saved rotated refresh token to {}", path.display());
            }
            None => tracing::warn!("Spotify rotated the refresh token but no config path is available"),
        }
    }

    let reconciler = PlaylistReconciler::new(client, settings);
    reconciler.check_account().await?;

    if options.dry_run {
        let plan = reconciler.plan(&library).await?;
        write_plan(&mut std::io::stdout().lock(), &plan)?;
    } else {
        let report = reconciler.run(&library).await?;
        write_report(&mut std::io::stdout().lock(), &report)?;
    }
    Ok(())
}

async fn auth(
    config: &mut Config,
    config_path: &Path,
    credentials: SpotifyApiCredentials,
) -> Result<()> {
    let redirect_uri = config.spotify.redirect_uri.clone();
    let (response, session) = initiate_oauth(credentials.client_id(), &redirect_uri);

    println!("Open this URL in your browser and approve access:\n\n{}\n", response.auth_url);
    println!("Then paste the URL you were redirected to:");

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .wrap_err("Failed to read redirect URL")?;
    let code = parse_redirect(&line, &session)?;

    let token = exchange_code_for_token(
        credentials.client_id(),
        credentials.client_secret(),
        &code,
        &redirect_uri,
        &session.code_verifier,
    )
    .await?;
    let refresh_token = token
        .refresh_token
        .ok_or_eyre("Spotify did not return a refresh token")?;

    config.spotify.client_id = credentials.client_id().to_string();
    config.spotify.client_secret = credentials.client_secret().to_string();
    config.spotify.refresh_token = Some(refresh_token);
    config.save(config_path)?;

    tracing::info!("Saved refresh token to {}", config_path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let tracer_provider = init_tracing(&args.log_level, args.otlp_endpoint.as_deref())?;

    tracing::debug!("Loading configuration");
    let config_path = args.config.clone().or_else(Config::config_path);
    let mut config = match &args.config {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
    .wrap_err("Failed to load shazam-playlist-sync config")?;

    let result = match args.command {
        Commands::Sync {
            csv,
            playlist,
            user_id,
            refresh_token,
            dry_run,
            spotify,
        } => {
            let credentials = credentials(&config, spotify)?;
            sync(
                &mut config,
                config_path.as_deref(),
                credentials,
                SyncOptions {
                    csv,
                    playlist,
                    user_id,
                    refresh_token,
                    dry_run,
                },
            )
            .await
        }
        Commands::Auth { spotify } => {
            let credentials = credentials(&config, spotify)?;
            let config_path = config_path.ok_or_eyre("No config path available")?;
            auth(&mut config, &config_path, credentials).await
        }
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => Config::create_default().map(|path| {
                tracing::info!("Default config at {}", path.display());
            }),
            ConfigCommands::Path => {
                match config_path {
                    Some(path) => println!("{}", path.display()),
                    None => println!("No default config path found"),
                }
                Ok(())
            }
        },
    };

    if let Some(tracer_provider) = tracer_provider
        && let Err(error) = tracer_provider.shutdown()
    {
        eprintln!("Failed to flush traces: {}", error);
    }

    result
}
