use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use s_image::{
    find_preset,
    logger::{self, LoggerConfig},
    server, CanonicalImageResult, Config, GenerationPipeline, ImageGenError, ModelId,
    OpenRouterClient, PreferenceStore, Result, Theme,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "s-image", version, about = "Prompt-to-image relay for OpenRouter")]
struct Cli {
    /// Preferences file. Defaults to the platform config directory.
    #[arg(long, global = true)]
    preferences: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (the default).
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Generate one image with the stored API key.
    Generate {
        prompt: Option<String>,
        /// Reference image to base the new image on.
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long)]
        model: Option<String>,
        /// Style preset id: cinematic, minimalist or vintage.
        #[arg(long)]
        preset: Option<String>,
        /// Write the image here instead of printing its URL.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show usage and limit for the stored API key.
    Credits,
    /// Inspect or change stored preferences.
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
}

#[derive(Debug, Subcommand)]
enum PrefsAction {
    Show,
    SetKey { key: String },
    ClearKey,
    SetModel { model: String },
    SetTheme { theme: String },
}

#[actix_web::main]
async fn main() {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    if let Err(e) = logger::init_with_config(LoggerConfig::from_env()) {
        eprintln!("{}", e);
    }
    if dotenv_loaded {
        log::debug!("✅ .env file loaded");
    } else {
        log::debug!("No .env file found, using system environment variables");
    }

    let cli = Cli::parse();
    let config = Config::from_env();

    if let Err(e) = run(cli, config).await {
        let body = e.to_body();
        match body.details {
            Value::String(details) => eprintln!("❌ {}\n{}", body.error, details),
            details => eprintln!("❌ {}\n{}", body.error, details),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let config = match cli.preferences {
        Some(path) => config.with_preferences_path(path),
        None => config,
    };
    let preferences_path = match config.preferences_path.clone() {
        Some(path) => path,
        None => PreferenceStore::default_path()?,
    };

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            let mut config = config;
            if let Some(host) = host {
                config = config.with_host(host);
            }
            if let Some(port) = port {
                config = config.with_port(port);
            }
            logger::log_startup_info("S-Image", env!("CARGO_PKG_VERSION"), &config);
            logger::log_config_info(&config);
            server::run_server(config).await
        }
        Command::Generate {
            prompt,
            image,
            model,
            preset,
            out,
        } => {
            let store = PreferenceStore::load(&preferences_path)?;
            let mut context = store.context(&config.default_model);
            if let Some(model) = model.as_deref().and_then(ModelId::parse) {
                context.model = model;
            }

            let prompt = compose_prompt(prompt, preset.as_deref())?;
            let image_data = match image {
                Some(path) => Some(read_image_as_base64(&path)?),
                None => None,
            };

            let pipeline = GenerationPipeline::new(OpenRouterClient::new(config.upstream.clone())?);
            let result = pipeline
                .run(&context, prompt.as_deref(), image_data.as_deref())
                .await?;

            match out {
                Some(path) => {
                    save_image(&result, &path, &config).await?;
                    println!("{}", path.display());
                }
                None => println!("{}", result.image_url),
            }
            Ok(())
        }
        Command::Credits => {
            let store = PreferenceStore::load(&preferences_path)?;
            let context = store.context(&config.default_model);
            let client = OpenRouterClient::new(config.upstream.clone())?;
            let account = client.fetch_credits(context.credential.as_ref()).await?;

            println!("Label:      {}", account.label().unwrap_or("-"));
            println!("Usage:      {}", account.usage().unwrap_or(0.0));
            match account.limit() {
                Some(limit) => println!("Limit:      {}", limit),
                None => println!("Limit:      unlimited"),
            }
            if let Some(remaining) = account.remaining() {
                println!("Remaining:  {}", remaining);
            }
            println!("Free tier:  {}", account.is_free_tier());
            Ok(())
        }
        Command::Prefs { action } => {
            let mut store = PreferenceStore::load(&preferences_path)?;
            match action {
                PrefsAction::Show => {
                    let context = store.context(&config.default_model);
                    println!("File:     {}", store.path().display());
                    println!(
                        "API key:  {}",
                        context
                            .credential
                            .map(|c| c.redacted())
                            .unwrap_or_else(|| "(not set)".to_string())
                    );
                    println!("Model:    {}", context.model);
                    println!("Theme:    {}", store.preferences().theme);
                }
                PrefsAction::SetKey { key } => store.set_api_key(&key)?,
                PrefsAction::ClearKey => store.clear_api_key()?,
                PrefsAction::SetModel { model } => {
                    let model = ModelId::parse(&model).ok_or_else(|| {
                        ImageGenError::validation("A model id is required.", "Pass a model id such as black-forest-labs/flux-pro.")
                    })?;
                    store.set_model(model)?
                }
                PrefsAction::SetTheme { theme } => store.set_theme(theme.parse::<Theme>()?)?,
            }
            Ok(())
        }
    }
}

/// A preset supplies the style text; an explicit prompt is appended to it.
fn compose_prompt(prompt: Option<String>, preset: Option<&str>) -> Result<Option<String>> {
    let Some(id) = preset else {
        return Ok(prompt);
    };
    let preset = find_preset(id).ok_or_else(|| {
        ImageGenError::validation(
            "Unknown preset.",
            format!("'{}' is not a preset; use cinematic, minimalist or vintage.", id),
        )
    })?;
    Ok(Some(match prompt {
        Some(extra) if !extra.trim().is_empty() => format!("{} {}", preset.prompt, extra.trim()),
        _ => preset.prompt.to_string(),
    }))
}

fn read_image_as_base64(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| {
        ImageGenError::validation(
            "Could not read the reference image.",
            format!("{}: {}", path.display(), e),
        )
    })?;
    Ok(STANDARD.encode(bytes))
}

async fn save_image(result: &CanonicalImageResult, path: &Path, config: &Config) -> Result<()> {
    let bytes = if result.is_data_uri() {
        result
            .decode_data_uri()
            .map(|(_, bytes)| bytes)
            .ok_or_else(|| ImageGenError::Serialization("The returned data URI could not be decoded".into()))?
    } else {
        let client = reqwest::Client::builder()
            .timeout(config.upstream.timeout())
            .build()
            .map_err(|e| ImageGenError::Config(e.to_string()))?;
        let response = client
            .get(&result.image_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ImageGenError::Transport(format!("Failed to download image: {}", e)))?;
        response
            .bytes()
            .await
            .map_err(|e| ImageGenError::Transport(format!("Failed to download image: {}", e)))?
            .to_vec()
    };

    fs::write(path, bytes)
        .map_err(|e| ImageGenError::Storage(format!("Failed to write {}: {}", path.display(), e)))?;
    log::info!("💾 Image saved to: {}", path.display());
    Ok(())
}
