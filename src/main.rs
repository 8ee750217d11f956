use anyhow::{Context, Result};
use kraepelin::{
    api::routes::app,
    auth::password::hash_password,
    cli::{output::Output, Cli, Commands},
    db::IdentityStore,
    utils::toml_config::{AppConfig, LogFormat},
    types::Role,
    AppState, DatabaseProvider,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // .env is optional
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let outcome = match cli.command {
        None | Some(Commands::Serve) => serve(&cli, &output).await,
        Some(Commands::Seed {
            ref email,
            ref password,
            role,
        }) => seed(&cli, &output, email, password, role).await,
        Some(Commands::HashPassword { ref password }) => hash_password(password)
            .map(|hash| output.raw(&hash))
            .context("Failed to hash password"),
        Some(Commands::Config { validate }) => show_config(&cli, &output, validate),
    };

    if let Err(e) = outcome {
        output.error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn init_tracing(config: &AppConfig, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "kraepelin={level},kraepelin_server={level},tower_http={level}"
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    match config.server.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

async fn serve(cli: &Cli, output: &Output) -> Result<()> {
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    init_tracing(&config, cli.verbose);

    output.banner();

    if config.auth.admin.is_none() {
        output.warning("No [auth.admin] configured; only seeded accounts can log in");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let environment = config.server.environment;
    let state = AppState::from_config(config)
        .await
        .context("Failed to initialize application state")?;

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    output.success(&format!("Listening on http://{addr}"));
    info!(%addr, ?environment, "server started");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

async fn seed(
    cli: &Cli,
    output: &Output,
    email: &str,
    password: &str,
    role: Role,
) -> Result<()> {
    let config = AppConfig::read(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    init_tracing(&config, cli.verbose);

    let email = email.trim();
    anyhow::ensure!(!email.is_empty(), "email must not be empty");
    anyhow::ensure!(!password.is_empty(), "password must not be empty");

    let db = DatabaseProvider::from_url(&config.database.url)
        .create_client()
        .await
        .context("Failed to open database")?;
    let hash = hash_password(password)?;
    db.upsert_identity(email, &hash, role).await?;

    output.success(&format!("Stored {role} account {email}"));
    Ok(())
}

fn show_config(cli: &Cli, output: &Output, validate: bool) -> Result<()> {
    let config = AppConfig::read(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    output.header("Server");
    output.kv("address", &format!("{}:{}", config.server.host, config.server.port));
    output.kv("environment", &format!("{:?}", config.server.environment));
    output.kv("log", &format!("{} ({:?})", config.server.log_level, config.server.log_format));

    output.header("CORS origins");
    for origin in config.server.cors_origins() {
        output.list_item(&origin);
    }

    output.header("Auth");
    output.kv("secret env", &config.auth.jwt_secret_env);
    output.kv(
        "deprecated secret envs",
        &config.auth.deprecated_secret_envs.join(", "),
    );
    output.kv("token ttl (s)", &config.auth.token_ttl_secs.to_string());
    output.kv(
        "administrator",
        config
            .auth
            .admin
            .as_ref()
            .map(|admin| admin.email.as_str())
            .unwrap_or("(none)"),
    );

    output.header("Database");
    output.kv("url", &config.database.url);

    output.header("Test defaults");
    output.kv("questions", &config.quiz.question_count.to_string());
    output.kv("question cap", &config.quiz.max_question_count.to_string());
    output.kv("duration (s)", &config.quiz.duration_seconds.to_string());
    output.kv("max incorrect", &config.quiz.max_incorrect_answers.to_string());
    output.kv("min per minute", &config.quiz.min_questions_per_minute.to_string());

    if validate {
        output.header("Validation");
        config.validate()?;
        output.success("configuration and secrets are valid");
    } else {
        output.hint("Run with --validate to check referenced environment variables");
    }

    Ok(())
}
