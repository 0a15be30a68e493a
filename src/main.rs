//! Voyage CLI - terminal client for the Voyage API
//!
//! Signs in with the OAuth2 implicit grant and calls the API with the
//! captured bearer token.

mod api;
mod auth;
mod config;
mod models;
mod router;
mod shell;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::ApiClient;
use auth::transport::{select_transport, EmbeddedBrowser};
use auth::{AuthConfig, AuthFlow, AuthSession, LoginOutcome, LoginStarted, Platform};
use config::Config;
use router::{Navigator, RouterHelper};
use shell::{ConsoleNavigator, TerminalBrowser};

#[derive(Parser)]
#[command(name = "voyage-cli")]
#[command(about = "Terminal client for Voyage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the configured platform
    #[arg(long, global = true, value_enum)]
    platform: Option<Platform>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the startup check against the current URL
    Init {
        /// URL the app was opened on
        #[arg(long, default_value = "/")]
        url: String,
    },

    /// Capture the token from the URL the login redirected back to
    Callback {
        /// Address bar URL after the redirect
        url: String,
    },

    /// Start the OAuth login
    Login,

    /// Log out and clear cached credentials
    Logout,

    /// Show current authentication status
    Status,

    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },

    /// Fetch the user list (verify the token is accepted)
    Users,

    /// List registered routes
    Routes,
}

struct App {
    flow: AuthFlow,
    navigator: Arc<ConsoleNavigator>,
    api: ApiClient,
}

/// Wire the auth flow to the config file, the console and the API.
fn build_app(platform: Option<Platform>, url: &str) -> Result<App> {
    let config = Config::load()?;
    let platform = platform.unwrap_or(config.platform);
    let auth_config = AuthConfig::new(&config.server_url)?;
    let api_url = config.api_url.clone();
    let policy = config.expiry_policy;
    tracing::debug!("Platform {}, expiry policy {:?}", platform.as_str(), policy);

    let store = auth::tokens::shared(config);

    let mut routes = RouterHelper::new();
    router::register_app_routes(&mut routes);
    let navigator = Arc::new(ConsoleNavigator::new(routes, url));

    let browser = match platform {
        Platform::MobileApp => {
            let dirs = ProjectDirs::from("com", "voyage", "voyage-cli")
                .context("Could not determine cache directory")?;
            let browser: Arc<dyn EmbeddedBrowser> =
                Arc::new(TerminalBrowser::new(dirs.cache_dir().to_path_buf()));
            Some(browser)
        }
        Platform::Web => None,
    };
    let nav: Arc<dyn Navigator> = navigator.clone();
    let transport = select_transport(&platform, nav.clone(), browser)?;

    let api = ApiClient::new(&api_url, store.clone(), policy);
    let flow = AuthFlow::new(auth_config, store, nav, transport, api.clone());

    Ok(App {
        flow,
        navigator,
        api,
    })
}

fn print_session(flow: &AuthFlow) {
    let session = flow.session();
    println!("Session:     {}", session.as_str());

    let expires_at = match session {
        AuthSession::Anonymous => return,
        AuthSession::Authenticated { expires_at } => expires_at,
        AuthSession::Expired => flow.stored_token().and_then(|t| t.expires_at),
    };
    match expires_at.and_then(|exp| chrono::DateTime::from_timestamp(exp, 0)) {
        Some(at) => println!("  expires_at: {}", at.to_rfc3339()),
        None => println!("  expires_at: unknown"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Init { url } | Commands::Callback { url } => {
            let app = build_app(cli.platform, &url)?;
            app.flow.initialize()?;
            print_session(&app.flow);
            if let Some(state) = app.navigator.current_state() {
                println!("Route:       {}", state);
            }
        }
        Commands::Login => {
            let app = build_app(cli.platform, "/login")?;
            tracing::info!("Starting authentication flow...");
            match app.flow.start_login()? {
                LoginStarted::Redirected { url } => {
                    tracing::debug!("Redirected to {}", url);
                }
                LoginStarted::Pending(pending) => {
                    tokio::select! {
                        outcome = pending.wait() => match outcome? {
                            LoginOutcome::Completed(token) => {
                                tracing::debug!("Token expires at {:?}", token.expires_at);
                                println!("Login successful.");
                            }
                            LoginOutcome::Cancelled => println!("Login cancelled."),
                            LoginOutcome::Abandoned => println!("Login abandoned."),
                        },
                        _ = tokio::signal::ctrl_c() => {
                            app.flow.cancel_login();
                            println!("Login cancelled.");
                        }
                    }
                }
            }
        }
        Commands::Logout => {
            let app = build_app(cli.platform, "/")?;
            tracing::info!("Logging out...");
            app.flow.logout()?;
            println!("Logged out.");
        }
        Commands::Status => {
            let app = build_app(cli.platform, "/")?;
            print_session(&app.flow);
            if app.flow.session() == AuthSession::Anonymous {
                println!("\nRun 'voyage-cli login' to authenticate.");
            }
        }
        Commands::Register {
            email,
            first_name,
            last_name,
            password,
            confirm_password,
        } => {
            let app = build_app(cli.platform, "/")?;
            let data = app
                .flow
                .register(&email, &first_name, &last_name, &password, &confirm_password)
                .await?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Commands::Users => {
            let app = build_app(cli.platform, "/dashboard")?;
            app.flow.initialize()?;
            match api::list_users_if_signed_in(&app.api).await? {
                Some(users) => println!("{}", serde_json::to_string_pretty(&users)?),
                None => println!("Not signed in. Run 'voyage-cli login' to authenticate."),
            }
        }
        Commands::Routes => {
            let app = build_app(cli.platform, "/")?;
            let routes = app.navigator.router();
            for state in routes.states() {
                let url = state.config.url.as_deref().unwrap_or("(abstract)");
                println!("{:<16} {}", state.name, url);
            }
            if let Some(fallback) = routes.otherwise() {
                println!("otherwise        {}", fallback);
            }
        }
    }

    Ok(())
}
