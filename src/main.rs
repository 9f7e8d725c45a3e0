use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quizclient::config::{ClientConfig, ConfigError};
use quizclient::services::analytics::TracingAnalytics;
use quizclient::services::storage::FileSessionStorage;
use quizclient::util::auth::check_current;
use quizclient::{
    ApiError, AuthContext, AuthContextError, AuthProvider, AuthStore, GuardDecision, HttpApi, RouteGuard, TaskApi,
    TaskPoller, use_auth,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("http client error: {0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    SignIn(String),
    #[error(transparent)]
    Context(#[from] AuthContextError),
    #[error("poller stopped before task {0} finished")]
    TaskAbandoned(String),
}

#[derive(Parser, Debug)]
#[command(name = "quizclient", about = "Quiz platform session and task client")]
struct Cli {
    /// Overrides `QUIZ_API_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    /// Overrides `QUIZ_SESSION_FILE`.
    #[arg(long)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the restored session.
    Whoami,
    /// Sign in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "QUIZ_PASSWORD", hide_env_values = true)]
        password: String,
        /// Destination to resume after signing in.
        #[arg(long)]
        from: Option<String>,
    },
    /// Sign in with a Google OAuth access token.
    Google {
        #[arg(long, env = "QUIZ_GOOGLE_TOKEN", hide_env_values = true)]
        token: String,
        #[arg(long)]
        from: Option<String>,
    },
    Logout,
    /// Show what the route guard decides for a path.
    Guard {
        path: String,
        /// Use the admin-only guard.
        #[arg(long)]
        admin: bool,
    },
    /// Poll a generation task until it finishes.
    WatchTask { task_id: String },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.api_base_url = base_url.trim_end_matches('/').to_owned();
    }
    if let Some(session_file) = cli.session_file {
        config.session_file = session_file;
    }

    let api = Arc::new(HttpApi::new(&config.api_base_url, config.request_timeout, config.connect_timeout)?);
    let storage = Arc::new(FileSessionStorage::new(config.session_file.clone()));
    let context = AuthContext::new(AuthStore::new(), storage, api.clone(), Arc::new(TracingAnalytics));
    context.bootstrap();

    AuthProvider::scope(context, run(cli.command, api, &config)).await
}

async fn run(command: Command, api: Arc<HttpApi>, config: &ClientConfig) -> Result<(), CliError> {
    match command {
        Command::Whoami => run_whoami(),
        Command::Login { email, password, from } => {
            let auth = use_auth()?;
            let outcome = auth
                .sign_in_with_password(&email, &password, from.as_deref())
                .await
                .map_err(|e| CliError::SignIn(e.user_message()))?;
            println!("signed in as {} ({:?}); continue at {}", outcome.user.name, outcome.user.role, outcome.redirect_to);
            Ok(())
        }
        Command::Google { token, from } => {
            let auth = use_auth()?;
            let outcome = auth
                .sign_in_with_google(&token, from.as_deref())
                .await
                .map_err(|e| CliError::SignIn(e.user_message()))?;
            println!("signed in as {} ({:?}); continue at {}", outcome.user.name, outcome.user.role, outcome.redirect_to);
            Ok(())
        }
        Command::Logout => {
            use_auth()?.logout().await;
            println!("signed out");
            Ok(())
        }
        Command::Guard { path, admin } => {
            let guard = if admin { RouteGuard::admin() } else { RouteGuard::Authenticated };
            match check_current(guard, &path)? {
                GuardDecision::Wait => println!("wait"),
                GuardDecision::Render => println!("render {path}"),
                GuardDecision::Redirect { to, from: Some(from) } => println!("redirect {to} (from {from})"),
                GuardDecision::Redirect { to, from: None } => println!("redirect {to}"),
            }
            Ok(())
        }
        Command::WatchTask { task_id } => watch_task(api, config, task_id).await,
    }
}

fn run_whoami() -> Result<(), CliError> {
    let value = use_auth()?.value();
    match value.user.as_ref() {
        Some(user) => println!("{} <{}> {:?} (id {})", user.name, user.email.as_deref().unwrap_or("-"), user.role, user.id),
        None => println!("not signed in"),
    }
    Ok(())
}

async fn watch_task(api: Arc<HttpApi>, config: &ClientConfig, task_id: String) -> Result<(), CliError> {
    let api: Arc<dyn TaskApi> = api;
    let poller = TaskPoller::spawn(api, config.poll_interval);
    let mut rx = poller.subscribe();
    poller.track(Some(task_id.clone()));

    let mut last_status = None;
    let mut last_error = None;
    loop {
        if rx.changed().await.is_err() {
            return Err(CliError::TaskAbandoned(task_id));
        }
        let query = rx.borrow_and_update().clone();
        if query.error.is_some() && query.error != last_error {
            println!("fetch failed: {}", query.error.as_deref().unwrap_or_default());
        }
        last_error.clone_from(&query.error);
        if query.status() != last_status {
            last_status = query.status();
            if let Some(status) = last_status {
                println!("{task_id}: {status:?}");
            }
        }
        if let Some(task) = query.data.as_ref().filter(|task| task.is_terminal()) {
            if let Some(result) = &task.result {
                println!("{result}");
            }
            if let Some(error) = &task.error {
                println!("error: {error}");
            }
            return Ok(());
        }
    }
}
