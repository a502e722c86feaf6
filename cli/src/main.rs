mod login;
mod terminal;

#[cfg(test)]
mod test_helpers;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use auth::firebase::{FirebaseConfig, FirebaseConfigError, FirebaseRestProvider};
use auth::phone::DEFAULT_COUNTRY_CODE;
use auth::session::DEFAULT_CHALLENGE_CONTAINER;
use auth::{AuthError, AuthSession, GuardDecision, RouteGuard, SessionConfig};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};

use crate::terminal::{Console, Stdio, TerminalChallenge, TerminalFederatedPrompt};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {status}: {message}")]
    ServerError { status: u16, message: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("cannot read {path}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("identity provider not configured: {0}")]
    FirebaseConfig(#[from] FirebaseConfigError),
    #[error("sign-in failed: {0}")]
    Auth(#[from] AuthError),
    #[error("sign-in cancelled")]
    Cancelled,
    #[error("not signed in; redirected to {0}")]
    Redirected(String),
}

#[derive(Parser, Debug)]
#[command(name = "menumaven-cli", about = "MenuMaven API and sign-in CLI")]
struct Cli {
    #[arg(long, env = "MENUMAVEN_BASE_URL", default_value = "http://127.0.0.1:5000")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    base_url: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the API is up.
    Health,
    /// List the food catalogue.
    Foods,
    /// Log a meal.
    Meal {
        #[arg(long)]
        name: String,
        /// Food ids from `foods`; repeatable.
        #[arg(long = "food")]
        foods: Vec<u32>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Upload a menu photo (JPEG, PNG or WebP).
    Upload { file: PathBuf },
    /// Analyze an uploaded menu.
    Analyze {
        #[arg(long)]
        image_path: Option<String>,
    },
    /// Sign in, show the dashboard, then sign out.
    Login(LoginArgs),
}

#[derive(Args, Debug)]
struct LoginArgs {
    /// Skip the phone prompt.
    #[arg(long, conflicts_with = "federated")]
    phone: Option<String>,

    /// Sign in with a federated account instead of a phone number.
    #[arg(long, default_value_t = false)]
    federated: bool,

    #[arg(long, default_value = "google.com")]
    federated_provider: String,

    #[arg(long, env = "MENUMAVEN_DEFAULT_COUNTRY_CODE", default_value = DEFAULT_COUNTRY_CODE)]
    country_code: String,

    /// Answer the bot check without prompting (emulator and test projects).
    #[arg(long, env = "RECAPTCHA_TOKEN", hide_env_values = true)]
    recaptcha_token: Option<String>,

    #[arg(long, env = "MENUMAVEN_AUTH_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let ctx = CliContext { base_url: cli.base_url };

    match cli.command {
        Command::Health => print_json(&api_request(&ctx, reqwest::Method::GET, "/api/health", None).await?),
        Command::Foods => print_json(&api_request(&ctx, reqwest::Method::GET, "/api/nutrition/foods", None).await?),
        Command::Meal { name, foods, date } => {
            let body = json!({ "name": name, "foods": foods, "date": date });
            print_json(&api_request(&ctx, reqwest::Method::POST, "/api/nutrition/meals", Some(body)).await?)
        }
        Command::Upload { file } => print_json(&upload_menu(&ctx, &file).await?),
        Command::Analyze { image_path } => {
            let body = json!({ "imagePath": image_path });
            print_json(&api_request(&ctx, reqwest::Method::POST, "/api/analyze/menu", Some(body)).await?)
        }
        Command::Login(args) => run_login(&ctx, args).await,
    }
}

// =============================================================================
// SIGN-IN
// =============================================================================

async fn run_login(ctx: &CliContext, args: LoginArgs) -> Result<(), CliError> {
    let console: Arc<dyn Console> = Arc::new(Stdio::new());
    let mut provider = FirebaseRestProvider::new(FirebaseConfig::from_env()?)?;
    if args.federated {
        let prompt = TerminalFederatedPrompt::new(Arc::clone(&console), args.federated_provider.clone());
        provider = provider.with_federated_prompt(Arc::new(prompt));
    }
    let renderer = TerminalChallenge::new(Arc::clone(&console), args.recaptcha_token.clone());
    let config = SessionConfig {
        challenge_container: DEFAULT_CHALLENGE_CONTAINER.to_owned(),
        default_country_code: args.country_code.clone(),
    };
    let session = AuthSession::start(Arc::new(provider), Arc::new(renderer), config);
    let guard = RouteGuard::default();
    let timeout = Duration::from_secs(args.timeout_secs);

    let result = sign_in_and_show(ctx, &session, &guard, console.as_ref(), &args, timeout).await;

    if session.state().is_signed_in() {
        session.logout().await?;
        session.wait_for_sign_out(timeout).await?;
        console.say("Signed out.");
    }
    session.shutdown();
    result
}

async fn sign_in_and_show(
    ctx: &CliContext,
    session: &AuthSession,
    guard: &RouteGuard,
    console: &dyn Console,
    args: &LoginArgs,
    timeout: Duration,
) -> Result<(), CliError> {
    if guard.resolve(&mut session.subscribe()).await == GuardDecision::Allow {
        console.say("Already signed in.");
    } else if args.federated {
        session.login_with_federated_provider().await?;
    } else {
        login::phone_form(session, console, args.phone.clone()).await.ok_or(CliError::Cancelled)?;
    }

    // The provider stream, not the sign-in result, decides what the guard sees.
    session.wait_for_identity(timeout).await?;
    let lines = login::dashboard_lines(guard, session).map_err(|decision| match decision {
        GuardDecision::Redirect(route) => CliError::Redirected(route),
        _ => CliError::Redirected(guard.landing_route().to_owned()),
    })?;
    for line in &lines {
        console.say(line);
    }

    match api_request(ctx, reqwest::Method::GET, "/api/nutrition/foods", None).await {
        Ok(foods) => {
            console.say("Foods:");
            for food in foods.as_array().into_iter().flatten() {
                let name = food.get("name").and_then(Value::as_str).unwrap_or("?");
                let calories = food.get("calories").and_then(Value::as_u64).unwrap_or_default();
                console.say(&format!("  {name} ({calories} kcal)"));
            }
        }
        Err(e) => tracing::warn!(error = %e, "food list unavailable"),
    }
    Ok(())
}

// =============================================================================
// API
// =============================================================================

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

async fn upload_menu(ctx: &CliContext, file: &Path) -> Result<Value, CliError> {
    let bytes = tokio::fs::read(file).await.map_err(|source| CliError::ReadFile { path: file.to_owned(), source })?;
    let file_name = file.file_name().and_then(|n| n.to_str()).unwrap_or("menu").to_owned();
    let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name).mime_str(mime_for(file))?;
    let form = reqwest::multipart::Form::new().part("menuImage", part);

    let url = format!("{}/api/upload/menu", ctx.base_url.trim_end_matches('/'));
    let response = reqwest::Client::new().post(url).multipart(form).send().await?;
    read_response(response).await
}

async fn api_request(
    ctx: &CliContext,
    method: reqwest::Method,
    path: &str,
    body: Option<Value>,
) -> Result<Value, CliError> {
    let url = format!("{}{}", ctx.base_url.trim_end_matches('/'), path);
    let request = reqwest::Client::new().request(method, &url);
    let request = if let Some(json) = body { request.json(&json) } else { request };
    read_response(request.send().await?).await
}

async fn read_response(response: reqwest::Response) -> Result<Value, CliError> {
    let status = response.status();
    let value = response.json::<Value>().await.unwrap_or(Value::Null);
    if !status.is_success() {
        let message = value
            .get("error")
            .or_else(|| value.get("message"))
            .and_then(Value::as_str)
            .map_or_else(|| value.to_string(), str::to_owned);
        return Err(CliError::ServerError { status: status.as_u16(), message });
    }
    Ok(value)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
