use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use emuse_client::captcha::StaticCaptcha;
use emuse_client::config::ConfigError;
use emuse_client::flows::login::LoginForm;
use emuse_client::flows::nav;
use emuse_client::flows::signup::{SignupError, SignupForm, locale_from_language_tag};
use emuse_client::flows::verify_email::{self, VerifyOutcome};
use emuse_client::{ApiError, AuthApi, AuthError, AuthStore, ClientConfig, HttpAuthApi, Session};
use serde_json::Value;
use tracing_subscriber::EnvFilter;


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Signup(#[from] SignupError),
    #[error("{0}")]
    Verification(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "emuse", about = "eMuse account and session CLI")]
struct Cli {
    /// Server root; defaults to http://127.0.0.1:8000.
    #[arg(long, env = "EMUSE_BASE_URL")]
    base_url: Option<String>,

    /// Session cookie from an earlier `login`.
    #[arg(long, env = "EMUSE_SESSION_COOKIE", hide_env_values = true)]
    session_cookie: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the logged-in user.
    Me,
    Login(LoginArgs),
    Logout,
    Signup(SignupArgs),
    /// Redeem an email verification token.
    VerifyEmail {
        token: String,
    },
    /// Show the public CAPTCHA site key.
    TurnstileConfig,
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long)]
    email: String,

    #[arg(long)]
    password: String,

    /// Solved Turnstile token.
    #[arg(long, env = "EMUSE_CAPTCHA_TOKEN", hide_env_values = true)]
    captcha_token: Option<String>,
}

#[derive(Args, Debug)]
struct SignupArgs {
    #[arg(long)]
    email: String,

    #[arg(long)]
    password: String,

    #[arg(long)]
    confirm_password: String,

    #[arg(long)]
    first_name: String,

    #[arg(long)]
    surname: String,

    /// Defaults to "<first name> <surname>".
    #[arg(long)]
    display_name: Option<String>,

    /// YYYY-MM-DD
    #[arg(long)]
    date_of_birth: String,

    /// Language tag such as en-US.
    #[arg(long)]
    locale: Option<String>,

    /// IANA zone name; defaults to UTC.
    #[arg(long)]
    timezone: Option<String>,
}

struct CliContext {
    api: Arc<HttpAuthApi>,
    store: AuthStore,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = connect(cli.base_url.as_deref(), cli.session_cookie)?;

    match cli.command {
        Command::Me => run_me(&ctx).await,
        Command::Login(args) => run_login(&ctx, args).await,
        Command::Logout => run_logout(&ctx).await,
        Command::Signup(args) => run_signup(&ctx, args).await,
        Command::VerifyEmail { token } => run_verify_email(&ctx, &token).await,
        Command::TurnstileConfig => {
            let config = ctx.api.turnstile_config().await?;
            print_json(&serde_json::to_value(config)?)
        }
    }
}

fn connect(base_url: Option<&str>, session_cookie: Option<String>) -> Result<CliContext, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = base_url {
        config = config.with_base_url(base_url)?;
    }
    if session_cookie.is_some() {
        config.session_cookie = session_cookie;
    }

    let api = Arc::new(HttpAuthApi::new(&config)?);
    let store = AuthStore::new(api.clone(), config.session_stale_after);
    Ok(CliContext { api, store })
}

async fn run_me(ctx: &CliContext) -> Result<(), CliError> {
    match ctx.store.check_session().await? {
        Session::Present(user) => {
            if let Some(greeting) = nav::header_greeting(&ctx.store.snapshot()) {
                eprintln!("{greeting}");
            }
            print_json(&serde_json::to_value(user)?)
        }
        Session::Absent | Session::Unknown => {
            println!("not authenticated");
            Ok(())
        }
    }
}

async fn run_login(ctx: &CliContext, args: LoginArgs) -> Result<(), CliError> {
    let form = LoginForm::new(args.email, args.password);
    let captcha = StaticCaptcha::new(args.captcha_token);
    let user = form.submit(&ctx.store, &captcha).await?;

    print_json(&serde_json::to_value(user)?)?;
    if let Some(cookie) = ctx.api.session_cookie() {
        eprintln!("export EMUSE_SESSION_COOKIE={cookie}");
    }
    Ok(())
}

async fn run_logout(ctx: &CliContext) -> Result<(), CliError> {
    ctx.store.logout().await?;
    println!("logged out");
    Ok(())
}

async fn run_signup(ctx: &CliContext, args: SignupArgs) -> Result<(), CliError> {
    let form = signup_form(args);
    let today = time::OffsetDateTime::now_utc().date();

    let response = form.submit(ctx.api.as_ref(), today).await?;
    print_json(&serde_json::to_value(response)?)
}

fn signup_form(args: SignupArgs) -> SignupForm {
    SignupForm {
        email: args.email,
        password: args.password,
        confirm_password: args.confirm_password,
        first_name: args.first_name,
        surname: args.surname,
        display_name: args.display_name.unwrap_or_default(),
        date_of_birth: args.date_of_birth,
        locale: locale_from_language_tag(args.locale.as_deref()),
        timezone: args.timezone.unwrap_or_default(),
    }
}

async fn run_verify_email(ctx: &CliContext, token: &str) -> Result<(), CliError> {
    match verify_email::verify(ctx.api.as_ref(), token).await {
        VerifyOutcome::Verified { message } => {
            println!("{message}");
            Ok(())
        }
        VerifyOutcome::Failed { message } => Err(CliError::Verification(message)),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
