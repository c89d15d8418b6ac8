//! tenet - a terminal client for the tenet principles service.
//!
//! Provides a line-oriented interface for the code-based login flow,
//! browsing and agreeing with principles, and the country agreement table.
//! All state handling lives in tenet-core; this binary only renders it.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tenet_core::models::Principle;
use tenet_core::{
    ApiClient, ApiError, AuthService, AuthState, Config, CountryService, KeyringStore,
    PrincipleService,
};

/// Width used for principle previews in list output
const PREVIEW_WIDTH: usize = 64;

/// Initialize the tracing subscriber for logging.
///
/// Logs go to a daily file under the cache directory so they never
/// interleave with the interactive prompt; stderr is the fallback when no
/// cache directory is available. The returned guard must stay alive for
/// the life of the process.
fn init_tracing(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g. RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match config.cache_dir() {
        Ok(cache_dir) => {
            let appender = tracing_appender::rolling::daily(cache_dir.join("logs"), "tenet.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config);
    info!("tenet CLI starting");

    let cache_dir = config
        .cache_dir()
        .context("Failed to resolve cache directory")?;
    let store = Arc::new(KeyringStore::new(cache_dir));
    let api = Arc::new(
        ApiClient::new(config.api_url(), config.request_timeout(), store)
            .context("Failed to build API client")?,
    );

    let auth = AuthService::new(api.clone());
    let principles = PrincipleService::new(api.clone());
    let countries = CountryService::new(api);

    auth.rehydrate();

    let mut cli = Cli {
        auth,
        principles,
        countries,
        config,
        pending_email: None,
    };

    cli.greet();
    cli.run().await?;

    info!("tenet CLI shutting down");
    Ok(())
}

struct Cli {
    auth: AuthService,
    principles: PrincipleService,
    countries: CountryService,
    config: Config,
    /// Email a verification code was last requested for
    pending_email: Option<String>,
}

impl Cli {
    fn greet(&self) {
        match self.auth.session().current() {
            session if session.is_authenticated() => {
                if let Some(user) = session.user {
                    println!("Welcome back, {}.", user.display_name());
                }
            }
            _ => println!("Not logged in. Use 'login <email>' or 'register' to get started."),
        }
        println!("Type 'help' for commands.\n");
    }

    async fn run(&mut self) -> Result<()> {
        let stdin = io::stdin();
        loop {
            print!("tenet> ");
            io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                // EOF
                return Ok(());
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (command, rest) = match line.split_once(char::is_whitespace) {
                Some((command, rest)) => (command, rest.trim()),
                None => (line, ""),
            };

            match command {
                "help" => print_help(),
                "register" => self.register().await?,
                "login" => self.login(rest).await,
                "verify" => self.verify(rest).await,
                "me" => self.show_profile().await,
                "list" => self.list(rest).await,
                "search" => self.search(rest).await,
                "new" => self.create(rest).await,
                "agree" => self.agree(rest).await,
                "retract" => self.retract(rest).await,
                "mine" => self.my_agreed().await,
                "map" => self.country_table().await,
                "logout" => {
                    self.auth.logout().await;
                    println!("Logged out.");
                }
                "quit" | "exit" => return Ok(()),
                other => println!("Unknown command '{}'. Type 'help' for commands.", other),
            }
        }
    }

    async fn register(&mut self) -> Result<()> {
        println!("\n=== Create a tenet account ===\n");
        let email = prompt("Email: ")?;
        let name = prompt("Name: ")?;
        let birth_year: i32 = loop {
            match prompt("Birth year: ")?.parse() {
                Ok(year) => break year,
                Err(_) => println!("Please enter a four-digit year."),
            }
        };
        let mut country = prompt("Country code (blank to auto-detect): ")?;
        if country.is_empty() {
            match self.countries.detect().await {
                Ok(detection) if detection.detected => {
                    if let Some(detected) = detection.country {
                        println!("Detected country: {} ({})", detected.name, detected.code);
                        country = detected.code;
                    }
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "Country detection failed"),
            }
        }
        if country.is_empty() {
            println!("No country selected; registration needs one. Try 'register' again.");
            return Ok(());
        }

        match self
            .auth
            .request_registration_code(&email, &name, birth_year, &country)
            .await
        {
            Ok(request) => {
                self.report_code_sent(&request.email, request.bypass.unwrap_or(false));
                self.pending_email = Some(request.email);
            }
            Err(err) => println!("Could not request a code: {}", describe(&err)),
        }
        Ok(())
    }

    async fn login(&mut self, rest: &str) {
        let email = if rest.is_empty() {
            match self.config.last_email.clone() {
                Some(email) => email,
                None => {
                    println!("Usage: login <email>");
                    return;
                }
            }
        } else {
            rest.to_string()
        };

        match self.auth.request_login_code(&email).await {
            Ok(request) => {
                self.report_code_sent(&request.email, request.bypass.unwrap_or(false));
                self.pending_email = Some(request.email);
            }
            Err(err) => println!("Could not request a code: {}", describe(&err)),
        }
    }

    async fn verify(&mut self, code: &str) {
        if code.is_empty() {
            println!("Usage: verify <code>");
            return;
        }
        let Some(email) = self.pending_email.clone() else {
            println!("Request a code first with 'login <email>' or 'register'.");
            return;
        };

        match self.auth.verify_code(&email, code).await {
            Ok(user) => {
                println!("Welcome, {}.", user.display_name());
                self.pending_email = None;
                self.config.last_email = Some(user.email);
                if let Err(err) = self.config.save() {
                    warn!(error = %err, "Failed to save configuration");
                }
            }
            Err(err) => println!("Verification failed: {}", describe(&err)),
        }
    }

    async fn show_profile(&self) {
        if self.require_login() {
            return;
        }
        match self.auth.fetch_profile().await {
            Ok(user) => {
                println!("{} <{}>", user.display_name(), user.email);
                if let Some(country) = &user.country {
                    println!("  country:  {}", country);
                }
                if let Some(year) = user.birth_year {
                    println!("  born:     {}", year);
                }
                println!("  verified: {}", if user.is_verified { "yes" } else { "no" });
                println!("  joined:   {}", user.created_at.format("%Y-%m-%d"));
            }
            Err(err) => println!("Could not load profile: {}", describe(&err)),
        }
    }

    async fn list(&self, rest: &str) {
        let page: u32 = rest.parse().unwrap_or(1);
        match self
            .principles
            .list(page, tenet_core::principles::DEFAULT_PAGE_LIMIT, None)
            .await
        {
            Ok(listing) => {
                print_principles(&listing.principles);
                println!(
                    "page {}/{} ({} total)",
                    listing.pagination.page, listing.pagination.pages, listing.pagination.total
                );
            }
            Err(err) => println!("Could not list principles: {}", describe(&err)),
        }
    }

    async fn search(&self, term: &str) {
        if term.is_empty() {
            println!("Usage: search <term>");
            return;
        }
        match self
            .principles
            .list(1, tenet_core::principles::DEFAULT_PAGE_LIMIT, Some(term))
            .await
        {
            Ok(listing) => print_principles(&listing.principles),
            Err(err) => println!("Search failed: {}", describe(&err)),
        }
    }

    async fn create(&self, text: &str) {
        if self.require_login() {
            return;
        }
        if text.is_empty() {
            println!("Usage: new <text of the principle>");
            return;
        }
        match self.principles.create(text).await {
            Ok(principle) => println!("Created {} (you agree automatically).", principle.id),
            Err(err) => println!("Could not create principle: {}", describe(&err)),
        }
    }

    async fn agree(&self, id: &str) {
        if self.require_login() {
            return;
        }
        if id.is_empty() {
            println!("Usage: agree <principle-id>");
            return;
        }
        match self.principles.agree(id).await {
            Ok(summary) => println!("Agreed. {} people agree now.", summary.agreement_count),
            Err(err) => println!("Could not record agreement: {}", describe(&err)),
        }
    }

    async fn retract(&self, id: &str) {
        if self.require_login() {
            return;
        }
        if id.is_empty() {
            println!("Usage: retract <principle-id>");
            return;
        }
        match self.principles.retract(id).await {
            Ok(summary) => println!("Retracted. {} people agree now.", summary.agreement_count),
            Err(err) => println!("Could not retract agreement: {}", describe(&err)),
        }
    }

    async fn my_agreed(&self) {
        if self.require_login() {
            return;
        }
        match self.principles.my_agreed().await {
            Ok(agreed) => {
                print_principles(&agreed.principles);
                println!("{} agreed in total", agreed.count);
            }
            Err(err) => println!("Could not load agreements: {}", describe(&err)),
        }
    }

    async fn country_table(&self) {
        match self.principles.country_agreement_percentages(&[], None).await {
            Ok(feed) => {
                if feed.countries.is_empty() {
                    println!("No aggregate data yet.");
                    return;
                }
                for entry in &feed.countries {
                    println!(
                        "{:>4}  {:2}  {}",
                        entry.percentage_display(),
                        entry.country.code,
                        entry.country.name
                    );
                }
            }
            Err(err) => println!("Could not load country data: {}", describe(&err)),
        }
    }

    /// Print a hint and return true when no session is established.
    fn require_login(&self) -> bool {
        if self.auth.session().state() != AuthState::Authenticated {
            println!("You need to log in first ('login <email>').");
            return true;
        }
        false
    }

    fn report_code_sent(&self, email: &str, bypass: bool) {
        println!("Verification code sent to {}.", email);
        if bypass {
            println!("(bypass environment: the fixed test code is accepted)");
        }
        println!("Enter it with: verify <code>");
    }
}

fn print_principles(principles: &[Principle]) {
    if principles.is_empty() {
        println!("Nothing here yet.");
        return;
    }
    for principle in principles {
        let marker = if principle.user_agreed { "*" } else { " " };
        println!(
            "{} {:>5}  {}  [{}]",
            marker,
            principle.agreement_count,
            principle.preview(PREVIEW_WIDTH),
            principle.id
        );
    }
}

fn print_help() {
    println!("Commands:");
    println!("  register              create an account (code sent by email)");
    println!("  login <email>         request a login code");
    println!("  verify <code>         enter the emailed code");
    println!("  me                    show your profile");
    println!("  list [page]           browse principles");
    println!("  search <term>         search principles");
    println!("  new <text>            author a principle");
    println!("  agree <id>            agree with a principle");
    println!("  retract <id>          take an agreement back");
    println!("  mine                  principles you agree with");
    println!("  map                   country agreement table");
    println!("  logout                end the session");
    println!("  quit                  leave");
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn describe(err: &ApiError) -> String {
    match err {
        ApiError::Timeout => "the server took too long to answer; try again".to_string(),
        ApiError::Network(_) => "could not reach the server; check your connection".to_string(),
        ApiError::Unauthorized => "your session has expired; log in again".to_string(),
        ApiError::Remote { message, .. } => message.clone(),
        ApiError::Storage(err) => format!("could not store credentials locally: {}", err),
    }
}
