use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ideaflow::client::{ApiClient, ClientError};
use ideaflow::config::Config;
use ideaflow::guard::{GuardDecision, RouteGuard};
use ideaflow::models::*;
use ideaflow::runner::{AgentRunner, GenerateOptions, RunState, RunnerRegistry};
use ideaflow::session::{FileTokenStore, SessionContext};

#[derive(Parser)]
#[command(name = "ifl")]
#[command(about = "Validate startup ideas and generate the reports that build on them")]
struct Cli {
    /// Backend base URL (overrides IDEAFLOW_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        email: String,
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Confirm an account with the token from the verification email
    Verify { token: String },
    /// Show which sign-in methods the backend offers
    Providers,
    /// Log in and remember the session
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List your ideas and reports
    Dashboard,
    /// Submit a new idea
    Submit {
        #[arg(long)]
        name: String,
        /// Problem, solution and target users (at least 5 words)
        #[arg(long)]
        description: String,
        /// Comma-separated industry tags
        #[arg(long)]
        industry: String,
        /// B2B, B2C or B2B2C
        #[arg(long, default_value = "B2B")]
        customer_type: String,
        /// Comma-separated countries or regions
        #[arg(long)]
        geography: String,
    },
    /// Show a report, generating it when none is stored
    Run {
        idea: String,
        /// validation, market-research, pitch-deck, mvp, legal or chat
        agent: String,
        /// Required for legal: nda, founder_agreement, privacy_policy, terms_of_service
        #[arg(long)]
        document_type: Option<String>,
        /// Replace a stored report with a fresh one
        #[arg(long)]
        regenerate: bool,
        #[arg(long)]
        jurisdiction: Option<String>,
        #[arg(long)]
        company_name: Option<String>,
        #[arg(long)]
        founder_count: Option<u32>,
        /// Print the full report body as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which reports are available for an idea
    Status { idea: String },
    /// Ask the AI co-founder about an idea
    Ask { idea: String, question: String },
}

/// Initialize tracing on stderr so stdout carries only command output
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "ideaflow=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = Config::load();
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }

    let token_path = config.token_path()?;
    let session = Arc::new(SessionContext::new(Arc::new(FileTokenStore::new(token_path))));
    let api = ApiClient::from_config(&config, session.clone());
    let guard = RouteGuard::new(config.login_path.clone());

    match cli.command {
        Commands::Signup {
            email,
            username,
            password,
        } => {
            let input = SignupInput {
                email,
                username,
                password,
            };
            let response = api.signup(&input).await.map_err(explain)?;
            println!("{}", response.message);
        }
        Commands::Verify { token } => {
            let response = api.verify_email(&token).await.map_err(explain)?;
            println!("{}", response.message);
        }
        Commands::Providers => {
            let status = api.google_auth_status().await.map_err(explain)?;
            println!("password: enabled");
            println!(
                "google:   {}",
                if status.google_auth_enabled { "enabled" } else { "disabled" }
            );
        }
        Commands::Login { email, password } => {
            let response = api
                .login(&LoginInput { email, password })
                .await
                .map_err(explain)?;
            session
                .login(&response.access_token, response.user.clone())
                .context("Failed to save session")?;
            println!("Logged in as {}", response.user.username);
        }
        Commands::Logout => {
            session.logout();
            println!("Logged out");
        }
        Commands::Whoami => {
            let state = session.refresh(&api).await;
            match state.user {
                Some(user) => println!("{} <{}>", user.username, user.email),
                None => println!("Not logged in"),
            }
        }
        Commands::Dashboard => {
            require_user(&session, &api, &guard).await?;
            let dashboard = api.dashboard().await.map_err(explain)?;
            print_dashboard(&dashboard);
        }
        Commands::Submit {
            name,
            description,
            industry,
            customer_type,
            geography,
        } => {
            require_user(&session, &api, &guard).await?;
            let Some(target_customer_type) = CustomerType::from_str(&customer_type) else {
                bail!("Customer type must be B2B, B2C or B2B2C");
            };
            let input = CreateIdeaInput {
                startup_name: name,
                one_line_description: description,
                industry,
                target_customer_type,
                geography,
            };
            let created = api.submit_idea(&input).await.map_err(explain)?;
            println!("{}", created.message);
            println!("Idea id: {}", created.idea_id);
        }
        Commands::Run {
            idea,
            agent,
            document_type,
            regenerate,
            jurisdiction,
            company_name,
            founder_count,
            json,
        } => {
            require_user(&session, &api, &guard).await?;
            let Some(kind) = AgentKind::from_str(&agent) else {
                bail!("Unknown agent '{}'", agent);
            };
            let key = match kind {
                AgentKind::Legal => {
                    let raw = document_type.context("--document-type is required for legal")?;
                    let Some(doc) = LegalDocumentType::parse(&raw) else {
                        bail!("Unknown legal document type '{}'", raw);
                    };
                    ResultKey::legal(&idea, doc)
                }
                _ => ResultKey::new(&idea, kind),
            };

            let registry = RunnerRegistry::new(Arc::new(api.clone()));
            let dashboard = api.dashboard().await.map_err(explain)?;
            let gates = registry.gates(&idea, &dashboard.statuses_for(&idea));
            if let Some(gate) = gates.get(&kind).filter(|g| !g.is_enabled()) {
                bail!("{} is {}", kind.label(), gate);
            }

            let options = GenerateOptions {
                jurisdiction,
                company_name,
                founder_count,
            };
            let runner = registry.runner_with_options(key, options);

            let state = tokio::select! {
                state = drive(&runner, regenerate) => state,
                _ = tokio::signal::ctrl_c() => {
                    registry.shutdown();
                    bail!("Cancelled");
                }
            };
            print_run(&state, json)?;
        }
        Commands::Status { idea } => {
            require_user(&session, &api, &guard).await?;
            let dashboard = api.dashboard().await.map_err(explain)?;
            let Some(entry) = dashboard.ideas.iter().find(|i| i.id == idea) else {
                bail!("Idea '{}' not found", idea);
            };

            let statuses = dashboard.statuses_for(&idea);
            let registry = RunnerRegistry::new(Arc::new(api.clone()));
            println!("{} ({})", entry.startup_name, entry.industry);
            for (kind, gate) in registry.gates(&idea, &statuses) {
                let outcome = statuses.get(&kind).copied().unwrap_or_default();
                let after: Vec<&str> = registry
                    .graph()
                    .prerequisites_of(kind)
                    .into_iter()
                    .map(|k| k.label())
                    .collect();
                if after.is_empty() {
                    println!("  {:<22} {:<12} {}", kind.label(), outcome, gate);
                } else {
                    println!(
                        "  {:<22} {:<12} {} (after {})",
                        kind.label(),
                        outcome,
                        gate,
                        after.join(", ")
                    );
                }
            }
        }
        Commands::Ask { idea, question } => {
            require_user(&session, &api, &guard).await?;
            let answer = api.ask(&idea, &question).await.map_err(explain)?;
            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                println!();
                println!("Sources: {}", answer.sources.join(", "));
            }
        }
    }

    Ok(())
}

/// Restore the session and refuse to continue without a user.
async fn require_user(
    session: &SessionContext,
    api: &ApiClient,
    guard: &RouteGuard,
) -> anyhow::Result<User> {
    let mut state = session.subscribe();
    session.refresh(api).await;

    match guard.resolve(&mut state).await {
        GuardDecision::Render => session.user().context("Session has no user"),
        GuardDecision::Redirect { to } => {
            bail!("Not logged in. Run `ifl login` first (sign-in page: {})", to)
        }
        GuardDecision::Placeholder => bail!("Session is still loading"),
    }
}

/// Load the report, or replace it with one fresh generation when asked.
async fn drive(runner: &AgentRunner, regenerate: bool) -> RunState {
    let mut updates = runner.subscribe();
    let progress = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            match &*updates.borrow_and_update() {
                RunState::Loading => eprintln!("Loading stored report..."),
                RunState::Generating => eprintln!("Generating, this can take a minute..."),
                _ => {}
            }
        }
    });

    let state = if regenerate {
        runner.load_fresh().await
    } else {
        runner.load().await
    };
    progress.abort();
    state
}

fn print_run(state: &RunState, json: bool) -> anyhow::Result<()> {
    match state {
        RunState::Success(result) => {
            println!("{}: {}", result.kind.label(), result.status);
            if let Some(score) = result.final_score() {
                println!("Final viability score: {:.1}", score);
            }
            if json {
                if let Some(payload) = &result.payload {
                    println!("{}", serde_json::to_string_pretty(payload)?);
                }
            }
            Ok(())
        }
        RunState::Error(failure) => {
            if failure.retryable {
                bail!("{} (retryable)", failure.message)
            }
            bail!("{}", failure.message)
        }
        other => bail!("Run ended in state {}", other.name()),
    }
}

fn print_dashboard(dashboard: &Dashboard) {
    println!("Signed in as {}", dashboard.user.username);
    if dashboard.ideas.is_empty() {
        println!("No ideas yet. Submit one with `ifl submit`.");
        return;
    }
    for idea in &dashboard.ideas {
        let score = idea
            .final_viability_score
            .map(|s| format!("{:.1}", s))
            .unwrap_or_else(|| "not evaluated".to_string());
        println!("{}  {} ({})  score: {}", idea.id, idea.startup_name, idea.industry, score);
    }
    println!(
        "{} market research, {} pitch decks, {} MVP reports, {} legal documents",
        dashboard.market_research.len(),
        dashboard.pitch_decks.len(),
        dashboard.mvp_reports.len(),
        dashboard.legal_documents.len()
    );
}

fn explain(e: ClientError) -> anyhow::Error {
    anyhow::anyhow!(e.user_message())
}
