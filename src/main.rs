use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use serene_config::{PortalConfig, SessionSettings};
use serene_conversation::{Conversation, ResponseSelector, Transcript};
use serene_core::{Message, Sender};
use serene_journal::{Journal, JournalEntry};
use serene_metrics::{ProgressData, ProgressReport};
use serene_session::{CbtSession, SendOutcome, SessionError, SessionEvent};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "serene")]
#[command(about = "SereneMind wellness portal: CBT sessions, journal and progress", long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive CBT session
    Chat {
        /// Write the transcript as JSON when the session ends
        #[arg(short, long, value_name = "PATH")]
        export: Option<PathBuf>,

        /// Reply without the typing delays
        #[arg(long, action = clap::ArgAction::SetTrue)]
        immediate: bool,
    },

    /// Show which reply a message would get
    Respond {
        /// Number of messages already in the conversation
        #[arg(long, default_value_t = 1)]
        history: usize,

        /// The user's message
        text: String,
    },

    /// Manage journal entries
    Journal {
        /// Journal file (defaults to the configured data directory)
        #[arg(short, long, value_name = "PATH")]
        file: Option<PathBuf>,

        #[command(subcommand)]
        action: JournalAction,
    },

    /// Summarize mood, session adherence, goals and badges
    Progress {
        /// YAML file with mood_log, goals and badges
        #[arg(short, long, value_name = "PATH")]
        data: PathBuf,
    },
}

#[derive(Subcommand)]
enum JournalAction {
    /// List entries, newest first
    List,

    /// Find entries by title, content or tag
    Search { term: String },

    /// Show one entry in full
    Show { id: String },

    /// Add an entry
    New {
        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        content: Option<String>,

        /// 1 (very bad) to 5 (very good)
        #[arg(short, long)]
        mood: Option<u8>,

        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Replace an entry's title and/or content
    Edit {
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        content: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let config_path = cli.config.unwrap_or_else(PortalConfig::default_config_path);
    let config = if config_path.exists() {
        info!("Loading configuration from: {:?}", config_path);
        PortalConfig::from_yaml(&config_path)?
    } else {
        info!("Using default configuration");
        PortalConfig::default()
    };

    match cli.command {
        Commands::Chat { export, immediate } => {
            let settings = if immediate {
                SessionSettings {
                    greeting: config.session.greeting.clone(),
                    exercise_after_messages: config.session.exercise_after_messages,
                    ..SessionSettings::immediate()
                }
            } else {
                config.session.clone()
            };
            interactive_session(&config.portal.name, settings, export).await?;
        }
        Commands::Respond { history, text } => {
            respond_once(&config, history, &text)?;
        }
        Commands::Journal { file, action } => {
            let path = file.unwrap_or_else(|| config.journal_path());
            run_journal(&path, action)?;
        }
        Commands::Progress { data } => {
            show_progress(&data)?;
        }
    }

    Ok(())
}

async fn interactive_session(
    portal_name: &str,
    settings: SessionSettings,
    export: Option<PathBuf>,
) -> Result<()> {
    let session = CbtSession::scripted(settings);

    println!("🧠 {portal_name} CBT Session");
    println!("Type 'exit' or 'quit' to end the session");
    println!("═══════════════════════════════════════\n");

    for message in session.transcript().await.messages() {
        print_message(message);
    }

    let mut events = session.events();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                Ok(SessionEvent::MessageAppended(message)) if message.is_from_agent() => {
                    print_message(&message);
                }
                Ok(SessionEvent::AgentTyping) => {
                    println!("(typing...)");
                }
                Ok(_) => {}
                Err(e) => warn!("Missed session events: {}", e),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You> ");
        io::stdout().flush()?;

        let Some(input) = lines.next_line().await? else {
            break;
        };
        let trimmed = input.trim();

        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            println!("Take care. Goodbye!");
            break;
        }

        match session.send(&input).await {
            Ok(SendOutcome::Ignored) => continue,
            Ok(SendOutcome::Scheduled { .. }) => session.wait_idle().await,
            Err(SessionError::AgentTyping) => println!("(the guide is still replying)"),
            Err(e) => return Err(e.into()),
        }
    }

    session.close().await;

    let transcript = session.transcript().await;
    let metrics = session.metrics().await.get_summary();
    println!(
        "\n📊 Session: {} messages from you, {} exercises",
        metrics.user_messages, metrics.exercises_delivered
    );

    if let Some(path) = export {
        Transcript::from_conversation(&transcript)
            .write_json(&path)
            .with_context(|| format!("Failed to export transcript to {}", path.display()))?;
        println!("Transcript written to {}", path.display());
    }

    drop(session);
    printer.abort();
    Ok(())
}

fn print_message(message: &Message) {
    let time = message.timestamp.format("%H:%M");
    match message.sender {
        Sender::Agent if message.is_exercise => {
            println!("\n💡 Guide [{time}] (Structured Exercise)\n{}\n", message.content);
        }
        Sender::Agent => println!("\nGuide [{time}]> {}\n", message.content),
        Sender::User => {}
    }
}

fn respond_once(config: &PortalConfig, history: usize, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        println!("(blank input is ignored)");
        return Ok(());
    }

    let selector = ResponseSelector::new(config.session.exercise_after_messages);

    let mut conversation = Conversation::new();
    if history > 0 {
        conversation.push(Message::agent(config.session.greeting.clone(), false));
    }
    for i in 1..history {
        conversation.push(Message::user(format!("message {i}")));
    }

    let reply = selector.select(conversation.messages(), text);
    println!("Rule: {}", reply.rule.as_str());
    println!("Exercise: {}", reply.is_exercise);
    println!("Reply: {}", reply.text);
    Ok(())
}

fn run_journal(path: &Path, action: JournalAction) -> Result<()> {
    let mut journal = Journal::load(path)
        .with_context(|| format!("Failed to load journal from {}", path.display()))?;

    match action {
        JournalAction::List => print_entries(journal.entries().iter()),
        JournalAction::Search { term } => {
            let hits = journal.search(&term);
            if hits.is_empty() {
                println!("No entries match '{term}'");
            }
            print_entries(hits.into_iter());
        }
        JournalAction::Show { id } => {
            let id = journal.resolve_id(&id)?;
            let entry = journal
                .get(&id)
                .with_context(|| format!("No journal entry with id {id}"))?;
            println!("📝 {}", entry.title);
            println!("{} · {}", entry.date.format("%Y-%m-%d"), entry.mood_label());
            if !entry.tags.is_empty() {
                println!("Tags: {}", entry.tags.join(", "));
            }
            println!("\n{}", entry.content);
        }
        JournalAction::New { title, content, mood, tags } => {
            let mut entry = JournalEntry::blank();
            if let Some(title) = title {
                entry.title = title;
            }
            entry.content = content.unwrap_or_default();
            if let Some(mood) = mood {
                entry = entry.with_mood(mood)?;
            }
            let entry = entry.with_tags(tags);

            let id = journal.add(entry).id;
            journal.save(path)?;
            println!("Created entry {id}");
        }
        JournalAction::Edit { id, title, content } => {
            let id = journal.resolve_id(&id)?;
            let current = journal
                .get(&id)
                .cloned()
                .with_context(|| format!("No journal entry with id {id}"))?;

            journal.save_entry(
                &id,
                title.unwrap_or(current.title),
                content.unwrap_or(current.content),
            )?;
            journal.save(path)?;
            println!("Updated entry {id}");
        }
    }

    Ok(())
}

fn print_entries<'a>(entries: impl Iterator<Item = &'a JournalEntry>) {
    for entry in entries {
        let (tags, hidden) = entry.tag_preview(2);
        let mut tag_line = tags.join(", ");
        if hidden > 0 {
            tag_line.push_str(&format!(" +{hidden}"));
        }

        println!(
            "{}  {}  {:<28} [{}] {}",
            &entry.id.to_string()[..8],
            entry.date.format("%Y-%m-%d"),
            entry.title,
            entry.mood_label(),
            tag_line
        );
    }
}

fn show_progress(data_path: &Path) -> Result<()> {
    let data = ProgressData::from_yaml(data_path)
        .with_context(|| format!("Failed to load progress data from {}", data_path.display()))?;
    let report = ProgressReport::from_data(&data);

    println!("\n📈 My Progress");
    println!("═══════════════════════════════════════");
    println!("  Average mood:  {}", report.average_mood_display());
    println!("  Sessions:      {}", report.total_sessions);
    println!("  Adherence:     {}", report.adherence_display());
    println!("  Badges earned: {}", report.badges_earned);
    println!("\n{}", report.sessions_summary());

    if !report.goals.is_empty() {
        println!("\n🎯 Goals & Milestones");
        for goal in &report.goals {
            println!("  {:<28} {:>3}%", goal.name, goal.progress);
        }
    }

    if !data.badges.is_empty() {
        println!("\n🏆 Achievement Gallery");
        for badge in &data.badges {
            match (&badge.date, badge.earned) {
                (Some(date), true) => println!("  {} {} ({date})", badge.icon, badge.name),
                (None, true) => println!("  {} {}", badge.icon, badge.name),
                (_, false) => println!("  {} {} (Locked)", badge.icon, badge.name),
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose { "debug" } else { "warn" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    Ok(())
}
