//! `patchloop agent`: single-message or interactive chat.

use patchloop_agent::{AgentLoop, Session};
use patchloop_config::AgentConfig;
use patchloop_core::event::DomainEvent;
use patchloop_providers::OpenAiCompatProvider;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    message: Option<String>,
    command: Option<String>,
    workspace: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let root = super::workspace_root(workspace)?;

    if let Some(name) = &command {
        if config.agent.command_prompt(name).is_none() {
            return Err(format!("Unknown agent command: {name}").into());
        }
    }

    if !config.has_api_key() {
        tracing::warn!(api_url = %config.api_url, "No API key configured; requests are sent unauthenticated");
    }

    let provider = Arc::new(OpenAiCompatProvider::from_config(&config)?);

    let store = if config.checkpoints.enabled {
        Some(Arc::new(super::open_store(&config, &root).await?))
    } else {
        None
    };

    let tools = Arc::new(patchloop_tools::default_registry(
        &root,
        &config.tools,
        store.clone(),
    ));
    let tool_count = tools.len();

    let mut agent = AgentLoop::from_config(provider, tools, root.clone(), &config);
    if let Some(store) = store {
        agent = agent.with_checkpoints(store);
    }
    spawn_event_printer(&agent);

    let mut session = agent.new_session();

    if let Some(msg) = message {
        let handle = session.stop_handle();
        let signal = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                handle.stop();
            }
        });
        eprint!("  Thinking...");
        let response = agent
            .run_with_command(&mut session, &msg, command.as_deref())
            .await;
        eprint!("\r              \r");
        signal.abort();
        println!("{response}");
        return Ok(());
    }

    println!();
    println!("  patchloop agent, interactive mode");
    println!();
    println!("  Model:      {}", config.model);
    println!("  Endpoint:   {}", config.api_url);
    println!("  Workspace:  {}", root.display());
    println!("  Tools:      {tool_count}");
    println!(
        "  Checkpoints: {}",
        if config.checkpoints.enabled { "on" } else { "off" }
    );
    println!();
    println!("  Type your message and press Enter.");
    println!("  Ctrl+C stops a running request; /reset clears the conversation; 'exit' quits.");
    if !config.agent.commands.is_empty() {
        let names: Vec<&str> = config.agent.commands.iter().map(|c| c.name.as_str()).collect();
        println!("  Commands:   /{}", names.join(", /"));
    }
    println!();

    let running = Arc::new(AtomicBool::new(false));
    spawn_stop_on_ctrl_c(&session, running.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => {}
            "exit" | "quit" => break,
            "/reset" => {
                session.reset_messages();
                println!("  Conversation cleared.");
            }
            input => {
                let (command, query) = split_command(input, &config.agent);
                running.store(true, Ordering::SeqCst);
                eprint!("  ...");
                let response = agent.run_with_command(&mut session, query, command).await;
                running.store(false, Ordering::SeqCst);
                eprint!("\r     \r");
                println!();
                for line in response.lines() {
                    println!("  Assistant > {line}");
                }
                println!();
            }
        }
        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

/// Split `/name rest` into a configured command name and its query.
/// Anything else is a plain query.
fn split_command<'a>(input: &'a str, agent: &AgentConfig) -> (Option<&'a str>, &'a str) {
    let Some(rest) = input.strip_prefix('/') else {
        return (None, input);
    };
    let (name, query) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    match agent.command_prompt(name) {
        Some(_) => (Some(name), query.trim_start()),
        None => (None, input),
    }
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

/// Ctrl+C stops the run in flight, or exits when idle.
fn spawn_stop_on_ctrl_c(session: &Session, running: Arc<AtomicBool>) {
    let handle = session.stop_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if running.load(Ordering::SeqCst) {
                eprintln!("\n  Stopping...");
                handle.stop();
            } else {
                println!();
                std::process::exit(130);
            }
        }
    });
}

/// Print tool activity and checkpoints to stderr while a run is going.
fn spawn_event_printer(agent: &AgentLoop) {
    let mut rx = agent.event_bus().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event.as_ref() {
                DomainEvent::ToolExecuted {
                    tool_name,
                    success,
                    duration_ms,
                    ..
                } => {
                    let mark = if *success { "ok" } else { "failed" };
                    eprintln!("\r  [tool] {tool_name} {mark} ({duration_ms} ms)");
                }
                DomainEvent::CheckpointCreated { commit, .. } => {
                    let short = commit.get(..8).unwrap_or(commit);
                    eprintln!("\r  [checkpoint] {short}");
                }
                _ => {}
            }
        }
    });
}
