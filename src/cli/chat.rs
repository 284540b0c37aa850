use std::io::{self, Write};

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use uuid::Uuid;

use crate::ai::chat::{ChatSession, Reply, Role};
use crate::ai::prompt::{TAGLINE, TITLE, USAGE_TIPS};
use crate::ai::{ProviderKind, ProviderRegistry, Selection};
use crate::core::{AppConfig, init_tracing};

const HELP: &str = "Commands:
  /clear                     clear the chat history
  /provider <name> [model]   switch provider and model
  /models                    list configured providers and models
  /history                   print the conversation so far
  /help                      show this help
  /quit                      exit";

#[derive(Debug, PartialEq)]
enum ReplCommand {
    Clear,
    Provider { name: String, model: Option<String> },
    Models,
    History,
    Help,
    Quit,
    Unknown(String),
}

/// Lines starting with `/` are commands, anything else is a message
fn parse_command(line: &str) -> Option<ReplCommand> {
    let rest = line.strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let command = match parts.next().unwrap_or_default() {
        "clear" | "reset" => ReplCommand::Clear,
        "provider" => match parts.next() {
            Some(name) => ReplCommand::Provider {
                name: name.to_string(),
                model: parts.next().map(String::from),
            },
            None => ReplCommand::Unknown(line.to_string()),
        },
        "models" => ReplCommand::Models,
        "history" => ReplCommand::History,
        "help" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        _ => ReplCommand::Unknown(line.to_string()),
    };
    Some(command)
}

fn initial_selection(
    registry: &ProviderRegistry,
    provider: Option<ProviderKind>,
    model: Option<&str>,
) -> Result<Selection> {
    let kind = provider.unwrap_or(registry.default_selection().provider);
    registry.resolve(kind, model)
}

fn print_models(registry: &ProviderRegistry, selection: &Selection) {
    for descriptor in registry.descriptors() {
        println!("{} ({})", descriptor.display_name, descriptor.name);
        for model in descriptor.models {
            let marker = if descriptor.name == selection.provider && model == selection.model {
                "*"
            } else {
                " "
            };
            println!("  {} {}", marker, model);
        }
    }
}

fn print_history(session: &ChatSession) {
    for msg in session.visible() {
        let label = match msg.role {
            Role::User => "You",
            Role::Assistant => "Advisor",
            Role::System => continue,
        };
        println!("{}: {}\n", label, msg.content);
    }
}

/// Add `fragment` to the reply and return what to write to the terminal:
/// a backspace over the old cursor, then the new text and the cursor.
fn redraw(reply: &mut Reply, fragment: &str) -> String {
    let shown = reply.content().len();
    reply.push(fragment);
    format!("\u{8}{}", &reply.partial_display()[shown..])
}

async fn send(session: &mut ChatSession, registry: &ProviderRegistry, text: &str) -> Result<()> {
    let mut reply = Reply::new();
    let mut stdout = io::stdout();
    write!(stdout, "{}", reply.partial_display())?;
    stdout.flush()?;

    let exchange = session
        .exchange(registry, text, move |fragment| {
            let mut stdout = io::stdout();
            let _ = write!(stdout, "{}", redraw(&mut reply, fragment));
            let _ = stdout.flush();
        })
        .await;

    write!(stdout, "\u{8} \u{8}")?;
    if exchange.failed {
        writeln!(stdout)?;
        writeln!(stdout, "{}", exchange.content)?;
    }
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

pub async fn run(provider: Option<ProviderKind>, model: Option<String>) -> Result<()> {
    init_tracing("warn");

    // Missing credentials stop here, before any input is read
    let config = AppConfig::from_env()?;
    let registry = ProviderRegistry::from_config(&config)?;
    let selection = initial_selection(&registry, provider, model.as_deref())?;
    let mut session = ChatSession::new(
        &Uuid::new_v4().to_string(),
        &config.system_message,
        selection,
    );

    let mut rl = DefaultEditor::new()?;

    println!("{}\n{}\n", TITLE, TAGLINE);
    println!("Try these questions:");
    for tip in USAGE_TIPS {
        println!("  - {}", tip);
    }
    println!("\n{}  (type /help for commands)\n", session.footer());

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                match parse_command(line) {
                    Some(ReplCommand::Quit) => break,
                    Some(ReplCommand::Clear) => {
                        session.reset();
                        println!("Chat history cleared.");
                    }
                    Some(ReplCommand::Provider { name, model }) => {
                        let switched = name
                            .parse::<ProviderKind>()
                            .and_then(|kind| session.select(&registry, kind, model.as_deref()).cloned());
                        match switched {
                            Ok(_) => println!("{}", session.footer()),
                            Err(e) => println!("{}", e),
                        }
                    }
                    Some(ReplCommand::Models) => print_models(&registry, session.selection()),
                    Some(ReplCommand::History) => print_history(&session),
                    Some(ReplCommand::Help) => println!("{}", HELP),
                    Some(ReplCommand::Unknown(cmd)) => {
                        println!("Unknown command: {}\n{}", cmd, HELP)
                    }
                    None => send(&mut session, &registry, line).await?,
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
