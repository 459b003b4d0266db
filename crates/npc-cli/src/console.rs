//! Line-oriented stdin console for talking to a running simulation.
//!
//! ```text
//! say <text>                 broadcast chat as the player
//! @<agent> <text>            directed command, the agent decides whether to obey
//! follow <agent>             manual follow of the player
//! release <agent>
//! combat <agent> on|off
//! auto <agent> on|off
//! despawn <agent>
//! status
//! quit
//! ```

use std::io::BufRead;

use anyhow::{anyhow, bail, Result};
use npc_brain::{CommandSender, IncomingCommand};
use npc_core::EntityId;
use tokio::sync::mpsc::UnboundedSender;

/// Requests the tick loop answers itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleRequest {
    Status,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleLine {
    Command(IncomingCommand),
    Request(ConsoleRequest),
    Empty,
}

/// Who is typing at the console.
#[derive(Debug, Clone)]
pub struct Speaker {
    pub name: String,
    pub entity: EntityId,
}

fn toggle(word: Option<&str>) -> Result<bool> {
    match word {
        Some("on") | Some("yes") | Some("true") => Ok(true),
        Some("off") | Some("no") | Some("false") => Ok(false),
        Some(other) => bail!("expected on/off, got '{other}'"),
        None => bail!("expected on/off"),
    }
}

pub fn parse(line: &str, speaker: &Speaker) -> Result<ConsoleLine> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ConsoleLine::Empty);
    }

    if let Some(rest) = line.strip_prefix('@') {
        let (agent, text) = rest
            .split_once(char::is_whitespace)
            .ok_or_else(|| anyhow!("usage: @<agent> <command>"))?;
        return Ok(ConsoleLine::Command(IncomingCommand::Directed {
            sender: speaker.name.clone(),
            agent: agent.to_string(),
            text: text.trim().to_string(),
        }));
    }

    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let mut args = rest.split_whitespace();
    let agent = |args: &mut std::str::SplitWhitespace<'_>| {
        args.next()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("{verb} needs an agent name"))
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "say" => {
            if rest.trim().is_empty() {
                bail!("say needs a message");
            }
            IncomingCommand::Chat {
                sender: speaker.name.clone(),
                text: rest.trim().to_string(),
            }
        }
        "follow" => IncomingCommand::Follow {
            agent: agent(&mut args)?,
            target: Some(speaker.entity),
        },
        "release" => IncomingCommand::ReleaseFollow {
            agent: agent(&mut args)?,
        },
        "combat" => IncomingCommand::AuthorizeCombat {
            agent: agent(&mut args)?,
            allowed: toggle(args.next())?,
        },
        "auto" => IncomingCommand::SetAutonomous {
            agent: agent(&mut args)?,
            enabled: toggle(args.next())?,
        },
        "despawn" => IncomingCommand::Despawn {
            agent: agent(&mut args)?,
        },
        "status" => return Ok(ConsoleLine::Request(ConsoleRequest::Status)),
        "quit" | "exit" => return Ok(ConsoleLine::Request(ConsoleRequest::Quit)),
        other => bail!("unknown command '{other}'"),
    };
    Ok(ConsoleLine::Command(command))
}

/// Read stdin until EOF on a plain thread; a blocking read would otherwise
/// hold up runtime shutdown. Simulation commands go through `commands`;
/// status and quit go to the tick loop.
pub fn spawn_reader(
    speaker: Speaker,
    commands: CommandSender,
    requests: UnboundedSender<ConsoleRequest>,
) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        tracing::warn!(error = %err, "console read failed");
                        break;
                    }
                };
                let delivered = match parse(&line, &speaker) {
                    Ok(ConsoleLine::Command(command)) => commands.send(command),
                    Ok(ConsoleLine::Request(request)) => requests.send(request).is_ok(),
                    Ok(ConsoleLine::Empty) => true,
                    Err(err) => {
                        eprintln!("{err}");
                        true
                    }
                };
                if !delivered {
                    break;
                }
            }
            tracing::debug!("console closed");
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sam() -> Speaker {
        Speaker {
            name: "Sam".to_string(),
            entity: EntityId(1),
        }
    }

    #[test]
    fn directed_commands_keep_the_full_text() {
        let parsed = parse("@Alex  go chop some trees", &sam()).expect("parse");
        assert_eq!(
            parsed,
            ConsoleLine::Command(IncomingCommand::Directed {
                sender: "Sam".to_string(),
                agent: "Alex".to_string(),
                text: "go chop some trees".to_string(),
            })
        );
    }

    #[test]
    fn follow_targets_the_speaker() {
        let parsed = parse("follow steve", &sam()).expect("parse");
        assert_eq!(
            parsed,
            ConsoleLine::Command(IncomingCommand::Follow {
                agent: "steve".to_string(),
                target: Some(EntityId(1)),
            })
        );
    }

    #[test]
    fn toggles_need_on_or_off() {
        assert_eq!(
            parse("combat alex on", &sam()).expect("parse"),
            ConsoleLine::Command(IncomingCommand::AuthorizeCombat {
                agent: "alex".to_string(),
                allowed: true,
            })
        );
        assert!(parse("auto alex maybe", &sam()).is_err());
        assert!(parse("auto", &sam()).is_err());
    }

    #[test]
    fn requests_and_blank_lines() {
        assert_eq!(
            parse("status", &sam()).expect("parse"),
            ConsoleLine::Request(ConsoleRequest::Status)
        );
        assert_eq!(parse("   ", &sam()).expect("parse"), ConsoleLine::Empty);
        assert!(parse("dance", &sam()).is_err());
        assert!(parse("say", &sam()).is_err());
    }
}
