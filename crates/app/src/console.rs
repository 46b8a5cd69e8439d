//! Slash commands typed into the `vmeet join` console

use vmeet_core::{PaginationSettings, ParticipantId, SortKey};

use crate::session::LocalAction;

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Action(LocalAction),
    /// Print the speaker stats, optionally filtered by name
    Stats(Option<String>),
    /// Print the roster and current page
    Who,
    Help,
    Quit,
}

pub const HELP: &str = "\
/tile on|off             toggle tile view
/filmstrip on|off        show or hide the filmstrip
/document on|off         show or hide the shared document
/pin <id> | /unpin       pin a participant
/order <id> [<id> ...]   move participants to the front
/sort name|muted|manual  set the pagination order
/page <n>                go to page n
/follow on|off           toggle follow-me (moderators)
/record on|off           mark recording as running
/grant <id>              make someone moderator
/mute <audio> <video>    report mute state, e.g. /mute on off
/stats [name]            speaker stats
/who                     roster and current page
/quit                    leave";

fn on_off(arg: Option<&&str>, usage: &str) -> Result<bool, String> {
    match arg.copied() {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => Err(format!("Usage: {}", usage)),
    }
}

/// Parse one console line. `pagination` is the current setting, used as the
/// base for `/sort` and `/page`.
pub fn parse_line(line: &str, pagination: &PaginationSettings) -> Result<ConsoleCommand, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() {
        return Err("Type /help for commands".to_string());
    }

    let action = match parts[0] {
        "/tile" => LocalAction::SetTileView(on_off(parts.get(1), "/tile on|off")?),
        "/filmstrip" => LocalAction::SetFilmstripVisible(on_off(parts.get(1), "/filmstrip on|off")?),
        "/document" => {
            LocalAction::SetSharedDocumentVisible(on_off(parts.get(1), "/document on|off")?)
        }
        "/pin" => match parts.get(1) {
            Some(id) => LocalAction::Pin(Some(ParticipantId::from(*id))),
            None => return Err("Usage: /pin <id>".to_string()),
        },
        "/unpin" => LocalAction::Pin(None),
        "/order" => {
            if parts.len() < 2 {
                return Err("Usage: /order <id> [<id> ...]".to_string());
            }
            LocalAction::ReorderParticipants(parts[1..].iter().map(|id| ParticipantId::from(*id)).collect())
        }
        "/sort" => {
            let order = match parts.get(1).copied() {
                Some("name") => vec![SortKey::DisplayName],
                Some("muted") => vec![SortKey::VideoMuted, SortKey::DisplayName],
                Some("manual") => vec![SortKey::UserDefined],
                _ => return Err("Usage: /sort name|muted|manual".to_string()),
            };
            LocalAction::SetPagination(PaginationSettings {
                order,
                ..pagination.clone()
            })
        }
        "/page" => match parts.get(1).and_then(|n| n.parse::<usize>().ok()) {
            Some(current) if current > 0 => LocalAction::SetPagination(PaginationSettings {
                current,
                ..pagination.clone()
            }),
            _ => return Err("Usage: /page <n> (from 1)".to_string()),
        },
        "/follow" => LocalAction::SetFollowMeEnabled(on_off(parts.get(1), "/follow on|off")?),
        "/record" => LocalAction::SetRecording(on_off(parts.get(1), "/record on|off")?),
        "/grant" => match parts.get(1) {
            Some(id) => LocalAction::GrantModerator(ParticipantId::from(*id)),
            None => return Err("Usage: /grant <id>".to_string()),
        },
        "/mute" => LocalAction::SetMediaState {
            audio_muted: on_off(parts.get(1), "/mute on|off on|off")?,
            video_muted: on_off(parts.get(2), "/mute on|off on|off")?,
        },
        "/stats" => {
            let query = (parts.len() > 1).then(|| parts[1..].join(" "));
            return Ok(ConsoleCommand::Stats(query));
        }
        "/who" => return Ok(ConsoleCommand::Who),
        "/help" => return Ok(ConsoleCommand::Help),
        "/quit" | "/leave" => return Ok(ConsoleCommand::Quit),
        other => return Err(format!("Unknown command {}. Type /help for commands", other)),
    };

    Ok(ConsoleCommand::Action(action))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<ConsoleCommand, String> {
        parse_line(line, &PaginationSettings::default())
    }

    #[test]
    fn test_toggles() {
        assert_eq!(
            parse("/tile on"),
            Ok(ConsoleCommand::Action(LocalAction::SetTileView(true)))
        );
        assert_eq!(
            parse("  /follow   off "),
            Ok(ConsoleCommand::Action(LocalAction::SetFollowMeEnabled(false)))
        );
        assert!(parse("/tile maybe").is_err());
    }

    #[test]
    fn test_pin_and_order() {
        assert_eq!(
            parse("/pin abc"),
            Ok(ConsoleCommand::Action(LocalAction::Pin(Some("abc".into()))))
        );
        assert_eq!(parse("/unpin"), Ok(ConsoleCommand::Action(LocalAction::Pin(None))));
        assert_eq!(
            parse("/order b a"),
            Ok(ConsoleCommand::Action(LocalAction::ReorderParticipants(vec![
                "b".into(),
                "a".into()
            ])))
        );
    }

    #[test]
    fn test_pagination_keeps_other_fields() {
        let current = PaginationSettings {
            current: 3,
            ..Default::default()
        };
        match parse_line("/sort manual", &current) {
            Ok(ConsoleCommand::Action(LocalAction::SetPagination(settings))) => {
                assert_eq!(settings.order, vec![SortKey::UserDefined]);
                assert_eq!(settings.current, 3);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse("/page 0").is_err());
    }

    #[test]
    fn test_stats_query() {
        assert_eq!(parse("/stats"), Ok(ConsoleCommand::Stats(None)));
        assert_eq!(
            parse("/stats jane doe"),
            Ok(ConsoleCommand::Stats(Some("jane doe".into())))
        );
    }

    #[test]
    fn test_unknown_command() {
        assert!(parse("/dance").is_err());
        assert!(parse("").is_err());
    }
}
