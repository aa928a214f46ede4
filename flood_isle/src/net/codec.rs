//! Mapping between game values and envelope payloads.
//!
//! Every [`GameEvent`] becomes exactly one [`MessageType`] plus payload
//! pairs. Several events share a type, so each event payload starts with an
//! `event` key naming the variant. Positions are written `x,y`, position
//! lists `x,y;x,y` and name lists `a,b`.

use std::str::FromStr;

use super::{
    errors::{FormatError, Result},
    messages::{Message, MessageId, MessageType},
};
use crate::game::{
    CardKind, GameEvent, GameSnapshot, Intent, PlayerName, Position, RoleKind, TileState,
};

const EVENT_KEY: &str = "event";
const LIFT_OFF: &str = "off";

// === Payload helpers ===

fn parse_value<T>(msg: &Message, key: &'static str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    msg.require(key)?
        .parse()
        .map_err(|err: T::Err| FormatError::BadFieldValue {
            key,
            reason: err.to_string(),
        })
}

fn join_positions(positions: &[Position]) -> String {
    let parts: Vec<String> = positions.iter().map(ToString::to_string).collect();
    parts.join(";")
}

fn parse_positions(key: &'static str, value: &str) -> Result<Vec<Position>> {
    value
        .split(';')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse().map_err(|err: crate::game::ParseValueError| {
                FormatError::BadFieldValue {
                    key,
                    reason: err.to_string(),
                }
            })
        })
        .collect()
}

fn join_names(names: &[PlayerName]) -> String {
    let parts: Vec<&str> = names.iter().map(PlayerName::as_str).collect();
    parts.join(",")
}

fn parse_names(value: &str) -> Vec<PlayerName> {
    value
        .split(',')
        .filter(|part| !part.is_empty())
        .map(PlayerName::new)
        .collect()
}

fn bad(key: &'static str, value: &str) -> FormatError {
    FormatError::BadFieldValue {
        key,
        reason: format!("unexpected {value:?}"),
    }
}

// === Events ===

/// Wire name of an event's variant.
pub fn event_name(event: &GameEvent) -> &'static str {
    match event {
        GameEvent::GameStarted { .. } => "game_started",
        GameEvent::TurnStarted { .. } => "turn_started",
        GameEvent::PlayerMoved { .. } => "player_moved",
        GameEvent::FloodCardDrawn { .. } => "flood_card_drawn",
        GameEvent::TileFlooded { .. } => "tile_flooded",
        GameEvent::TileSank { .. } => "tile_sank",
        GameEvent::TileShoredUp { .. } => "tile_shored_up",
        GameEvent::CardDrawn { .. } => "card_drawn",
        GameEvent::WaterRose { .. } => "water_rose",
        GameEvent::CardGiven { .. } => "card_given",
        GameEvent::CardDiscarded { .. } => "card_discarded",
        GameEvent::TreasureCaptured { .. } => "treasure_captured",
        GameEvent::NavigatorDirecting { .. } => "navigator_directing",
        GameEvent::HelicopterLifted { .. } => "helicopter_lifted",
        GameEvent::SandbagsUsed { .. } => "sandbags_used",
        GameEvent::PhaseChanged { .. } => "phase_changed",
        GameEvent::TurnEnded { .. } => "turn_ended",
        GameEvent::GameOver { .. } => "game_over",
    }
}

pub fn event_type(event: &GameEvent) -> MessageType {
    match event {
        GameEvent::GameStarted { .. } => MessageType::GameStart,
        GameEvent::TurnStarted { .. } => MessageType::TurnStart,
        GameEvent::PlayerMoved { .. } => MessageType::PlayerMove,
        GameEvent::FloodCardDrawn { .. }
        | GameEvent::TileFlooded { .. }
        | GameEvent::TileSank { .. } => MessageType::DrawFloodCard,
        GameEvent::TileShoredUp { .. } => MessageType::ShoreUp,
        GameEvent::CardDrawn { .. } | GameEvent::WaterRose { .. } => MessageType::DrawTreasureCard,
        GameEvent::CardGiven { .. } => MessageType::GiveCard,
        GameEvent::CardDiscarded { .. } => MessageType::DiscardCard,
        GameEvent::TreasureCaptured { .. } => MessageType::CaptureTreasure,
        GameEvent::NavigatorDirecting { .. } => MessageType::NavigatorDirectedMove,
        GameEvent::HelicopterLifted { .. } => MessageType::HelicopterMove,
        GameEvent::SandbagsUsed { .. } => MessageType::SandbagsUse,
        GameEvent::PhaseChanged { .. } => MessageType::UpdateRoom,
        GameEvent::TurnEnded { .. } => MessageType::EndTurn,
        GameEvent::GameOver { .. } => MessageType::GameOver,
    }
}

/// Wraps an event in a broadcast envelope.
pub fn encode_event(event: &GameEvent, id: MessageId, room_id: &str, from: &str) -> Message {
    let msg = Message::new(id, event_type(event), room_id, from).with(EVENT_KEY, event_name(event));
    match event {
        GameEvent::GameStarted {
            players,
            water_level,
        } => {
            let players: Vec<String> = players
                .iter()
                .map(|(name, role, pos)| format!("{name}:{role}:{pos}"))
                .collect();
            msg.with("players", players.join(";"))
                .with("water_level", water_level)
        }
        GameEvent::TurnStarted { player, turn } => msg.with("player", player).with("turn", turn),
        GameEvent::PlayerMoved { player, from, to } => msg
            .with("player", player)
            .with("from", from)
            .with("to", to),
        GameEvent::FloodCardDrawn { tile, position }
        | GameEvent::TileFlooded { tile, position }
        | GameEvent::TileSank { tile, position }
        | GameEvent::TileShoredUp { tile, position } => {
            msg.with("tile", tile).with("position", position)
        }
        GameEvent::CardDrawn { player, card } | GameEvent::CardDiscarded { player, card } => {
            msg.with("player", player).with("card", card)
        }
        GameEvent::WaterRose { level } => msg.with("level", level),
        GameEvent::CardGiven { from, to, card } => msg
            .with("giver", from)
            .with("recipient", to)
            .with("card", card),
        GameEvent::TreasureCaptured { player, treasure } => {
            msg.with("player", player).with("treasure", treasure)
        }
        GameEvent::NavigatorDirecting {
            navigator,
            target,
            moves,
        } => msg
            .with("navigator", navigator)
            .with("target", target)
            .with("moves", moves),
        GameEvent::HelicopterLifted {
            holder,
            passengers,
            to,
        } => {
            let to = to.map_or_else(|| LIFT_OFF.to_string(), |to| to.to_string());
            msg.with("holder", holder)
                .with("passengers", join_names(passengers))
                .with("to", to)
        }
        GameEvent::SandbagsUsed { player, position } => {
            msg.with("player", player).with("position", position)
        }
        GameEvent::PhaseChanged { phase } => msg.with("phase", phase),
        GameEvent::TurnEnded { player } => msg.with("player", player),
        GameEvent::GameOver { outcome } => msg.with("outcome", outcome),
    }
}

fn parse_game_players(value: &str) -> Result<Vec<(PlayerName, RoleKind, Position)>> {
    value
        .split(';')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut fields = part.splitn(3, ':');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(name), Some(role), Some(pos)) => {
                    let role = role.parse().map_err(|_| bad("players", part))?;
                    let pos = pos.parse().map_err(|_| bad("players", part))?;
                    Ok((PlayerName::new(name), role, pos))
                }
                _ => Err(bad("players", part)),
            }
        })
        .collect()
}

/// Reads an event back out of an envelope produced by [`encode_event`].
pub fn decode_event(msg: &Message) -> Result<GameEvent> {
    let name = msg.require(EVENT_KEY)?;
    let event = match name {
        "game_started" => GameEvent::GameStarted {
            players: parse_game_players(msg.require("players")?)?,
            water_level: parse_value(msg, "water_level")?,
        },
        "turn_started" => GameEvent::TurnStarted {
            player: PlayerName::new(msg.require("player")?),
            turn: parse_value(msg, "turn")?,
        },
        "player_moved" => GameEvent::PlayerMoved {
            player: PlayerName::new(msg.require("player")?),
            from: parse_value(msg, "from")?,
            to: parse_value(msg, "to")?,
        },
        "flood_card_drawn" | "tile_flooded" | "tile_sank" | "tile_shored_up" => {
            let tile = msg.require("tile")?.to_string();
            let position = parse_value(msg, "position")?;
            match name {
                "flood_card_drawn" => GameEvent::FloodCardDrawn { tile, position },
                "tile_flooded" => GameEvent::TileFlooded { tile, position },
                "tile_sank" => GameEvent::TileSank { tile, position },
                _ => GameEvent::TileShoredUp { tile, position },
            }
        }
        "card_drawn" => GameEvent::CardDrawn {
            player: PlayerName::new(msg.require("player")?),
            card: parse_value(msg, "card")?,
        },
        "card_discarded" => GameEvent::CardDiscarded {
            player: PlayerName::new(msg.require("player")?),
            card: parse_value(msg, "card")?,
        },
        "water_rose" => GameEvent::WaterRose {
            level: parse_value(msg, "level")?,
        },
        "card_given" => GameEvent::CardGiven {
            from: PlayerName::new(msg.require("giver")?),
            to: PlayerName::new(msg.require("recipient")?),
            card: parse_value(msg, "card")?,
        },
        "treasure_captured" => GameEvent::TreasureCaptured {
            player: PlayerName::new(msg.require("player")?),
            treasure: parse_value(msg, "treasure")?,
        },
        "navigator_directing" => GameEvent::NavigatorDirecting {
            navigator: PlayerName::new(msg.require("navigator")?),
            target: PlayerName::new(msg.require("target")?),
            moves: parse_value(msg, "moves")?,
        },
        "helicopter_lifted" => {
            let to = match msg.require("to")? {
                LIFT_OFF => None,
                _ => Some(parse_value(msg, "to")?),
            };
            GameEvent::HelicopterLifted {
                holder: PlayerName::new(msg.require("holder")?),
                passengers: parse_names(msg.require("passengers")?),
                to,
            }
        }
        "sandbags_used" => GameEvent::SandbagsUsed {
            player: PlayerName::new(msg.require("player")?),
            position: parse_value(msg, "position")?,
        },
        "phase_changed" => GameEvent::PhaseChanged {
            phase: parse_value(msg, "phase")?,
        },
        "turn_ended" => GameEvent::TurnEnded {
            player: PlayerName::new(msg.require("player")?),
        },
        "game_over" => GameEvent::GameOver {
            outcome: parse_value(msg, "outcome")?,
        },
        other => return Err(bad(EVENT_KEY, other)),
    };
    Ok(event)
}

// === Intents ===

/// Builds the envelope a client sends for `intent`.
pub fn encode_intent(intent: &Intent, id: MessageId, room_id: &str, from: &str) -> Message {
    let msg = |message_type| Message::new(id, message_type, room_id, from);
    match intent {
        Intent::StartGame => msg(MessageType::GameStart),
        Intent::Move { to } => msg(MessageType::PlayerMove).with("to", to),
        Intent::ShoreUp { targets } => {
            msg(MessageType::ShoreUp).with("targets", join_positions(targets))
        }
        Intent::GiveCard { to, card } => msg(MessageType::GiveCard)
            .with("recipient", to)
            .with("card", card),
        Intent::CaptureTreasure => msg(MessageType::CaptureTreasure),
        Intent::DrawTreasureCard => msg(MessageType::DrawTreasureCard),
        Intent::DrawFloodCard => msg(MessageType::DrawFloodCard),
        Intent::EndTurn => msg(MessageType::EndTurn),
        Intent::DiscardCard { card } => msg(MessageType::DiscardCard).with("card", card),
        Intent::NavigatorDirect { target } => {
            msg(MessageType::NavigatorDirectedMove).with("target", target)
        }
        Intent::NavigatorDirectedMove { to } => {
            msg(MessageType::NavigatorDirectedMove).with("to", to)
        }
        Intent::HelicopterMove { passengers, to } => {
            let to = to.map_or_else(|| LIFT_OFF.to_string(), |to| to.to_string());
            msg(MessageType::HelicopterMove)
                .with("passengers", join_names(passengers))
                .with("to", to)
        }
        Intent::SandbagsUse { target } => msg(MessageType::SandbagsUse).with("target", target),
    }
}

/// Reads the intent carried by a client envelope.
pub fn decode_intent(msg: &Message) -> Result<Intent> {
    let intent = match msg.message_type() {
        MessageType::GameStart => Intent::StartGame,
        MessageType::PlayerMove => Intent::Move {
            to: parse_value(msg, "to")?,
        },
        MessageType::ShoreUp => Intent::ShoreUp {
            targets: parse_positions("targets", msg.require("targets")?)?,
        },
        MessageType::GiveCard => Intent::GiveCard {
            to: PlayerName::new(msg.require("recipient")?),
            card: parse_value::<CardKind>(msg, "card")?,
        },
        MessageType::CaptureTreasure => Intent::CaptureTreasure,
        MessageType::DrawTreasureCard => Intent::DrawTreasureCard,
        MessageType::DrawFloodCard => Intent::DrawFloodCard,
        MessageType::EndTurn => Intent::EndTurn,
        MessageType::DiscardCard => Intent::DiscardCard {
            card: parse_value(msg, "card")?,
        },
        MessageType::NavigatorDirectedMove => match msg.get("target") {
            Some(target) => Intent::NavigatorDirect {
                target: PlayerName::new(target),
            },
            None => Intent::NavigatorDirectedMove {
                to: parse_value(msg, "to")?,
            },
        },
        MessageType::HelicopterMove => {
            let to = match msg.get("to") {
                None | Some(LIFT_OFF) => None,
                Some(_) => Some(parse_value(msg, "to")?),
            };
            Intent::HelicopterMove {
                passengers: parse_names(msg.get("passengers").unwrap_or_default()),
                to,
            }
        }
        MessageType::SandbagsUse => Intent::SandbagsUse {
            target: parse_value(msg, "target")?,
        },
        other @ (MessageType::TurnStart
        | MessageType::PlayerJoin
        | MessageType::PlayerLeave
        | MessageType::UpdateRoom
        | MessageType::GameOver
        | MessageType::LeaveRoom
        | MessageType::MessageAck) => return Err(FormatError::NotAnIntent(other.as_str())),
    };
    Ok(intent)
}

// === Snapshots ===

/// Compact state snapshot used to resync a receiver.
pub fn encode_snapshot(snapshot: &GameSnapshot, id: MessageId, room_id: &str, from: &str) -> Message {
    let tiles: Vec<String> = snapshot
        .tiles
        .iter()
        .map(|tile| format!("{}:{}", tile.position, tile.state))
        .collect();
    let players: Vec<String> = snapshot
        .players
        .iter()
        .map(|p| format!("{}:{}:{}", p.name, p.role, p.position))
        .collect();
    let current = snapshot
        .current_player
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();

    Message::new(id, MessageType::UpdateRoom, room_id, from)
        .with(EVENT_KEY, "resync")
        .with("phase", &snapshot.phase)
        .with("turn", snapshot.turn)
        .with("current", current)
        .with("water_level", snapshot.water_level)
        .with("tiles", tiles.join(";"))
        .with("players", players.join(";"))
}

/// Tile states from a resync envelope.
pub fn decode_snapshot_tiles(msg: &Message) -> Result<Vec<(Position, TileState)>> {
    msg.require("tiles")?
        .split(';')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (pos, state) = part.split_once(':').ok_or_else(|| bad("tiles", part))?;
            let pos = pos.parse().map_err(|_| bad("tiles", part))?;
            let state = state.parse().map_err(|_| bad("tiles", part))?;
            Ok((pos, state))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Outcome, Phase, SpecialCard, TreasureType};

    fn roundtrip_event(event: GameEvent) {
        let msg = encode_event(&event, MessageId(1), "room", "room");
        let wire = Message::decode(&msg.encode()).unwrap();
        assert_eq!(decode_event(&wire).unwrap(), event);
    }

    fn roundtrip_intent(intent: Intent) {
        let msg = encode_intent(&intent, MessageId(1), "room", "ann");
        let wire = Message::decode(&msg.encode()).unwrap();
        assert_eq!(decode_intent(&wire).unwrap(), intent);
    }

    // === Event Tests ===

    #[test]
    fn test_event_types() {
        let moved = GameEvent::PlayerMoved {
            player: "ann".into(),
            from: Position::new(0, 0),
            to: Position::new(1, 0),
        };
        assert_eq!(event_type(&moved), MessageType::PlayerMove);
        let sank = GameEvent::TileSank {
            tile: "Watchtower".to_string(),
            position: Position::new(1, 1),
        };
        let msg = encode_event(&sank, MessageId(4), "r", "room");
        assert_eq!(
            msg.encode(),
            "4|DRAW_FLOOD_CARD|r|room||false|event=tile_sank|tile=Watchtower|position=1,1"
        );
    }

    #[test]
    fn test_events_decode() {
        roundtrip_event(GameEvent::GameStarted {
            players: vec![
                ("ann".into(), RoleKind::Pilot, Position::new(2, 0)),
                ("bo".into(), RoleKind::Diver, Position::new(3, 4)),
            ],
            water_level: 2,
        });
        roundtrip_event(GameEvent::CardGiven {
            from: "ann".into(),
            to: "bo".into(),
            card: CardKind::Treasure(TreasureType::Ocean),
        });
        roundtrip_event(GameEvent::CardDrawn {
            player: "ann".into(),
            card: CardKind::Special(SpecialCard::Sandbags),
        });
        roundtrip_event(GameEvent::HelicopterLifted {
            holder: "ann".into(),
            passengers: vec!["bo".into(), "cy".into()],
            to: Some(Position::new(4, 2)),
        });
        roundtrip_event(GameEvent::HelicopterLifted {
            holder: "ann".into(),
            passengers: vec!["ann".into()],
            to: None,
        });
        roundtrip_event(GameEvent::PhaseChanged {
            phase: Phase::DrawFlood,
        });
        roundtrip_event(GameEvent::GameOver {
            outcome: Outcome::Won,
        });
    }

    // === Intent Tests ===

    #[test]
    fn test_intents_decode() {
        roundtrip_intent(Intent::Move {
            to: Position::new(-1, 4),
        });
        roundtrip_intent(Intent::ShoreUp {
            targets: vec![Position::new(1, 1), Position::new(1, 2)],
        });
        roundtrip_intent(Intent::GiveCard {
            to: "bo".into(),
            card: CardKind::Treasure(TreasureType::Wind),
        });
        roundtrip_intent(Intent::NavigatorDirect { target: "bo".into() });
        roundtrip_intent(Intent::NavigatorDirectedMove {
            to: Position::new(2, 2),
        });
        roundtrip_intent(Intent::HelicopterMove {
            passengers: vec!["ann".into()],
            to: None,
        });
        roundtrip_intent(Intent::SandbagsUse {
            target: Position::new(0, 3),
        });
        roundtrip_intent(Intent::EndTurn);
    }

    #[test]
    fn test_decode_intent_errors() {
        let msg = Message::decode("1|PLAYER_MOVE|r|ann||false|to=up").unwrap();
        assert!(matches!(
            decode_intent(&msg),
            Err(FormatError::BadFieldValue { key: "to", .. })
        ));

        let msg = Message::decode("1|PLAYER_MOVE|r|ann").unwrap();
        assert!(matches!(
            decode_intent(&msg),
            Err(FormatError::MissingField { key: "to", .. })
        ));

        let msg = Message::decode("1|TURN_START|r|ann").unwrap();
        assert_eq!(
            decode_intent(&msg),
            Err(FormatError::NotAnIntent("TURN_START"))
        );
    }
}
