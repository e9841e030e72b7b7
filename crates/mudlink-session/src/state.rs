//! Character, room, and channel state built from GMCP messages.
//!
//! Every `Char.*` block the server sends may be partial: a `Char.Vitals`
//! message after a hit usually carries `hp` alone. Each block therefore has
//! a matching `*Update` type whose fields are all optional, and applying an
//! update only overwrites the fields it actually carries.
//!
//! `Room.Info` is the exception: it always describes the whole room, so it
//! replaces the previous room outright.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use mudlink_protocol::{Channel, GmcpMessage};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// Overwrites each listed field of `$target` with the update's value, if
/// the update has one.
macro_rules! merge {
    ($target:expr, $update:expr; $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $update.$field.clone() {
                $target.$field = value;
            }
        )+
    };
}

// ---------------------------------------------------------------------------
// Character blocks
// ---------------------------------------------------------------------------

/// Health (`hp`) and command points (`sp`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub hp: i64,
    pub maxhp: i64,
    pub sp: i64,
    pub maxsp: i64,
}

impl Vitals {
    /// Health as a percentage of maximum, or 0 when the maximum is unknown.
    pub fn hp_percent(&self) -> f64 {
        percent(self.hp, self.maxhp)
    }

    /// Command points as a percentage of maximum.
    pub fn sp_percent(&self) -> f64 {
        percent(self.sp, self.maxsp)
    }

    pub fn apply(&mut self, update: &VitalsUpdate) {
        merge!(self, update; hp, maxhp, sp, maxsp);
    }
}

fn percent(value: i64, max: i64) -> f64 {
    if max > 0 {
        value as f64 / max as f64 * 100.0
    } else {
        0.0
    }
}

/// A partial `Char.Vitals` payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VitalsUpdate {
    pub hp: Option<i64>,
    pub maxhp: Option<i64>,
    pub sp: Option<i64>,
    pub maxsp: Option<i64>,
}

/// The six base attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub str: i64,
    pub con: i64,
    pub int: i64,
    pub wis: i64,
    pub dex: i64,
    pub qui: i64,
}

impl Stats {
    pub fn apply(&mut self, update: &StatsUpdate) {
        merge!(self, update; str, con, int, wis, dex, qui);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatsUpdate {
    pub str: Option<i64>,
    pub con: Option<i64>,
    pub int: Option<i64>,
    pub wis: Option<i64>,
    pub dex: Option<i64>,
    pub qui: Option<i64>,
}

/// The six attributes after equipment and spell modifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaxStats {
    pub maxstr: i64,
    pub maxcon: i64,
    pub maxint: i64,
    pub maxwis: i64,
    pub maxdex: i64,
    pub maxqui: i64,
}

impl MaxStats {
    pub fn apply(&mut self, update: &MaxStatsUpdate) {
        merge!(self, update; maxstr, maxcon, maxint, maxwis, maxdex, maxqui);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MaxStatsUpdate {
    pub maxstr: Option<i64>,
    pub maxcon: Option<i64>,
    pub maxint: Option<i64>,
    pub maxwis: Option<i64>,
    pub maxdex: Option<i64>,
    pub maxqui: Option<i64>,
}

/// Everything `Char.Status` reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub level: i64,
    pub money: i64,
    pub bankmoney: i64,
    pub guild: String,
    pub subguild: String,
    pub xp: i64,
    pub maxxp: i64,
    /// Flee threshold, in hit points.
    pub wimpy: i64,
    /// Direction to flee in; `"none"` until the server says otherwise.
    pub wimpy_dir: String,
    pub aim: String,
    pub quest_points: i64,
    pub kills: i64,
    pub deaths: i64,
    pub explorer_rating: i64,
    pub pk: bool,
    pub inn: bool,
    pub total_exp_bonus: f64,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            level: 0,
            money: 0,
            bankmoney: 0,
            guild: "none".to_string(),
            subguild: "none".to_string(),
            xp: 0,
            maxxp: 0,
            wimpy: 0,
            wimpy_dir: "none".to_string(),
            aim: String::new(),
            quest_points: 0,
            kills: 0,
            deaths: 0,
            explorer_rating: 0,
            pk: false,
            inn: false,
            total_exp_bonus: 0.0,
        }
    }
}

impl Status {
    pub fn apply(&mut self, update: &StatusUpdate) {
        merge!(
            self, update;
            level, money, bankmoney, guild, subguild, xp, maxxp, wimpy,
            wimpy_dir, aim, quest_points, kills, deaths, explorer_rating,
            pk, inn, total_exp_bonus,
        );
    }
}

/// A partial `Char.Status` payload.
///
/// `pk` and `inn` arrive as either booleans or 0/1 depending on the
/// server, and both forms are accepted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatusUpdate {
    pub level: Option<i64>,
    pub money: Option<i64>,
    pub bankmoney: Option<i64>,
    pub guild: Option<String>,
    pub subguild: Option<String>,
    pub xp: Option<i64>,
    pub maxxp: Option<i64>,
    pub wimpy: Option<i64>,
    pub wimpy_dir: Option<String>,
    pub aim: Option<String>,
    pub quest_points: Option<i64>,
    pub kills: Option<i64>,
    pub deaths: Option<i64>,
    pub explorer_rating: Option<i64>,
    #[serde(deserialize_with = "flag")]
    pub pk: Option<bool>,
    #[serde(deserialize_with = "flag")]
    pub inn: Option<bool>,
    pub total_exp_bonus: Option<f64>,
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
        Some(Value::String(s)) => Some(!s.is_empty() && s != "0"),
        Some(_) => Some(true),
    })
}

/// Who the character is, from `Char.Name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterName {
    pub name: String,
    pub fullname: String,
    pub guild: String,
}

impl Default for CharacterName {
    fn default() -> Self {
        Self {
            name: String::new(),
            fullname: String::new(),
            guild: "none".to_string(),
        }
    }
}

impl CharacterName {
    pub fn apply(&mut self, update: &CharacterNameUpdate) {
        merge!(self, update; name, fullname, guild);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CharacterNameUpdate {
    pub name: Option<String>,
    pub fullname: Option<String>,
    pub guild: Option<String>,
}

/// All character blocks together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Character {
    #[serde(flatten)]
    pub name: CharacterName,
    pub vitals: Vitals,
    pub stats: Stats,
    pub maxstats: MaxStats,
    pub status: Status,
}

// ---------------------------------------------------------------------------
// Room and channels
// ---------------------------------------------------------------------------

/// The room the character stands in, from `Room.Info`.
///
/// Room numbers and exit targets are kept as strings; servers send them as
/// either JSON strings or numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomInfo {
    #[serde(deserialize_with = "id_string")]
    pub num: String,
    pub name: String,
    pub area: String,
    pub environment: String,
    /// Direction token → destination room number.
    #[serde(deserialize_with = "exit_map")]
    pub exits: BTreeMap<String, String>,
}

impl RoomInfo {
    pub fn exit_directions(&self) -> Vec<&str> {
        self.exits.keys().map(String::as_str).collect()
    }
}

fn value_to_id(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(value_to_id(Value::deserialize(deserializer)?))
}

fn exit_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error> {
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(dir, target)| (dir, value_to_id(target)))
        .collect())
}

/// One line of chat from `Comm.Channel.Text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub channel: String,
    pub talker: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChannelTextWire {
    channel: String,
    talker: String,
    text: String,
}

// ---------------------------------------------------------------------------
// StateChange
// ---------------------------------------------------------------------------

/// What a GMCP message changed, returned by [`GameState::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    Name,
    Vitals,
    Stats,
    MaxStats,
    Status,
    /// A `Room.Info` arrived. `previous` is the room number before it, if
    /// any; compare with the new number to tell a move from a refresh.
    Room { previous: Option<String> },
    ChannelList,
    /// A chat line was appended to the history.
    ChannelText,
    /// Raw data stored under a `Guild.<sub>` key.
    Guild(String),
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// Everything the client knows about the game from GMCP.
#[derive(Debug, Clone)]
pub struct GameState {
    pub character: Character,
    /// `None` until the first `Room.Info`.
    pub room: Option<RoomInfo>,
    pub channels: Vec<Value>,
    messages: VecDeque<ChannelMessage>,
    history_limit: usize,
    pub guild: BTreeMap<String, Value>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(100)
    }
}

impl GameState {
    /// Creates an empty state keeping at most `history_limit` chat lines.
    pub fn new(history_limit: usize) -> Self {
        Self {
            character: Character::default(),
            room: None,
            channels: Vec::new(),
            messages: VecDeque::new(),
            history_limit,
            guild: BTreeMap::new(),
        }
    }

    /// Recent chat lines, oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &ChannelMessage> {
        self.messages.iter()
    }

    /// Room number of the current room, if known.
    pub fn room_id(&self) -> Option<&str> {
        self.room.as_ref().map(|r| r.num.as_str()).filter(|n| !n.is_empty())
    }

    /// Folds one GMCP message into the state.
    ///
    /// Returns `None` for channels that carry no state, for messages without
    /// a payload, and for payloads that are not objects (logged at `warn`).
    /// Single fields of the wrong type are skipped, not the whole message.
    pub fn apply(&mut self, msg: &GmcpMessage) -> Option<StateChange> {
        let payload = msg.payload.as_ref()?;
        match msg.kind() {
            Channel::CharName => {
                let update: CharacterNameUpdate = decode(msg, payload)?;
                self.character.name.apply(&update);
                tracing::info!(
                    name = %self.character.name.name,
                    guild = %self.character.name.guild,
                    "character identified"
                );
                Some(StateChange::Name)
            }
            Channel::CharVitals => {
                let update: VitalsUpdate = decode(msg, payload)?;
                self.character.vitals.apply(&update);
                Some(StateChange::Vitals)
            }
            Channel::CharStats => {
                let update: StatsUpdate = decode(msg, payload)?;
                self.character.stats.apply(&update);
                Some(StateChange::Stats)
            }
            Channel::CharMaxStats => {
                let update: MaxStatsUpdate = decode(msg, payload)?;
                self.character.maxstats.apply(&update);
                Some(StateChange::MaxStats)
            }
            Channel::CharStatus => {
                let update: StatusUpdate = decode(msg, payload)?;
                self.character.status.apply(&update);
                Some(StateChange::Status)
            }
            Channel::RoomInfo => {
                let room: RoomInfo = decode(msg, payload)?;
                let previous = self.room_id().map(str::to_string);
                tracing::info!(num = %room.num, name = %room.name, area = %room.area, "room info");
                self.room = Some(room);
                Some(StateChange::Room { previous })
            }
            Channel::CommChannelList => match payload {
                Value::Array(list) => {
                    self.channels = list.clone();
                    tracing::debug!(count = self.channels.len(), "channel list");
                    Some(StateChange::ChannelList)
                }
                _ => {
                    tracing::warn!(channel = %msg.channel, "expected an array");
                    None
                }
            },
            Channel::CommChannelText => {
                let wire: ChannelTextWire = decode(msg, payload)?;
                self.push_message(ChannelMessage {
                    channel: wire.channel,
                    talker: wire.talker,
                    text: wire.text,
                    received_at: Utc::now(),
                });
                Some(StateChange::ChannelText)
            }
            Channel::Guild(sub) => {
                tracing::debug!(%sub, "guild data");
                self.guild.insert(sub.clone(), payload.clone());
                Some(StateChange::Guild(sub))
            }
            Channel::CoreHello | Channel::CoreSupportsSet | Channel::CoreGoodbye => None,
            Channel::Other(name) => {
                tracing::debug!(channel = %name, "unhandled GMCP channel");
                None
            }
        }
    }

    fn push_message(&mut self, message: ChannelMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.history_limit {
            self.messages.pop_front();
        }
    }

    /// A compact, serializable view of the state.
    ///
    /// Effective stats fall back to base stats where the server has not
    /// sent a non-zero effective value.
    pub fn summary(&self) -> StateSummary {
        let c = &self.character;
        let pick = |max: i64, base: i64| if max != 0 { max } else { base };
        let room = self.room.clone().unwrap_or_default();
        StateSummary {
            character: CharacterSummary {
                name: c.name.name.clone(),
                guild: c.name.guild.clone(),
                level: c.status.level,
                hp: format!("{}/{}", c.vitals.hp, c.vitals.maxhp),
                cp: format!("{}/{}", c.vitals.sp, c.vitals.maxsp),
                hp_percent: round1(c.vitals.hp_percent()),
                cp_percent: round1(c.vitals.sp_percent()),
                money: c.status.money,
                bank: c.status.bankmoney,
                wimpy: c.status.wimpy,
            },
            room: RoomSummary {
                name: room.name.clone(),
                area: room.area.clone(),
                environment: room.environment.clone(),
                exits: room.exits.keys().cloned().collect(),
            },
            stats: Stats {
                str: pick(c.maxstats.maxstr, c.stats.str),
                con: pick(c.maxstats.maxcon, c.stats.con),
                int: pick(c.maxstats.maxint, c.stats.int),
                wis: pick(c.maxstats.maxwis, c.stats.wis),
                dex: pick(c.maxstats.maxdex, c.stats.dex),
                qui: pick(c.maxstats.maxqui, c.stats.qui),
            },
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Decodes a GMCP object one field at a time.
///
/// A field of the wrong type is logged and skipped; the other fields still
/// apply. Numbers sent as strings (`"maxhp": "100"`) are accepted.
fn decode<T: DeserializeOwned>(msg: &GmcpMessage, payload: &Value) -> Option<T> {
    let Some(fields) = payload.as_object() else {
        tracing::warn!(channel = %msg.channel, "GMCP payload is not an object");
        return None;
    };

    let mut accepted = Map::new();
    for (key, value) in fields {
        let fitting = std::iter::once(value.clone())
            .chain(numeric(value))
            .find(|candidate| fits::<T>(key, candidate));
        match fitting {
            Some(v) => {
                accepted.insert(key.clone(), v);
            }
            None => tracing::warn!(
                channel = %msg.channel,
                field = %key,
                %value,
                "GMCP field has unexpected type, skipped"
            ),
        }
    }

    match T::deserialize(&Value::Object(accepted)) {
        Ok(update) => Some(update),
        Err(e) => {
            tracing::warn!(channel = %msg.channel, error = %e, "GMCP payload has unexpected shape");
            None
        }
    }
}

fn fits<T: DeserializeOwned>(key: &str, value: &Value) -> bool {
    let single: Map<String, Value> = std::iter::once((key.to_string(), value.clone())).collect();
    T::deserialize(&Value::Object(single)).is_ok()
}

// "100" -> 100, "1.5" -> 1.5; anything else has no numeric reading.
fn numeric(value: &Value) -> Option<Value> {
    let Value::String(s) = value else {
        return None;
    };
    let s = s.trim();
    s.parse::<i64>()
        .map(Value::from)
        .ok()
        .or_else(|| s.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number))
}

/// Snapshot returned by [`GameState::summary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSummary {
    pub character: CharacterSummary,
    pub room: RoomSummary,
    pub stats: Stats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterSummary {
    pub name: String,
    pub guild: String,
    pub level: i64,
    pub hp: String,
    pub cp: String,
    pub hp_percent: f64,
    pub cp_percent: f64,
    pub money: i64,
    pub bank: i64,
    pub wimpy: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomSummary {
    pub name: String,
    pub area: String,
    pub environment: String,
    pub exits: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gmcp(channel: &str, payload: Value) -> GmcpMessage {
        GmcpMessage::new(channel, Some(payload))
    }

    #[test]
    fn test_vitals_delta_keeps_other_fields() {
        let mut state = GameState::default();
        state.apply(&gmcp(
            "Char.Vitals",
            json!({"hp": 100, "maxhp": 100, "sp": 75, "maxsp": 100}),
        ));
        let change = state.apply(&gmcp("Char.Vitals", json!({"hp": 80})));

        assert_eq!(change, Some(StateChange::Vitals));
        assert_eq!(
            state.character.vitals,
            Vitals {
                hp: 80,
                maxhp: 100,
                sp: 75,
                maxsp: 100
            }
        );
    }

    #[test]
    fn test_empty_vitals_update_changes_nothing() {
        let mut state = GameState::default();
        state.apply(&gmcp("Char.Vitals", json!({"hp": 5, "maxhp": 10})));
        state.apply(&gmcp("Char.Vitals", json!({})));
        assert_eq!(state.character.vitals.hp, 5);
        assert_eq!(state.character.vitals.maxhp, 10);
    }

    #[test]
    fn test_vitals_percentages() {
        let vitals = Vitals {
            hp: 50,
            maxhp: 200,
            sp: 1,
            maxsp: 0,
        };
        assert_eq!(vitals.hp_percent(), 25.0);
        assert_eq!(vitals.sp_percent(), 0.0);
    }

    #[test]
    fn test_status_delta_keeps_other_fields() {
        let mut state = GameState::default();
        state.apply(&gmcp(
            "Char.Status",
            json!({"level": 12, "money": 300, "wimpy": 20, "wimpy_dir": "north", "pk": 1}),
        ));
        state.apply(&gmcp("Char.Status", json!({"money": 250})));

        let status = &state.character.status;
        assert_eq!(status.level, 12);
        assert_eq!(status.money, 250);
        assert_eq!(status.wimpy, 20);
        assert_eq!(status.wimpy_dir, "north");
        assert!(status.pk);
    }

    #[test]
    fn test_wimpy_threshold_and_direction_update_independently() {
        let mut state = GameState::default();
        assert_eq!(state.character.status.wimpy_dir, "none");

        state.apply(&gmcp("Char.Status", json!({"wimpy": 30})));
        assert_eq!(state.character.status.wimpy, 30);
        assert_eq!(state.character.status.wimpy_dir, "none");

        state.apply(&gmcp("Char.Status", json!({"wimpy_dir": "south"})));
        assert_eq!(state.character.status.wimpy, 30);
        assert_eq!(state.character.status.wimpy_dir, "south");
    }

    #[test]
    fn test_status_flags_accept_bool_or_number() {
        let mut state = GameState::default();
        state.apply(&gmcp("Char.Status", json!({"pk": true, "inn": 0})));
        assert!(state.character.status.pk);
        assert!(!state.character.status.inn);
        state.apply(&gmcp("Char.Status", json!({"inn": 1, "total_exp_bonus": 1.5})));
        assert!(state.character.status.inn);
        assert_eq!(state.character.status.total_exp_bonus, 1.5);
    }

    #[test]
    fn test_stats_and_maxstats_deltas() {
        let mut state = GameState::default();
        state.apply(&gmcp(
            "Char.Stats",
            json!({"str": 10, "con": 11, "int": 12, "wis": 13, "dex": 14, "qui": 15}),
        ));
        state.apply(&gmcp("Char.Stats", json!({"dex": 20})));
        state.apply(&gmcp("Char.MaxStats", json!({"maxstr": 18})));

        assert_eq!(state.character.stats.str, 10);
        assert_eq!(state.character.stats.dex, 20);
        assert_eq!(state.character.stats.qui, 15);
        assert_eq!(state.character.maxstats.maxstr, 18);

        let summary = state.summary();
        assert_eq!(summary.stats.str, 18);
        assert_eq!(summary.stats.dex, 20);
    }

    #[test]
    fn test_char_name_partial() {
        let mut state = GameState::default();
        state.apply(&gmcp(
            "Char.Name",
            json!({"name": "paul", "fullname": "Paul Atreides", "guild": "atreides"}),
        ));
        state.apply(&gmcp("Char.Name", json!({"guild": "fremen"})));
        assert_eq!(state.character.name.name, "paul");
        assert_eq!(state.character.name.fullname, "Paul Atreides");
        assert_eq!(state.character.name.guild, "fremen");
    }

    #[test]
    fn test_bad_field_skipped_rest_applies() {
        let mut state = GameState::default();
        state.apply(&gmcp("Char.Vitals", json!({"hp": 10, "maxhp": 50})));

        let change = state.apply(&gmcp("Char.Vitals", json!({"hp": 80, "maxhp": "lots"})));
        assert_eq!(change, Some(StateChange::Vitals));
        assert_eq!(state.character.vitals.hp, 80);
        assert_eq!(state.character.vitals.maxhp, 50);

        state.apply(&gmcp("Char.Status", json!({"level": 3, "guild": ["x"]})));
        assert_eq!(state.character.status.level, 3);
        assert_eq!(state.character.status.guild, "none");
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let mut state = GameState::default();
        state.apply(&gmcp("Char.Vitals", json!({"hp": 80, "maxhp": "100"})));
        assert_eq!(state.character.vitals.hp, 80);
        assert_eq!(state.character.vitals.maxhp, 100);

        state.apply(&gmcp("Char.Status", json!({"total_exp_bonus": " 2.5 "})));
        assert_eq!(state.character.status.total_exp_bonus, 2.5);
    }

    #[test]
    fn test_non_object_payload_is_ignored() {
        let mut state = GameState::default();
        state.apply(&gmcp("Char.Vitals", json!({"hp": 10})));
        assert_eq!(state.apply(&gmcp("Char.Vitals", json!([1, 2]))), None);
        assert_eq!(state.character.vitals.hp, 10);
    }

    #[test]
    fn test_bare_channel_is_ignored() {
        let mut state = GameState::default();
        assert_eq!(state.apply(&GmcpMessage::new("Char.Vitals", None)), None);
    }

    #[test]
    fn test_room_info_replaces_and_reports_previous() {
        let mut state = GameState::default();
        let change = state.apply(&gmcp(
            "Room.Info",
            json!({"num": 1001, "name": "Market", "area": "Arrakeen",
                   "exits": {"n": 1002, "e": "1003"}}),
        ));
        assert_eq!(change, Some(StateChange::Room { previous: None }));
        assert_eq!(state.room_id(), Some("1001"));
        let room = state.room.as_ref().expect("room set");
        assert_eq!(room.exits.get("n").map(String::as_str), Some("1002"));
        assert_eq!(room.exits.get("e").map(String::as_str), Some("1003"));

        let change = state.apply(&gmcp("Room.Info", json!({"num": "1002", "name": "Gate"})));
        assert_eq!(
            change,
            Some(StateChange::Room {
                previous: Some("1001".into())
            })
        );
        let room = state.room.as_ref().expect("room set");
        assert_eq!(room.area, "");
        assert!(room.exits.is_empty());
    }

    #[test]
    fn test_channel_history_is_bounded() {
        let mut state = GameState::new(3);
        for i in 0..5 {
            state.apply(&gmcp(
                "Comm.Channel.Text",
                json!({"channel": "gossip", "talker": "stilgar", "text": format!("msg {i}")}),
            ));
        }
        let texts: Vec<&str> = state.messages().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["msg 2", "msg 3", "msg 4"]);
    }

    #[test]
    fn test_channel_list_and_guild_data() {
        let mut state = GameState::default();
        assert_eq!(
            state.apply(&gmcp("Comm.Channel.List", json!([{"name": "gossip"}]))),
            Some(StateChange::ChannelList)
        );
        assert_eq!(state.channels.len(), 1);

        let change = state.apply(&gmcp("Guild.Atreides.Status", json!({"rank": 3})));
        assert_eq!(change, Some(StateChange::Guild("Atreides.Status".into())));
        assert_eq!(state.guild["Atreides.Status"], json!({"rank": 3}));
    }

    #[test]
    fn test_summary_serializes() {
        let mut state = GameState::default();
        state.apply(&gmcp(
            "Char.Vitals",
            json!({"hp": 1, "maxhp": 3, "sp": 2, "maxsp": 4}),
        ));
        let summary = serde_json::to_value(state.summary()).expect("serializes");
        assert_eq!(summary["character"]["hp"], "1/3");
        assert_eq!(summary["character"]["hp_percent"], 33.3);
        assert_eq!(summary["character"]["cp_percent"], 50.0);
        assert_eq!(summary["room"]["exits"], json!([]));
    }
}
