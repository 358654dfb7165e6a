use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Setting groups that switch physics processes on in the generator.
pub const PROCESS_GROUPS: &[&str] = &[
    "HardQCD",
    "SoftQCD",
    "HiggsSM",
    "HiggsBSM",
    "WeakSingleBoson",
    "WeakDoubleBoson",
    "WeakBosonAndParton",
    "Top",
    "PromptPhoton",
    "Charmonium",
    "Bottomonium",
    "NewGaugeBoson",
    "SUSY",
    "LeptoQuark",
    "ExcitedFermion",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CardError {
    #[error("line {line}: expected `Key:Subkey = value`, got `{text}`")]
    MalformedLine { line: usize, text: String },
    #[error("`{key}` must be a non-zero particle code, got `{value}`")]
    InvalidBeam { key: String, value: String },
}

/// `Group:name` part of a setting, e.g. `Beams:idA` or `36:m0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingKey {
    pub group: String,
    pub name: String,
}

impl SettingKey {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// The generator compares setting names case-insensitively.
    pub fn matches(&self, other: &SettingKey) -> bool {
        self.group.eq_ignore_ascii_case(&other.group) && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl FromStr for SettingKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (group, name) = s.split_once(':').ok_or(())?;
        let (group, name) = (group.trim(), name.trim());
        if group.is_empty() || name.is_empty() || group.contains(char::is_whitespace) {
            return Err(());
        }
        Ok(Self::new(group, name))
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
    Bool,
    Integer,
    Float,
    String,
}

/// Literal value of a setting, kept exactly as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CardValue(String);

impl CardValue {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> ValueKind {
        if self.as_bool().is_some() {
            ValueKind::Bool
        } else if self.as_int().is_some() {
            ValueKind::Integer
        } else if self.0.parse::<f64>().is_ok() {
            ValueKind::Float
        } else {
            ValueKind::String
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.0.to_lowercase().as_str() {
            "on" | "true" | "yes" => Some(true),
            "off" | "false" | "no" => Some(false),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub key: SettingKey,
    pub value: CardValue,
    /// Text after the value, e.g. a trailing `! comment`.
    pub trailing: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardLine {
    Setting(Setting),
    Comment(String),
    Blank,
}

/// A generator settings card. Parsing is lossless: `to_string` gives back the
/// original text modulo spacing around `=`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterCard {
    pub lines: Vec<CardLine>,
}

impl ParameterCard {
    pub fn parse(text: &str) -> Result<Self, CardError> {
        let mut lines = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                lines.push(CardLine::Blank);
                continue;
            }
            if line.starts_with('!') || line.starts_with('#') {
                lines.push(CardLine::Comment(line.to_owned()));
                continue;
            }
            let malformed = || CardError::MalformedLine {
                line: index + 1,
                text: line.to_owned(),
            };
            let (key, rest) = line.split_once('=').ok_or_else(malformed)?;
            let key: SettingKey = key.parse().map_err(|_| malformed())?;
            let rest = rest.trim();
            let (value, trailing) = match rest.find(['!', '#']) {
                Some(at) => (rest[..at].trim(), rest[at..].to_owned()),
                None => (rest, String::new()),
            };
            lines.push(CardLine::Setting(Setting {
                key,
                value: CardValue::new(value),
                trailing,
            }));
        }
        Ok(Self { lines })
    }

    pub fn settings(&self) -> impl Iterator<Item = &Setting> {
        self.lines.iter().filter_map(|line| match line {
            CardLine::Setting(setting) => Some(setting),
            _ => None,
        })
    }

    /// Last value written for `key`, as the generator would see it.
    pub fn get(&self, key: &str) -> Option<&CardValue> {
        let key: SettingKey = key.parse().ok()?;
        self.settings()
            .filter(|setting| setting.key.matches(&key))
            .last()
            .map(|setting| &setting.value)
    }

    /// Overwrite every occurrence of `key`, or append it when absent.
    pub fn set(&mut self, key: SettingKey, value: impl Into<String>) {
        let value = CardValue::new(value);
        let mut found = false;
        for line in &mut self.lines {
            if let CardLine::Setting(setting) = line {
                if setting.key.matches(&key) {
                    setting.value = value.clone();
                    found = true;
                }
            }
        }
        if !found {
            self.lines.push(CardLine::Setting(Setting {
                key,
                value,
                trailing: String::new(),
            }));
        }
    }

    pub fn validate_beams(&self) -> Result<(), CardError> {
        for key in ["Beams:idA", "Beams:idB"] {
            let Some(value) = self.get(key) else {
                continue;
            };
            if !matches!(value.as_int(), Some(id) if id != 0) {
                return Err(CardError::InvalidBeam {
                    key: key.to_owned(),
                    value: value.as_str().to_owned(),
                });
            }
        }
        Ok(())
    }

    pub fn selects_processes(&self) -> bool {
        self.settings().any(|setting| is_process_group(&setting.key.group))
    }
}

/// Prefix shared by the graviton process groups (`ExtraDimensionsG*`).
const EXTRA_DIMENSIONS_G: &str = "ExtraDimensionsG";

fn is_process_group(group: &str) -> bool {
    PROCESS_GROUPS.iter().any(|g| g.eq_ignore_ascii_case(group))
        || group
            .get(..EXTRA_DIMENSIONS_G.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(EXTRA_DIMENSIONS_G))
}

impl fmt::Display for ParameterCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            match line {
                CardLine::Setting(Setting {
                    key,
                    value,
                    trailing,
                }) if trailing.is_empty() => writeln!(f, "{key} = {}", value.as_str())?,
                CardLine::Setting(Setting {
                    key,
                    value,
                    trailing,
                }) => writeln!(f, "{key} = {} {trailing}", value.as_str())?,
                CardLine::Comment(text) => writeln!(f, "{text}")?,
                CardLine::Blank => writeln!(f)?,
            }
        }
        Ok(())
    }
}

/// Cards read one after another, later settings winning. The common card
/// only makes sense at the bottom of such a stack.
#[derive(Debug, Clone, Default)]
pub struct CardStack {
    cards: Vec<(String, ParameterCard)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveSetting {
    pub key: SettingKey,
    pub value: CardValue,
    /// Name of the card that set the winning value.
    pub source: String,
}

impl CardStack {
    pub fn push(&mut self, name: impl Into<String>, card: ParameterCard) -> &mut Self {
        self.cards.push((name.into(), card));
        self
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Settings in order of first appearance, each with its last value.
    pub fn effective(&self) -> Vec<EffectiveSetting> {
        let mut out: Vec<EffectiveSetting> = Vec::new();
        for (name, card) in &self.cards {
            for setting in card.settings() {
                let effective = EffectiveSetting {
                    key: setting.key.clone(),
                    value: setting.value.clone(),
                    source: name.clone(),
                };
                match out.iter_mut().find(|e| e.key.matches(&setting.key)) {
                    Some(existing) => *existing = effective,
                    None => out.push(effective),
                }
            }
        }
        out
    }

    pub fn selects_processes(&self) -> bool {
        self.cards.iter().any(|(_, card)| card.selects_processes())
    }

    pub fn validate_beams(&self) -> Result<(), CardError> {
        self.cards.iter().try_for_each(|(_, card)| card.validate_beams())
    }
}
