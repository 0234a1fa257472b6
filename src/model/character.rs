use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

pub const MAX_AGE: i64 = 500;
pub const MAX_LEVEL: i64 = 20;
pub const MAX_BIO_LEN: usize = 500;

/// A stored character. `caster` is computed from reference data when the
/// character is added, everything else comes from the client.
#[derive(Clone, Serialize, Deserialize, Debug, FromRow)]
pub struct Character {
  pub name: String,
  pub age: i64,
  pub gender: String,
  pub bio: String,
  pub level: i64,
  pub race: String,
  pub class: String,
  pub caster: bool,
  pub con: i64,
  pub dex: i64,
  pub str: i64,
  pub cha: i64,
  pub intel: i64,
  pub wis: i64,
}

impl Character {
  pub fn ability_total(&self) -> i64 {
    self.con + self.dex + self.str + self.cha + self.intel + self.wis
  }

  fn abilities(&self) -> [(&'static str, i64); 6] {
    [
      ("con", self.con),
      ("dex", self.dex),
      ("str", self.str),
      ("cha", self.cha),
      ("intel", self.intel),
      ("wis", self.wis),
    ]
  }

  /// Range and requiredness checks that need no reference data. Returns
  /// every violated rule, not just the first.
  pub fn field_violations(&self) -> Vec<String> {
    let mut violations = Vec::new();
    if self.name.is_empty() {
      violations.push("name must not be empty".to_string());
    }
    if !(0..=MAX_AGE).contains(&self.age) {
      violations.push(format!("age must be between 0 and {MAX_AGE}"));
    }
    if self.bio.chars().count() > MAX_BIO_LEN {
      violations.push(format!("bio must not exceed {MAX_BIO_LEN} characters"));
    }
    if !(1..=MAX_LEVEL).contains(&self.level) {
      violations.push(format!("level must be between 1 and {MAX_LEVEL}"));
    }
    for (ability, score) in self.abilities() {
      if score < 0 {
        violations.push(format!("{ability} must not be negative"));
      }
    }
    violations
  }
}

/// Raw request body for an add. Every field is optional, absent fields
/// fall back to defaults and the validation pass reports what is missing.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct CharacterPayload {
  pub name: String,
  pub age: i64,
  pub gender: String,
  pub bio: String,
  pub level: i64,
  pub race: String,
  pub class: String,
  pub con: i64,
  pub dex: i64,
  pub str: i64,
  pub cha: i64,
  pub intel: i64,
  pub wis: i64,
}

impl CharacterPayload {
  /// Apply defaults and escape the free text fields, producing the
  /// candidate record that validation runs against.
  pub fn sanitized(self) -> Character {
    Character {
      name: self.name.trim().to_string(),
      age: self.age,
      gender: escape_html(self.gender.trim()),
      bio: escape_html(self.bio.trim()),
      level: self.level,
      race: self.race.trim().to_string(),
      class: self.class.trim().to_string(),
      caster: false,
      con: self.con,
      dex: self.dex,
      str: self.str,
      cha: self.cha,
      intel: self.intel,
      wis: self.wis,
    }
  }
}

/// The list view projection.
#[derive(Serialize, Debug)]
pub struct CharacterSummary {
  pub name: String,
  pub race: String,
  pub class: String,
  pub level: i64,
}

impl From<Character> for CharacterSummary {
  fn from(c: Character) -> Self {
    Self { name: c.name, race: c.race, class: c.class, level: c.level }
  }
}

/// Full single-character view, stored fields plus the attributes computed
/// from reference data.
#[derive(Serialize, Debug)]
pub struct CharacterView {
  #[serde(flatten)]
  pub character: Character,
  pub hitpoints: i64,
}

impl CharacterView {
  /// One element per field, suitable for the export endpoint.
  pub fn to_xml(&self) -> String {
    let c = &self.character;
    let fields: [(&str, String); 15] = [
      ("name", escape_xml(&c.name)),
      ("age", c.age.to_string()),
      ("gender", escape_xml(&c.gender)),
      ("bio", escape_xml(&c.bio)),
      ("level", c.level.to_string()),
      ("race", escape_xml(&c.race)),
      ("class", escape_xml(&c.class)),
      ("caster", c.caster.to_string()),
      ("hitpoints", self.hitpoints.to_string()),
      ("con", c.con.to_string()),
      ("dex", c.dex.to_string()),
      ("str", c.str.to_string()),
      ("cha", c.cha.to_string()),
      ("intel", c.intel.to_string()),
      ("wis", c.wis.to_string()),
    ];
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<character>\n");
    for (tag, value) in &fields {
      xml.push_str(&format!("  <{tag}>{value}</{tag}>\n"));
    }
    xml.push_str("</character>\n");
    xml
  }
}

/// Escape text destined for the browser so a stored bio cannot smuggle
/// markup back out.
pub fn escape_html(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  for c in input.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(c),
    }
  }
  out
}

fn escape_xml(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  for c in input.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      _ => out.push(c),
    }
  }
  out
}
