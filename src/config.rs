//! Platform limits checked at link time.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The platform maxima a program must fit in. Keys missing from a limits file keep their
/// default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
  /// Vertex inputs, and separately vertex outputs.
  pub max_attributes                : usize,
  pub max_vertex_uniform_vectors    : usize,
  pub max_fragment_uniform_vectors  : usize,
  pub max_texture_units             : usize,
}

impl Default for Limits {
  fn default() -> Self {
    Self {
      max_attributes               : 8,
      max_vertex_uniform_vectors   : 128,
      max_fragment_uniform_vectors : 16,
      max_texture_units            : 2,
    }
  }
}

impl Limits {
  pub fn from_toml_str(text: &str) -> Result<Limits, ConfigError> {
    Ok(toml::from_str(text)?)
  }

  pub fn load<P: AsRef<Path>>(path: P) -> Result<Limits, ConfigError> {
    let text = fs::read_to_string(path)?;
    Limits::from_toml_str(&text)
  }

  pub fn to_toml_string(&self) -> Result<String, ConfigError> {
    Ok(toml::to_string(self)?)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_keys_keep_defaults(){
    let limits = Limits::from_toml_str("max_texture_units = 8\n").unwrap();
    assert_eq!(limits.max_texture_units, 8);
    assert_eq!(limits.max_attributes, Limits::default().max_attributes);
  }

  #[test]
  fn round_trip_through_toml(){
    let limits = Limits{ max_attributes: 16, ..Limits::default() };
    let text = limits.to_toml_string().unwrap();
    assert_eq!(Limits::from_toml_str(&text).unwrap(), limits);
  }

  #[test]
  fn malformed_file(){
    assert!(matches!(Limits::from_toml_str("max_attributes = \"many\""), Err(ConfigError::Parse(_))));
    assert!(matches!(Limits::load("/nonexistent/limits.toml"), Err(ConfigError::Io(_))));
  }
}
