//! Error types. Link errors are recorded on the program as its diagnostic message, so their
//! `Display` text starts with a stable code.

use thiserror::Error;

use crate::bytecode::ShaderKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
  #[error("L0001: A vertex shader and a fragment shader are not both present in the program object.")]
  MissingStage,

  #[error("L0002: One or more of the attached shader objects has not been successfully compiled.")]
  NotCompiled,

  #[error("L0003: Too many vertex input values")]
  TooManyInputs,

  #[error("L0004: Too many vertex output values")]
  TooManyOutputs,

  #[error("L0005: Too many uniform values")]
  TooManyUniforms,

  #[error("L0006: Fragment input `{0}` does not match any vertex output")]
  UnmatchedVarying(String),

  #[error("L0007: Syntax error in {stage} assembly, line {line}: {message}")]
  Syntax { stage: ShaderKind, line: usize, message: String },

  #[error("L0008: The {stage} shader holds a {found} program")]
  WrongStage { stage: ShaderKind, found: ShaderKind },

  #[error("L0009: {stage} assembly, line {line}: `{resource}` is not declared")]
  Unresolved { stage: ShaderKind, line: usize, resource: String },

  #[error("L0010: {stage} assembly, line {line}: register R{index} is beyond the register file")]
  TooManyTemporaries { stage: ShaderKind, line: usize, index: u8 },

  #[error("L0011: {stage} symbol `{name}` is declared twice")]
  DuplicateSymbol { stage: ShaderKind, name: String },
}

/// Errors loading platform limits
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Parse error: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("Serialize error: {0}")]
  Serialize(#[from] toml::ser::Error),
}

#[derive(Error, Debug)]
pub enum DispatchError {
  #[error("A shading worker panicked")]
  WorkerPanicked,
}
