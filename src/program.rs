/*!
  Shader and program objects. A `Program` owns the assembly of one vertex and one fragment shader
  and, once linked, the remapped instruction sequences and the tables the host queries to bind
  attributes, uniforms, and samplers.

  Linking is all or nothing. A failed link leaves the program with no instructions, no layout,
  `is_linked() == false`, and the failure recorded as the link log.
*/

use std::collections::BTreeMap;

use crate::bytecode::{Instruction, ShaderKind};
use crate::config::Limits;
use crate::error::LinkError;
use crate::linker::{self, LinkedProgram};
use crate::symboltable::{Resource, SymbolTable};
use crate::vector::Vector4;

/// One stage's source text. `compiled` is set by whatever produced the assembly; linking refuses
/// shaders that are not compiled.
#[derive(Clone, PartialEq, Debug)]
pub struct Shader {
  pub kind     : ShaderKind,
  pub assembly : String,
  pub compiled : bool
}

impl Shader {
  pub fn new(kind: ShaderKind) -> Shader {
    Shader{ kind, assembly: String::new(), compiled: false }
  }

  pub fn from_assembly(kind: ShaderKind, assembly: &str) -> Shader {
    Shader{ kind, assembly: assembly.to_string(), compiled: true }
  }
}

/// What the linker learned about one stage.
#[derive(Debug, Default)]
pub struct StageLayout {
  pub inputs        : SymbolTable,
  pub outputs       : SymbolTable,
  /// Stage uniforms, keyed by their assembly-local `c[k]` register. `index` is the program-wide
  /// location.
  pub uniforms      : SymbolTable,
  /// Stage samplers, keyed by their assembly-local `texture[k]` unit.
  pub samplers      : SymbolTable,
  /// Assembly-local resource to final slot, location, or unit.
  pub remap         : BTreeMap<Resource, u8>,
  /// `#const` values, folded into the instructions that read them.
  pub constants     : BTreeMap<u8, Vector4>,
  pub input_count   : usize,
  pub output_count  : usize,
  pub uniform_count : usize,
  pub texture_count : usize
}

/// The derived state of a program, shared by both stages.
#[derive(Debug, Default)]
pub struct ProgramLayout {
  pub vertex   : StageLayout,
  pub fragment : StageLayout,
  /// Program-wide uniform name to location. A name used by both stages has one location.
  pub uniforms : SymbolTable,
  /// Program-wide sampler name to texture unit.
  pub samplers : SymbolTable,
  /// Uniform vectors handed out so far.
  pub uniform_count : usize
}

impl ProgramLayout {
  pub fn stage(&self, kind: ShaderKind) -> &StageLayout {
    match kind {
      ShaderKind::Vertex   => &self.vertex,
      ShaderKind::Fragment => &self.fragment
    }
  }

  pub fn stage_mut(&mut self, kind: ShaderKind) -> &mut StageLayout {
    match kind {
      ShaderKind::Vertex   => &mut self.vertex,
      ShaderKind::Fragment => &mut self.fragment
    }
  }

  pub fn texture_count(&self) -> usize {
    self.samplers.len()
  }
}

#[derive(Debug, Default)]
pub struct Program {
  vertex_shader         : Option<Shader>,
  fragment_shader       : Option<Shader>,
  layout                : ProgramLayout,
  linked                : bool,
  link_info             : String,
  vertex_instructions   : Vec<Instruction>,
  fragment_instructions : Vec<Instruction>
}

impl Program {
  pub fn new() -> Program {
    Program::default()
  }

  /// Attaches `shader` in its stage's place, returning the shader it replaces. The program is
  /// not relinked.
  pub fn attach(&mut self, shader: Shader) -> Option<Shader> {
    match shader.kind {
      ShaderKind::Vertex   => self.vertex_shader.replace(shader),
      ShaderKind::Fragment => self.fragment_shader.replace(shader),
    }
  }

  pub fn detach(&mut self, kind: ShaderKind) -> Option<Shader> {
    match kind {
      ShaderKind::Vertex   => self.vertex_shader.take(),
      ShaderKind::Fragment => self.fragment_shader.take(),
    }
  }

  pub fn shader(&self, kind: ShaderKind) -> Option<&Shader> {
    match kind {
      ShaderKind::Vertex   => self.vertex_shader.as_ref(),
      ShaderKind::Fragment => self.fragment_shader.as_ref(),
    }
  }

  pub fn link(&mut self, limits: &Limits) -> Result<(), LinkError> {
    linker::link(self, limits)
  }

  pub fn is_linked(&self) -> bool {
    self.linked
  }

  /// The diagnostic of the last link, empty after a successful one.
  pub fn link_info(&self) -> &str {
    &self.link_info
  }

  pub fn layout(&self) -> &ProgramLayout {
    &self.layout
  }

  /// The linked instruction sequence of a stage. Empty unless the program is linked.
  pub fn instructions(&self, kind: ShaderKind) -> &[Instruction] {
    match kind {
      ShaderKind::Vertex   => &self.vertex_instructions,
      ShaderKind::Fragment => &self.fragment_instructions,
    }
  }

  /// The vertex attribute slot the host fills for the input named `name`.
  pub fn attribute_location(&self, name: &str) -> Option<u8> {
    self.layout.vertex.inputs.get(name).map(|symbol| symbol.index)
  }

  /// The first uniform table location of the uniform named `name`.
  pub fn uniform_location(&self, name: &str) -> Option<u8> {
    self.layout.uniforms.get(name).map(|symbol| symbol.index)
  }

  pub fn texture_unit(&self, name: &str) -> Option<u8> {
    self.layout.samplers.get(name).map(|symbol| symbol.index)
  }

  /// The size of the uniform table the host must supply when shading.
  pub fn uniform_count(&self) -> usize {
    self.layout.uniform_count
  }

  pub(crate) fn reset_link_state(&mut self) {
    self.layout = ProgramLayout::default();
    self.linked = false;
    self.link_info.clear();
    self.vertex_instructions.clear();
    self.fragment_instructions.clear();
  }

  pub(crate) fn commit(&mut self, linked: LinkedProgram) {
    self.layout                = linked.layout;
    self.vertex_instructions   = linked.vertex;
    self.fragment_instructions = linked.fragment;
    self.linked                = true;
  }

  pub(crate) fn record_failure(&mut self, error: &LinkError) {
    self.link_info = error.to_string();
  }
}
