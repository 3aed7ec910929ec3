/*!
  The second linker pass. Turns the instructions of one stage into `Instruction`s whose operands
  name final slots: inputs and outputs become attribute slots, `c[k]` becomes a uniform location
  or a folded constant, and `texture[k]` becomes the program-wide texture unit.
*/

use std::str::FromStr;

use tracing::{debug, warn};

use super::syntax_error;
use crate::bytecode::{
  Destination,
  Instruction,
  Opcode,
  OpcodeFamily,
  Operand,
  ShaderKind,
  Source,
  TextureTarget
};
use crate::bytecode::assembly::{parse_assembly, ParsedInstruction, ParsedOperand, Reference, Statement};
use crate::error::LinkError;
use crate::invocation::POSITION_SLOT;
use crate::mask::Mask;
use crate::program::{ProgramLayout, StageLayout};
use crate::shader_core::REGISTER_FILE_SIZE;
use crate::symboltable::{Binding, Resource};

pub fn assemble(layout: &ProgramLayout, stage: ShaderKind, text: &str) -> Result<Vec<Instruction>, LinkError> {
  let lines = parse_assembly(text).map_err(|error| syntax_error(stage, error))?;
  let mut instructions = Vec::new();

  for line in &lines {
    if let Statement::Instruction(parsed) = &line.statement {
      let opcode = match Opcode::from_str(parsed.mnemonic) {
        Ok(opcode) => opcode,
        Err(_) => {
          warn!("{} assembly, line {}: unknown opcode `{}` dropped", stage, line.number, parsed.mnemonic);
          continue;
        }
      };
      if !opcode.is_implemented() {
        debug!("{} assembly, line {}: {} has no numeric semantics and yields zero", stage, line.number, opcode);
      }
      let resolver = Resolver{ stage, line: line.number, layout: layout.stage(stage) };
      instructions.push(resolver.instruction(opcode, parsed)?);
    }
  }

  Ok(instructions)
}

/// Resolves the operands of one instruction line.
struct Resolver<'a> {
  stage  : ShaderKind,
  line   : usize,
  layout : &'a StageLayout
}

impl<'a> Resolver<'a> {
  fn syntax(&self, message: String) -> LinkError {
    LinkError::Syntax{ stage: self.stage, line: self.line, message }
  }

  fn unresolved(&self, resource: Resource) -> LinkError {
    LinkError::Unresolved{ stage: self.stage, line: self.line, resource: resource.to_string() }
  }

  fn instruction(&self, opcode: Opcode, parsed: &ParsedInstruction) -> Result<Instruction, LinkError> {
    let operands = &parsed.operands;
    let expected = match opcode.family() {
      OpcodeFamily::Texture         => 4,
      OpcodeFamily::TextureGradient => 6,
      _                             => opcode.arity() + 1
    };
    if operands.len() != expected {
      return Err(self.syntax(format!("{} takes {} operands, found {}", opcode, expected, operands.len())));
    }

    let destination = self.destination(&operands[0])?;

    let instruction = match opcode.family() {
      OpcodeFamily::Vector => Instruction::Vector {
        opcode,
        destination,
        source: self.source(&operands[1])?
      },

      OpcodeFamily::Binary => Instruction::Binary {
        opcode,
        destination,
        sources: [self.source(&operands[1])?, self.source(&operands[2])?]
      },

      OpcodeFamily::Ternary => Instruction::Ternary {
        opcode,
        destination,
        sources: [
          self.source(&operands[1])?,
          self.source(&operands[2])?,
          self.source(&operands[3])?
        ]
      },

      OpcodeFamily::Texture => Instruction::Texture {
        opcode,
        destination,
        coordinate : self.source(&operands[1])?,
        unit       : self.texture_unit(&operands[2])?,
        target     : self.target(&operands[3])?
      },

      OpcodeFamily::TextureGradient => Instruction::TextureGradient {
        opcode,
        destination,
        coordinate : self.source(&operands[1])?,
        gradients  : [self.source(&operands[2])?, self.source(&operands[3])?],
        unit       : self.texture_unit(&operands[4])?,
        target     : self.target(&operands[5])?
      },
    };

    Ok(instruction)
  }

  fn register(&self, index: u8) -> Result<u8, LinkError> {
    match (index as usize) < REGISTER_FILE_SIZE {
      true  => Ok(index),
      false => Err(LinkError::TooManyTemporaries{ stage: self.stage, line: self.line, index })
    }
  }

  fn remapped(&self, resource: Resource) -> Result<u8, LinkError> {
    self.layout.remap.get(&resource).copied().ok_or_else(|| self.unresolved(resource))
  }

  fn destination(&self, operand: &ParsedOperand) -> Result<Destination, LinkError> {
    let (reference, mask) = match operand {
      ParsedOperand::Value{ negate: true, .. } => {
        return Err(self.syntax("a destination cannot be negated".to_string()));
      }
      ParsedOperand::Value{ reference, mask, .. } => (*reference, mask.unwrap_or(Mask::FULL)),
      other => return Err(self.syntax(format!("{:?} is not a destination", other)))
    };

    match reference {
      Reference::Register(index) => Ok(Destination::Register{ index: self.register(index)?, mask }),
      Reference::Output(Binding::Color(_)) if self.stage == ShaderKind::Fragment => {
        Ok(Destination::Color{ mask })
      }
      Reference::Output(binding) => {
        let index = self.remapped(Resource::Output(binding))?;
        Ok(Destination::Attribute{ index, mask })
      }
      other => Err(self.syntax(format!("{:?} is not writable", other)))
    }
  }

  fn source(&self, operand: &ParsedOperand) -> Result<Operand, LinkError> {
    let (reference, mask, negate) = match operand {
      ParsedOperand::Value{ reference, mask, negate } => (*reference, mask.unwrap_or(Mask::FULL), *negate),
      other => return Err(self.syntax(format!("{:?} is not a source", other)))
    };

    let source = match reference {
      Reference::Register(index) => Source::Register(self.register(index)?),
      Reference::Literal(value)  => Source::Constant(value),
      Reference::Uniform(register) => match self.layout.constants.get(&register) {
        Some(value) => Source::Constant(*value),
        None        => Source::Uniform(self.remapped(Resource::Uniform(register))?)
      },
      Reference::Input(Binding::Position) if self.stage == ShaderKind::Fragment => {
        Source::Attribute(POSITION_SLOT)
      }
      Reference::Input(binding) => Source::Attribute(self.remapped(Resource::Input(binding))?),
      Reference::Output(binding) => {
        return Err(self.syntax(format!("output {} cannot be read", binding)));
      }
    };

    Ok(Operand{ source, mask, negate })
  }

  fn texture_unit(&self, operand: &ParsedOperand) -> Result<u8, LinkError> {
    match operand {
      ParsedOperand::Texture(unit) => self.remapped(Resource::TextureUnit(*unit)),
      other => Err(self.syntax(format!("expected `texture[n]`, found {:?}", other)))
    }
  }

  fn target(&self, operand: &ParsedOperand) -> Result<TextureTarget, LinkError> {
    match operand {
      ParsedOperand::Target(target) => Ok(*target),
      other => Err(self.syntax(format!("expected a texture target, found {:?}", other)))
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  fn layout() -> ProgramLayout {
    let mut layout = ProgramLayout::default();
    let vertex = &mut layout.vertex;
    vertex.remap.insert(Resource::Input(Binding::Attrib(0)), 0);
    vertex.remap.insert(Resource::Output(Binding::Position), 0);
    vertex.remap.insert(Resource::Output(Binding::TexCoord(0)), 2);
    vertex.remap.insert(Resource::Uniform(0), 7);
    vertex.remap.insert(Resource::TextureUnit(3), 1);
    layout
  }

  fn assemble_vertex(body: &str) -> Result<Vec<Instruction>, LinkError> {
    assemble(&layout(), ShaderKind::Vertex, &format!("!!NVvp4.0\n{}\nEND\n", body))
  }

  #[test]
  fn operands_are_remapped(){
    let instructions = assemble_vertex("ADD.F result.texcoord[0].xy, -vertex.attrib[0], c[0].w;").unwrap();
    assert_eq!(instructions, vec![Instruction::Binary {
      opcode      : Opcode::Add,
      destination : Destination::Attribute{ index: 2, mask: "xy".parse().unwrap() },
      sources     : [
        Operand::new(Source::Attribute(0)).negated(),
        Operand::masked(Source::Uniform(7), "w".parse().unwrap())
      ]
    }]);
  }

  #[test]
  fn texture_units_are_remapped(){
    let instructions = assemble_vertex("TXL R1, vertex.attrib[0], texture[3], 2D;").unwrap();
    assert_eq!(instructions[0].texture(), Some((1, TextureTarget::Texture2D)));

    let error = assemble_vertex("TEX R1, vertex.attrib[0], texture[0], 2D;").unwrap_err();
    assert!(matches!(error, LinkError::Unresolved{ line: 2, .. }));
  }

  #[test]
  fn unknown_opcodes_are_dropped(){
    let instructions = assemble_vertex("FOO R0, R1;\nMOV R0, R1;").unwrap();
    assert_eq!(instructions.len(), 1);
    assert_eq!(instructions[0].opcode(), Opcode::Mov);
  }

  #[test]
  fn operand_errors(){
    assert!(matches!(assemble_vertex("MOV R0, R1, R2;"), Err(LinkError::Syntax{ .. })));
    assert!(matches!(assemble_vertex("MOV -R0, R1;"), Err(LinkError::Syntax{ .. })));
    assert!(matches!(assemble_vertex("MOV R0, result.position;"), Err(LinkError::Syntax{ .. })));
    assert!(matches!(assemble_vertex("MOV c[0], R1;"), Err(LinkError::Syntax{ .. })));
    assert!(matches!(assemble_vertex("MOV R32, R1;"), Err(LinkError::TooManyTemporaries{ index: 32, .. })));
    assert!(matches!(assemble_vertex("MOV R0, vertex.attrib[4];"), Err(LinkError::Unresolved{ .. })));
  }

  #[test]
  fn color_outside_fragment_is_an_attribute(){
    // A vertex shader writing its color output gets a varying slot, not the fragment color.
    let error = assemble_vertex("MOV result.color, R0;").unwrap_err();
    assert!(matches!(error, LinkError::Unresolved{ .. }));
  }
}
