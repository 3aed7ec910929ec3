use std::fmt::{Display, Formatter};

use super::{Opcode, TextureTarget};
use crate::mask::Mask;
use crate::vector::Vector4;

/// Where a source operand is read from. Indices are final storage slots, already remapped by
/// the linker.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Source {
  /// A slot of the invocation's attribute array.
  Attribute(u8),
  /// A location in the uniform table.
  Uniform(u8),
  /// A temporary register.
  Register(u8),
  /// A literal carried by the instruction itself.
  Constant(Vector4)
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Operand {
  pub source : Source,
  pub mask   : Mask,
  pub negate : bool
}

impl Operand {
  pub fn new(source: Source) -> Operand {
    Operand{ source, mask: Mask::FULL, negate: false }
  }

  pub fn masked(source: Source, mask: Mask) -> Operand {
    Operand{ source, mask, negate: false }
  }

  pub fn negated(self) -> Operand {
    Operand{ negate: !self.negate, ..self }
  }
}

/// Where the result of an instruction is written.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Destination {
  Attribute{ index: u8, mask: Mask },
  Register{ index: u8, mask: Mask },
  /// The output color of a fragment invocation. Only legal in fragment programs.
  Color{ mask: Mask }
}

impl Destination {
  pub fn mask(&self) -> Mask {
    match self {
      | Destination::Attribute{ mask, .. }
      | Destination::Register{ mask, .. }
      | Destination::Color{ mask } => *mask
    }
  }
}

/// Holds the components of an instruction. As such, it enumerates the possible operand layouts.
#[derive(Clone, PartialEq, Debug)]
pub enum Instruction {
  Vector {
    opcode      : Opcode,
    destination : Destination,
    source      : Operand
  },
  Binary {
    opcode      : Opcode,
    destination : Destination,
    sources     : [Operand; 2]
  },
  Ternary {
    opcode      : Opcode,
    destination : Destination,
    sources     : [Operand; 3]
  },
  Texture {
    opcode      : Opcode,
    destination : Destination,
    coordinate  : Operand,
    unit        : u8,
    target      : TextureTarget
  },
  TextureGradient {
    opcode      : Opcode,
    destination : Destination,
    coordinate  : Operand,
    gradients   : [Operand; 2],
    unit        : u8,
    target      : TextureTarget
  }
}

impl Instruction {
  pub fn opcode(&self) -> Opcode {
    match self {
      | Instruction::Vector{ opcode, .. }
      | Instruction::Binary{ opcode, .. }
      | Instruction::Ternary{ opcode, .. }
      | Instruction::Texture{ opcode, .. }
      | Instruction::TextureGradient{ opcode, .. } => *opcode
    }
  }

  pub fn destination(&self) -> &Destination {
    match self {
      | Instruction::Vector{ destination, .. }
      | Instruction::Binary{ destination, .. }
      | Instruction::Ternary{ destination, .. }
      | Instruction::Texture{ destination, .. }
      | Instruction::TextureGradient{ destination, .. } => destination
    }
  }

  /// The source operands in slot order.
  pub fn sources(&self) -> Vec<&Operand> {
    match self {
      Instruction::Vector{ source, .. }       => vec![source],
      Instruction::Binary{ sources, .. }      => sources.iter().collect(),
      Instruction::Ternary{ sources, .. }     => sources.iter().collect(),
      Instruction::Texture{ coordinate, .. }  => vec![coordinate],
      Instruction::TextureGradient{ coordinate, gradients, .. } => {
        let mut operands = vec![coordinate];
        operands.extend(gradients.iter());
        operands
      }
    }
  }

  /// The texture unit and target of a texture instruction.
  pub fn texture(&self) -> Option<(u8, TextureTarget)> {
    match self {
      | Instruction::Texture{ unit, target, .. }
      | Instruction::TextureGradient{ unit, target, .. } => Some((*unit, *target)),
      _ => None
    }
  }
}

impl Display for Operand {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    if self.negate {
      write!(f, "-")?;
    }
    match self.source {
      Source::Attribute(i) => write!(f, "ATTR[{}]", i)?,
      Source::Uniform(i)   => write!(f, "U[{}]", i)?,
      Source::Register(i)  => write!(f, "R{}", i)?,
      Source::Constant(v)  => write!(f, "{{{}, {}, {}, {}}}", v.x, v.y, v.z, v.w)?,
    }
    match self.mask.is_full() {
      true  => Ok(()),
      false => write!(f, ".{}", self.mask)
    }
  }
}

impl Display for Destination {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Destination::Attribute{ index, .. } => write!(f, "ATTR[{}]", index)?,
      Destination::Register{ index, .. }  => write!(f, "R{}", index)?,
      Destination::Color{ .. }            => write!(f, "COLOR")?,
    }
    match self.mask().is_full() {
      true  => Ok(()),
      false => write!(f, ".{}", self.mask())
    }
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}", self.opcode(), self.destination())?;
    for operand in self.sources() {
      write!(f, ", {}", operand)?;
    }
    if let Some((unit, target)) = self.texture() {
      write!(f, ", texture[{}], {}", unit, target)?;
    }
    Ok(())
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_nvgp4_style(){
    let instruction = Instruction::Ternary {
      opcode      : Opcode::Mad,
      destination : Destination::Register{ index: 0, mask: "xy".parse().unwrap() },
      sources     : [
        Operand::masked(Source::Attribute(0), "x".parse().unwrap()),
        Operand::new(Source::Uniform(3)).negated(),
        Operand::new(Source::Constant(Vector4::new(1.0, 2.0, 3.0, 4.0))),
      ]
    };
    assert_eq!(instruction.to_string(), "MAD R0.xy, ATTR[0].x, -U[3], {1, 2, 3, 4}");
  }

  #[test]
  fn texture_operands(){
    let instruction = Instruction::TextureGradient {
      opcode      : Opcode::Txd,
      destination : Destination::Color{ mask: Mask::FULL },
      coordinate  : Operand::new(Source::Attribute(2)),
      gradients   : [Operand::new(Source::Register(1)), Operand::new(Source::Register(2))],
      unit        : 1,
      target      : TextureTarget::Texture2D
    };
    assert_eq!(instruction.sources().len(), 3);
    assert_eq!(instruction.texture(), Some((1, TextureTarget::Texture2D)));
    assert_eq!(instruction.to_string(), "TXD COLOR, ATTR[2], R1, R2, texture[1], 2D");
  }
}
