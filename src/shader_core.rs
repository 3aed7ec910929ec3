/*!
  The virtual shader core. A `ShaderCore` runs a linked instruction sequence once over one vertex
  or pixel record: for every instruction it fetches and masks the source operands, computes the
  result into a destination scratch, and writes it back through the destination mask. There is no
  branching, so an invocation is a single pass over the sequence.

  The register file is scoped to one invocation and is reset at the start of every `execute`.
*/

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};
use tracing::{trace, warn};

use crate::bytecode::{Destination, Instruction, Opcode, Operand, ShaderKind, Source, TextureTarget};
use crate::invocation::{InvocationRecord, COLOR_SLOT};
use crate::vector::Vector4;

pub const REGISTER_FILE_SIZE: usize = 32;

/// The sampling collaborator. Implementations are shared by every invocation in flight, so they
/// must tolerate concurrent reads.
pub trait TextureUnit: Sync {
  /// Filtered sample. `lod` is an explicit level of detail; when it is `None` the level is derived
  /// from the gradients `ddx` and `ddy`.
  fn sample(
    &self,
    coordinate : Vector4,
    lod        : Option<f32>,
    ddx        : Vector4,
    ddy        : Vector4,
    unit       : u8,
    target     : TextureTarget
  ) -> Vector4;

  /// Unfiltered texel fetch from mip level `level`.
  fn fetch(&self, coordinate: Vector4, level: u32, unit: u8) -> Vector4;
}

/// A texture unit with nothing bound. Every sample reads as zero.
#[derive(Copy, Clone, Default, Debug)]
pub struct NullTextureUnit;

impl TextureUnit for NullTextureUnit {
  fn sample(&self, _: Vector4, _: Option<f32>, _: Vector4, _: Vector4, _: u8, _: TextureTarget) -> Vector4 {
    Vector4::ZERO
  }

  fn fetch(&self, _: Vector4, _: u32, _: u8) -> Vector4 {
    Vector4::ZERO
  }
}

pub struct ShaderCore<'a> {
  // Registers //
  pc        : usize,                          // Program counter
  registers : [Vector4; REGISTER_FILE_SIZE],  // Temporaries, R0..R31
  src       : [Vector4; 3],                   // Masked source operands of the current instruction
  dst       : Vector4,                        // Result of the current instruction

  // Shared, read-only during execution
  instructions : &'a [Instruction],
  uniforms     : &'a [Vector4],
  textures     : &'a dyn TextureUnit
}

impl<'a> ShaderCore<'a> {

  // region Display methods

  pub fn make_register_table<T>(name: &str, registers: &[T], highlight: Option<usize>) -> Table
    where T: Display
  {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for (i, item) in registers.iter().enumerate() {
      match Some(i) == highlight {

        true  => {
          table.add_row(row![r->format!("* --> {}[{}] =", name, i), format!("{}", item)]);
        }

        false => {
          table.add_row(row![r->format!("{}[{}] =", name, i), format!("{}", item)]);
        }

      }
    }
    table
  }

  // endregion

  pub fn new(instructions: &'a [Instruction], uniforms: &'a [Vector4], textures: &'a dyn TextureUnit)
      -> ShaderCore<'a>
  {
    ShaderCore{
      pc        : 0,
      registers : [Vector4::ZERO; REGISTER_FILE_SIZE],
      src       : [Vector4::ZERO; 3],
      dst       : Vector4::ZERO,
      instructions,
      uniforms,
      textures
    }
  }

  pub fn pc(&self) -> usize {
    self.pc
  }

  pub fn registers(&self) -> &[Vector4] {
    &self.registers
  }

  /// Runs the whole instruction sequence once over `record`.
  pub fn execute(&mut self, kind: ShaderKind, record: &mut dyn InvocationRecord) {
    self.pc        = 0;
    self.registers = [Vector4::ZERO; REGISTER_FILE_SIZE];
    self.src       = [Vector4::ZERO; 3];
    self.dst       = Vector4::ZERO;

    let instructions = self.instructions;
    while let Some(instruction) = instructions.get(self.pc) {
      self.fetch(instruction, &*record);
      self.dst = self.compute(instruction, &*record);
      self.write_back(instruction.destination(), kind, record);
      self.pc += 1;

      #[cfg(feature = "trace_computation")]
      trace!("{} {}\n{}", kind, instruction, self);
    }
  }

  fn fetch(&mut self, instruction: &Instruction, record: &dyn InvocationRecord) {
    for (slot, operand) in instruction.sources().into_iter().enumerate() {
      self.src[slot] = self.read_operand(operand, record);
    }
  }

  fn read_operand(&self, operand: &Operand, record: &dyn InvocationRecord) -> Vector4 {
    let raw = match operand.source {
      Source::Attribute(slot) => match record.attributes().get(slot as usize) {
        Some(value) => *value,
        None => {
          warn!("Shader: attribute slot {} is out of range, reading zero", slot);
          Vector4::ZERO
        }
      },
      Source::Uniform(location) => match self.uniforms.get(location as usize) {
        Some(value) => *value,
        None => {
          warn!("Shader: uniform location {} is not in the uniform table, reading zero", location);
          Vector4::ZERO
        }
      },
      Source::Register(index) => match self.registers.get(index as usize) {
        Some(value) => *value,
        None => {
          warn!("Shader: register R{} is out of range, reading zero", index);
          Vector4::ZERO
        }
      },
      Source::Constant(value) => value
    };

    let value = operand.mask.read(raw);
    match operand.negate {
      true  => -value,
      false => value
    }
  }

  fn compute(&self, instruction: &Instruction, record: &dyn InvocationRecord) -> Vector4 {
    let src = &self.src;

    match instruction {
      Instruction::Vector{ opcode, .. } => match opcode {
        Opcode::Abs  => src[0].abs(),
        Opcode::Ceil => src[0].ceil(),
        Opcode::Flr  => src[0].floor(),
        Opcode::Mov  => src[0],
        other        => self.unimplemented(*other)
      },

      Instruction::Binary{ opcode, .. } => match opcode {
        Opcode::Add => src[0] + src[1],
        Opcode::Mul => src[0] * src[1],
        Opcode::Dp3 => src[0].dot3(src[1]),
        Opcode::Dp4 => src[0].dot4(src[1]),
        other       => self.unimplemented(*other)
      },

      Instruction::Ternary{ opcode, .. } => match opcode {
        Opcode::Mad => src[0] * src[1] + src[2],
        other       => self.unimplemented(*other)
      },

      Instruction::Texture{ opcode, coordinate, unit, target, .. } => match opcode {
        Opcode::Tex => {
          let (ddx, ddy) = scale_factors(coordinate, record);
          self.textures.sample(src[0], None, ddx, ddy, *unit, *target)
        }
        Opcode::Txl => {
          self.textures.sample(src[0], Some(src[0].w), Vector4::ZERO, Vector4::ZERO, *unit, *target)
        }
        Opcode::Txp => {
          let (ddx, ddy) = scale_factors(coordinate, record);
          self.textures.sample(project(src[0]), None, ddx, ddy, *unit, *target)
        }
        Opcode::Txf => self.textures.fetch(src[0], 0, *unit),
        other       => self.unimplemented(*other)
      },

      Instruction::TextureGradient{ opcode, unit, target, .. } => match opcode {
        Opcode::Txd => self.textures.sample(src[0], None, src[1], src[2], *unit, *target),
        other       => self.unimplemented(*other)
      },
    }
  }

  /// Opcodes without numeric semantics produce the zero vector.
  fn unimplemented(&self, opcode: Opcode) -> Vector4 {
    trace!("Shader: {} at pc {} is not implemented, result is zero", opcode, self.pc);
    Vector4::ZERO
  }

  fn write_back(&mut self, destination: &Destination, kind: ShaderKind, record: &mut dyn InvocationRecord) {
    let value = self.dst;

    match *destination {
      Destination::Attribute{ index, mask } => match record.attributes_mut().get_mut(index as usize) {
        Some(slot) => mask.write(value, slot),
        None => warn!("Shader: attribute slot {} is out of range, write skipped", index)
      },

      Destination::Register{ index, mask } => match self.registers.get_mut(index as usize) {
        Some(register) => mask.write(value, register),
        None => warn!("Shader: register R{} is out of range, write skipped", index)
      },

      Destination::Color{ mask } => match kind {
        ShaderKind::Fragment => match record.attributes_mut().get_mut(COLOR_SLOT as usize) {
          Some(color) => mask.write(value, color),
          None => warn!("Shader: the record has no color slot, write skipped")
        },
        ShaderKind::Vertex => warn!("Shader: the color output is only writable by a fragment shader"),
      },
    }
  }
}

/// Scale factors of the attribute a texture coordinate is read from. Other sources have none.
fn scale_factors(coordinate: &Operand, record: &dyn InvocationRecord) -> (Vector4, Vector4) {
  match coordinate.source {
    Source::Attribute(slot) => record.scale_factors(slot),
    _ => (Vector4::ZERO, Vector4::ZERO)
  }
}

/// Divides xyz by w. A zero w leaves the coordinate as it is.
fn project(coordinate: Vector4) -> Vector4 {
  match coordinate.w == 0.0 {
    true  => coordinate,
    false => Vector4::new(
      coordinate.x / coordinate.w,
      coordinate.y / coordinate.w,
      coordinate.z / coordinate.w,
      1.0
    )
  }
}

/// Runs `instructions` once over `record` on a fresh core.
pub fn execute(
  instructions : &[Instruction],
  kind         : ShaderKind,
  record       : &mut dyn InvocationRecord,
  uniforms     : &[Vector4],
  textures     : &dyn TextureUnit
) {
  ShaderCore::new(instructions, uniforms, textures).execute(kind, record);
}

/// The instruction sequence as a table, one row per instruction.
pub fn listing(instructions: &[Instruction]) -> Table {
  ShaderCore::make_register_table("I", instructions, None)
}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl<'a> Display for ShaderCore<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let r_table = ShaderCore::make_register_table("R", &self.registers, None);
    let i_table = ShaderCore::make_register_table("I", self.instructions, self.pc.checked_sub(1));
    let s_table = ShaderCore::make_register_table("S", &self.src, None);

    let mut combined_table = table!([r_table, i_table, s_table]);

    combined_table.set_titles(row![ub->"Registers", ub->"Instructions", ub->"Sources"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(f, "pc: {}\tdst: {}\n{}", self.pc, self.dst, combined_table)
  }
}
