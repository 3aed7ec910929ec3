/*!

  Instructions are not encoded to words. The linker produces a sequence of `Instruction` values, one
  enum variant per operand layout, and the shader core walks that sequence with a program counter.
  An instruction carries exactly the operand slots its opcode family reads, so the core can never
  read an operand the opcode did not define.

  Opcodes are numbered so that each family occupies a contiguous range of codes, which is how an
  opcode's family is determined. Consequently, the order the opcodes are listed below is
  significant. Order-dependencies:
      ```
      Opcode::family()
      Opcode::arity()
      ```

*/

pub mod assembly;
mod instruction;

pub use instruction::{Destination, Instruction, Operand, Source};

use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};
use num_enum::IntoPrimitive;

/// The pipeline stage an instruction stream runs in. Also selects vertex or pixel storage when an
/// instruction reads or writes an attribute.
#[derive(StrumDisplay, EnumString, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum ShaderKind {
  #[strum(to_string = "vertex")]
  Vertex,
  #[strum(to_string = "fragment")]
  Fragment
}

/**
  Opcodes of the NVGP4 instruction set, grouped by operand family:

    Vector (VECTORop):        one source
    Binary (BINop):           two sources
    Ternary (TRIop):          three sources
    Texture (TEXop):          one coordinate source, a texture unit, and a target
    TextureGradient (TXDop):  coordinate, two gradients, a texture unit, and a target

  Only a subset has numeric semantics in the shader core; see `Opcode::is_implemented`.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq,     Debug, Hash
)]
#[repr(u8)]
pub enum Opcode {
  // Vector //
  #[strum(to_string = "ABS")]   Abs,
  #[strum(to_string = "CEIL")]  Ceil,
  #[strum(to_string = "FLR")]   Flr,
  #[strum(to_string = "FRC")]   Frc,
  #[strum(to_string = "I2F")]   I2f,
  #[strum(to_string = "LIT")]   Lit,
  #[strum(to_string = "MOV")]   Mov,
  #[strum(to_string = "NOT")]   Not,
  #[strum(to_string = "NRM")]   Nrm,
  #[strum(to_string = "PK2H")]  Pk2h,
  #[strum(to_string = "PK2US")] Pk2us,
  #[strum(to_string = "PK4B")]  Pk4b,
  #[strum(to_string = "PK4UB")] Pk4ub,
  #[strum(to_string = "ROUND")] Round,
  #[strum(to_string = "SSG")]   Ssg,
  #[strum(to_string = "TRUNC")] Trunc,
  // Opcode 16

  // Binary //
  #[strum(to_string = "ADD")]   Add,
  #[strum(to_string = "AND")]   And,
  #[strum(to_string = "DP3")]   Dp3,
  #[strum(to_string = "DP4")]   Dp4,
  #[strum(to_string = "DPH")]   Dph,
  #[strum(to_string = "DST")]   Dst,
  #[strum(to_string = "MAX")]   Max,
  #[strum(to_string = "MIN")]   Min,
  #[strum(to_string = "MUL")]   Mul,
  #[strum(to_string = "OR")]    Or,
  #[strum(to_string = "RFL")]   Rfl,
  #[strum(to_string = "SEQ")]   Seq,
  #[strum(to_string = "SFL")]   Sfl,
  #[strum(to_string = "SGE")]   Sge,
  #[strum(to_string = "SGT")]   Sgt,
  #[strum(to_string = "SLE")]   Sle,
  #[strum(to_string = "SLT")]   Slt,
  #[strum(to_string = "SNE")]   Sne,
  #[strum(to_string = "STR")]   Str,
  #[strum(to_string = "SUB")]   Sub,
  #[strum(to_string = "XPD")]   Xpd,
  #[strum(to_string = "DP2")]   Dp2,
  #[strum(to_string = "XOR")]   Xor,
  // Opcode 39

  // Ternary //
  #[strum(to_string = "CMP")]   Cmp,
  #[strum(to_string = "DP2A")]  Dp2a,
  #[strum(to_string = "LRP")]   Lrp,
  #[strum(to_string = "MAD")]   Mad,
  #[strum(to_string = "SAD")]   Sad,
  #[strum(to_string = "X2D")]   X2d,
  // Opcode 45

  // Texture //
  #[strum(to_string = "TEX")]   Tex,
  #[strum(to_string = "TXB")]   Txb,
  #[strum(to_string = "TXF")]   Txf,
  #[strum(to_string = "TXL")]   Txl,
  #[strum(to_string = "TXP")]   Txp,
  #[strum(to_string = "TXQ")]   Txq,
  // Opcode 51

  // Texture with gradients //
  #[strum(to_string = "TXD")]   Txd,
}

pub const MAX_VECTOR_OPCODE: u8 = 16u8;
pub const MAX_BINARY_OPCODE: u8 = 39u8;
pub const MAX_TERNARY_OPCODE: u8 = 45u8;
pub const MAX_TEXTURE_OPCODE: u8 = 51u8;

#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum OpcodeFamily {
  Vector,
  Binary,
  Ternary,
  Texture,
  TextureGradient
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn family(&self) -> OpcodeFamily {
    match self.code() {
      value if value < MAX_VECTOR_OPCODE  => OpcodeFamily::Vector,
      value if value < MAX_BINARY_OPCODE  => OpcodeFamily::Binary,
      value if value < MAX_TERNARY_OPCODE => OpcodeFamily::Ternary,
      value if value < MAX_TEXTURE_OPCODE => OpcodeFamily::Texture,
      _value                              => OpcodeFamily::TextureGradient
    }
  }

  /// The number of source operands the opcode reads.
  pub fn arity(&self) -> usize {
    match self.family() {
      OpcodeFamily::Vector          => 1,
      OpcodeFamily::Binary          => 2,
      OpcodeFamily::Ternary         => 3,
      OpcodeFamily::Texture         => 1,
      OpcodeFamily::TextureGradient => 3,
    }
  }

  /// Whether the shader core gives the opcode numeric semantics. The others execute as
  /// placeholders that produce the zero vector.
  pub fn is_implemented(&self) -> bool {
    match self {
      | Opcode::Abs | Opcode::Ceil | Opcode::Flr | Opcode::Mov
      | Opcode::Add | Opcode::Mul  | Opcode::Dp3 | Opcode::Dp4
      | Opcode::Mad
      | Opcode::Tex | Opcode::Txf  | Opcode::Txl | Opcode::Txp | Opcode::Txd => true,
      _ => false
    }
  }
}

/// The texture dimensionality named by the last operand of a texture instruction.
#[derive(StrumDisplay, EnumString, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum TextureTarget {
  #[strum(to_string = "1D")]         Texture1D,
  #[strum(to_string = "2D")]         Texture2D,
  #[strum(to_string = "3D")]         Texture3D,
  #[strum(to_string = "CUBE")]       Cube,
  #[strum(to_string = "RECT")]       Rect,
  #[strum(to_string = "ARRAY1D")]    Array1D,
  #[strum(to_string = "ARRAY2D")]    Array2D,
  #[strum(to_string = "SHADOW1D")]   Shadow1D,
  #[strum(to_string = "SHADOW2D")]   Shadow2D,
  #[strum(to_string = "SHADOWRECT")] ShadowRect,
}


#[cfg(test)]
mod tests {
  use super::*;
  use std::str::FromStr;

  #[test]
  fn families_follow_code_ranges(){
    assert_eq!(Opcode::Trunc.family(), OpcodeFamily::Vector);
    assert_eq!(Opcode::Add.family(),   OpcodeFamily::Binary);
    assert_eq!(Opcode::Xor.family(),   OpcodeFamily::Binary);
    assert_eq!(Opcode::Cmp.family(),   OpcodeFamily::Ternary);
    assert_eq!(Opcode::X2d.family(),   OpcodeFamily::Ternary);
    assert_eq!(Opcode::Tex.family(),   OpcodeFamily::Texture);
    assert_eq!(Opcode::Txq.family(),   OpcodeFamily::Texture);
    assert_eq!(Opcode::Txd.family(),   OpcodeFamily::TextureGradient);
  }

  #[test]
  fn range_constants(){
    assert_eq!(Opcode::Add.code(), MAX_VECTOR_OPCODE);
    assert_eq!(Opcode::Cmp.code(), MAX_BINARY_OPCODE);
    assert_eq!(Opcode::Tex.code(), MAX_TERNARY_OPCODE);
    assert_eq!(Opcode::Txd.code(), MAX_TEXTURE_OPCODE);
  }

  #[test]
  fn mnemonics(){
    assert_eq!(Opcode::from_str("DP4"), Ok(Opcode::Dp4));
    assert_eq!(Opcode::from_str("PK4UB"), Ok(Opcode::Pk4ub));
    assert!(Opcode::from_str("KIL").is_err());
    assert_eq!(Opcode::Flr.to_string(), "FLR");
    assert_eq!(TextureTarget::from_str("2D"), Ok(TextureTarget::Texture2D));
    assert_eq!(ShaderKind::Fragment.to_string(), "fragment");
  }
}
