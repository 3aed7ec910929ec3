/*!
  A virtual programmable shader stage. NVGP4 assembly for a vertex and a fragment program is
  linked into two instruction sequences sharing one symbol space, and the shader core runs a
  sequence once per vertex or per pixel.

  ```text
  assembly text -> [`linker`] -> `Program` -> [`shader_core::execute`] per invocation
  ```
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod bytecode;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod invocation;
pub mod linker;
pub mod mask;
pub mod program;
pub mod shader_core;
pub mod symboltable;
pub mod vector;

pub use crate::bytecode::{Instruction, Opcode, ShaderKind};
pub use crate::config::Limits;
pub use crate::error::{ConfigError, DispatchError, LinkError};
pub use crate::invocation::{InvocationRecord, Pixel, Vertex};
pub use crate::program::{Program, Shader};
pub use crate::shader_core::{execute, NullTextureUnit, ShaderCore, TextureUnit};
pub use crate::vector::Vector4;
