//! Runs one stage over many invocation records in parallel. Invocations share nothing but the
//! read-only instructions, uniforms, and texture unit, so the records are split into contiguous
//! batches and every worker shades its batch on its own core.

use tracing::debug;

use crate::bytecode::{Instruction, ShaderKind};
use crate::error::DispatchError;
use crate::invocation::InvocationRecord;
use crate::shader_core::{ShaderCore, TextureUnit};
use crate::vector::Vector4;

pub fn shade_all<R>(
  instructions : &[Instruction],
  kind         : ShaderKind,
  records      : &mut [R],
  uniforms     : &[Vector4],
  textures     : &dyn TextureUnit,
  workers      : usize
) -> Result<(), DispatchError>
  where R: InvocationRecord + Send
{
  if records.is_empty() {
    return Ok(());
  }

  let workers    = workers.max(1).min(records.len());
  let batch_size = (records.len() + workers - 1) / workers;
  debug!("Shading {} {} invocations on {} workers", records.len(), kind, workers);

  crossbeam::thread::scope(|scope| {
    for batch in records.chunks_mut(batch_size) {
      scope.spawn(move |_| {
        let mut core = ShaderCore::new(instructions, uniforms, textures);
        for record in batch.iter_mut() {
          core.execute(kind, record);
        }
      });
    }
  }).map_err(|_| DispatchError::WorkerPanicked)
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::{Destination, Opcode, Operand, Source};
  use crate::invocation::Vertex;
  use crate::mask::Mask;
  use crate::shader_core::NullTextureUnit;

  #[test]
  fn every_record_is_shaded(){
    // out = attr0 * u0 + attr1
    let instructions = vec![Instruction::Ternary {
      opcode      : Opcode::Mad,
      destination : Destination::Attribute{ index: 2, mask: Mask::FULL },
      sources     : [
        Operand::new(Source::Attribute(0)),
        Operand::new(Source::Uniform(0)),
        Operand::new(Source::Attribute(1)),
      ]
    }];
    let uniforms = [Vector4::splat(2.0)];

    let mut vertices: Vec<Vertex> = (0..37)
      .map(|i| {
        Vertex::new()
          .with_attribute(0, Vector4::splat(i as f32))
          .with_attribute(1, Vector4::splat(1.0))
      })
      .collect();

    shade_all(&instructions, ShaderKind::Vertex, &mut vertices, &uniforms, &NullTextureUnit, 4).unwrap();

    for (i, vertex) in vertices.iter().enumerate() {
      assert_eq!(vertex.attributes[2], Vector4::splat(2.0 * i as f32 + 1.0));
    }
  }

  #[test]
  fn nothing_to_do(){
    let mut vertices: Vec<Vertex> = Vec::new();
    assert!(shade_all(&[], ShaderKind::Vertex, &mut vertices, &[], &NullTextureUnit, 0).is_ok());
  }
}
