/*!
  Links the vertex and fragment assembly of a program into two instruction sequences that only
  refer to final storage slots.

  The pipeline is this:
  ```text
  vertex text, fragment text -> [`info::scan`] per stage -> `ProgramLayout` ->⋯

  ⋯-> limit checks -> varying matching ->⋯

  ⋯-> [`codegen::assemble`] per stage -> `Vec<Instruction>` x 2 -> commit
  ```
  Every step works on a `LinkContext` owned by the call, and nothing reaches the `Program` until
  both stages are assembled.
*/

mod codegen;
mod info;

use tracing::{debug, warn};

use crate::bytecode::{Instruction, ShaderKind};
use crate::bytecode::assembly::SyntaxError;
use crate::config::Limits;
use crate::error::LinkError;
use crate::program::{Program, ProgramLayout, Shader};

/// The result of a successful link, ready to be committed to the program.
#[derive(Debug)]
pub struct LinkedProgram {
  pub layout   : ProgramLayout,
  pub vertex   : Vec<Instruction>,
  pub fragment : Vec<Instruction>
}

/// Accumulates the layout across both stages during one link.
pub struct LinkContext<'l> {
  limits      : &'l Limits,
  layout      : ProgramLayout,
  /// Vertex outputs other than position get slots in declaration order.
  next_varying: u8,
  /// Fragment inputs with no vertex output of the same name.
  unmatched   : Vec<String>
}

/// Relinks `program`. Derived state is reset first, so on failure the program ends up unlinked
/// with empty instruction sequences and the error text as its link log.
pub fn link(program: &mut Program, limits: &Limits) -> Result<(), LinkError> {
  program.reset_link_state();

  let result = attached_stages(program)
    .and_then(|(vertex, fragment)| LinkContext::new(limits).run(&vertex.assembly, &fragment.assembly));

  match result {
    Ok(linked) => {
      debug!(
        "Linked {} vertex and {} fragment instructions, {} uniform vectors, {} texture units",
        linked.vertex.len(),
        linked.fragment.len(),
        linked.layout.uniform_count,
        linked.layout.texture_count()
      );
      program.commit(linked);
      Ok(())
    }
    Err(error) => {
      warn!("Link failed: {}", error);
      program.record_failure(&error);
      Err(error)
    }
  }
}

fn attached_stages(program: &Program) -> Result<(&Shader, &Shader), LinkError> {
  match (program.shader(ShaderKind::Vertex), program.shader(ShaderKind::Fragment)) {
    (Some(vertex), Some(fragment)) => {
      if vertex.compiled && fragment.compiled {
        Ok((vertex, fragment))
      } else {
        Err(LinkError::NotCompiled)
      }
    }
    _ => Err(LinkError::MissingStage)
  }
}

pub(crate) fn syntax_error(stage: ShaderKind, error: SyntaxError) -> LinkError {
  LinkError::Syntax{ stage, line: error.line, message: error.message }
}

impl<'l> LinkContext<'l> {
  pub fn new(limits: &'l Limits) -> LinkContext<'l> {
    LinkContext{
      limits,
      layout       : ProgramLayout::default(),
      next_varying : crate::invocation::FIRST_VARYING_SLOT,
      unmatched    : Vec::new()
    }
  }

  pub fn run(mut self, vertex: &str, fragment: &str) -> Result<LinkedProgram, LinkError> {
    info::scan(&mut self, ShaderKind::Vertex, vertex)?;
    info::scan(&mut self, ShaderKind::Fragment, fragment)?;

    self.check_limits()?;
    if let Some(name) = self.unmatched.first() {
      return Err(LinkError::UnmatchedVarying(name.clone()));
    }

    let vertex   = codegen::assemble(&self.layout, ShaderKind::Vertex, vertex)?;
    let fragment = codegen::assemble(&self.layout, ShaderKind::Fragment, fragment)?;

    Ok(LinkedProgram{ layout: self.layout, vertex, fragment })
  }

  fn check_limits(&self) -> Result<(), LinkError> {
    let vertex   = &self.layout.vertex;
    let fragment = &self.layout.fragment;

    if vertex.input_count > self.limits.max_attributes {
      return Err(LinkError::TooManyInputs);
    }
    if vertex.output_count > self.limits.max_attributes {
      return Err(LinkError::TooManyOutputs);
    }
    if vertex.uniform_count > self.limits.max_vertex_uniform_vectors
        || fragment.uniform_count > self.limits.max_fragment_uniform_vectors
        || self.layout.texture_count() > self.limits.max_texture_units {
      return Err(LinkError::TooManyUniforms);
    }
    Ok(())
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::{Destination, Opcode, Operand, Source};
  use crate::mask::Mask;
  use crate::vector::Vector4;

  const VERTEX: &str = "!!NVvp4.0
# cgc version 3.1.0013, build date Apr 18 2012
#var float4x4 u_mvp :  : c[0], 4 : -1 : 1
#var float4 a_position : $vin.ATTR0 : ATTR0 : -1 : 1
#var float2 a_texCoord : $vin.ATTR1 : ATTR1 : -1 : 1
#var float4 gl_Position : $vout.POSITION : HPOS : -1 : 1
#var float2 v_texCoord : $vout.TEX0 : TEX0 : -1 : 1
#var float4 unused : $vin.ATTR5 : ATTR5 : -1 : 0
PARAM c[4] = { program.local[0..3] };
ATTRIB vertex_attrib[] = { vertex.attrib[0..1] };
OUTPUT result_texcoord[] = { result.texcoord[0..0] };
TEMP R0;
MUL.F R0, vertex.attrib[0].y, c[1];
MAD.F R0, vertex.attrib[0].x, c[0], R0;
MAD.F R0, vertex.attrib[0].z, c[2], R0;
MAD.F result.position, vertex.attrib[0].w, c[3], R0;
MOV.F result.texcoord[0].xy, vertex.attrib[1];
END
# 5 instructions, 1 R-regs
";

  const FRAGMENT: &str = "!!NVfp4.0
# cgc version 3.1.0013, build date Apr 18 2012
#var float2 v_texCoord : $vin.TEX0 : TEX0 : -1 : 1
#var sampler2D s_texture :  : texunit 0 : -1 : 1
#var float4 u_tint :  : c[0] : -1 : 1
#var float4 gl_FragColor : $vout.COLOR : COL0[0] : -1 : 1
#const c[1] = 0.5
PARAM c[2] = { program.local[0], { 0.5 } };
TEMP R0;
TEX.F R0, fragment.texcoord[0], texture[0], 2D;
MUL.F R0, R0, c[0];
MUL.F result_color0, R0, c[1].x;
END
# 3 instructions, 1 R-regs
";

  fn program(vertex: &str, fragment: &str) -> Program {
    let mut program = Program::new();
    program.attach(Shader::from_assembly(ShaderKind::Vertex, vertex));
    program.attach(Shader::from_assembly(ShaderKind::Fragment, fragment));
    program
  }

  #[test]
  fn links_a_textured_program(){
    let mut program = program(VERTEX, FRAGMENT);
    program.link(&Limits::default()).unwrap();

    assert!(program.is_linked());
    assert_eq!(program.link_info(), "");
    assert_eq!(program.attribute_location("a_position"), Some(0));
    assert_eq!(program.attribute_location("a_texCoord"), Some(1));
    assert_eq!(program.attribute_location("unused"), None);
    assert_eq!(program.uniform_location("u_mvp"), Some(0));
    assert_eq!(program.uniform_location("u_tint"), Some(4));
    assert_eq!(program.uniform_count(), 5);
    assert_eq!(program.texture_unit("s_texture"), Some(0));

    let vertex = program.instructions(ShaderKind::Vertex);
    assert_eq!(vertex.len(), 5);
    // The position lands in slot 0 and the texture coordinate in the first varying slot.
    assert_eq!(vertex[3].destination(), &Destination::Attribute{ index: 0, mask: Mask::FULL });
    assert_eq!(vertex[4].destination(), &Destination::Attribute{ index: 2, mask: "xy".parse().unwrap() });

    let fragment = program.instructions(ShaderKind::Fragment);
    assert_eq!(fragment.len(), 3);
    assert_eq!(fragment[0].sources()[0].source, Source::Attribute(2));
    assert_eq!(fragment[0].texture().map(|(unit, _)| unit), Some(0));
    assert_eq!(fragment[1].sources()[1].source, Source::Uniform(4));
    assert_eq!(fragment[2].opcode(), Opcode::Mul);
    assert_eq!(fragment[2].destination(), &Destination::Color{ mask: Mask::FULL });
    // `#const` values are folded into the instruction.
    assert_eq!(
      *fragment[2].sources()[1],
      Operand::masked(Source::Constant(Vector4::splat(0.5)), "x".parse().unwrap())
    );
  }

  #[test]
  fn missing_or_uncompiled_stages(){
    let mut program = Program::new();
    program.attach(Shader::from_assembly(ShaderKind::Vertex, VERTEX));
    assert_eq!(program.link(&Limits::default()), Err(LinkError::MissingStage));

    program.attach(Shader::new(ShaderKind::Fragment));
    assert_eq!(program.link(&Limits::default()), Err(LinkError::NotCompiled));
    assert!(program.link_info().starts_with("L0002"));
  }

  #[test]
  fn too_many_vertex_inputs(){
    let mut vertex = String::from("!!NVvp4.0\n");
    for i in 0..9 {
      vertex.push_str(&format!("#var float4 a_{} : $vin.ATTR{} : ATTR{} : -1 : 1\n", i, i, i));
    }
    vertex.push_str("END\n");

    let mut program = program(&vertex, "!!NVfp4.0\nEND\n");
    assert_eq!(program.link(&Limits::default()), Err(LinkError::TooManyInputs));
    assert_eq!(program.link_info(), "L0003: Too many vertex input values");

    let roomy = Limits{ max_attributes: 9, ..Limits::default() };
    assert!(program.link(&roomy).is_ok());
  }

  #[test]
  fn too_many_fragment_uniforms(){
    let fragment = "!!NVfp4.0\n#var float4 u_colors[17] :  : c[0], 17 : -1 : 1\nEND\n";
    let mut program = program(VERTEX, fragment);
    assert_eq!(program.link(&Limits::default()), Err(LinkError::TooManyUniforms));
  }

  #[test]
  fn too_many_vertex_outputs(){
    let varyings = |count: usize| {
      let mut vertex = String::from("!!NVvp4.0\n");
      for i in 0..count {
        vertex.push_str(&format!("#var float4 v_{} : $vout.TEX{} : TEX{} : -1 : 1\n", i, i, i));
      }
      vertex.push_str("END\n");
      vertex
    };

    let mut over = program(&varyings(9), "!!NVfp4.0\nEND\n");
    assert_eq!(over.link(&Limits::default()), Err(LinkError::TooManyOutputs));
    assert!(over.link_info().starts_with("L0004"));

    let mut at_limit = program(&varyings(8), "!!NVfp4.0\nEND\n");
    assert!(at_limit.link(&Limits::default()).is_ok());
  }

  #[test]
  fn too_many_vertex_uniforms(){
    let uniforms = |count: usize| {
      format!("!!NVvp4.0\n#var float4 u_bones[{}] :  : c[0], {} : -1 : 1\nEND\n", count, count)
    };

    let mut over = program(&uniforms(129), "!!NVfp4.0\nEND\n");
    assert_eq!(over.link(&Limits::default()), Err(LinkError::TooManyUniforms));
    assert!(over.link_info().starts_with("L0005"));

    let mut at_limit = program(&uniforms(128), "!!NVfp4.0\nEND\n");
    assert!(at_limit.link(&Limits::default()).is_ok());
    assert_eq!(at_limit.uniform_count(), 128);
  }

  #[test]
  fn too_many_texture_units(){
    let samplers = |count: usize| {
      let mut fragment = String::from("!!NVfp4.0\n");
      for i in 0..count {
        fragment.push_str(&format!("#var sampler2D s_{} :  : texunit {} : -1 : 1\n", i, i));
      }
      fragment.push_str("END\n");
      fragment
    };

    let mut over = program("!!NVvp4.0\nEND\n", &samplers(3));
    assert_eq!(over.link(&Limits::default()), Err(LinkError::TooManyUniforms));
    assert!(over.link_info().starts_with("L0005"));

    let mut at_limit = program("!!NVvp4.0\nEND\n", &samplers(2));
    assert!(at_limit.link(&Limits::default()).is_ok());
    assert_eq!(at_limit.texture_unit("s_1"), Some(1));
  }

  #[test]
  fn fragment_uniforms_at_the_limit(){
    let fragment = "!!NVfp4.0\n#var float4 u_colors[16] :  : c[0], 16 : -1 : 1\nEND\n";
    let mut program = program(VERTEX, fragment);
    assert!(program.link(&Limits::default()).is_ok());
  }

  #[test]
  fn vertex_position_reads_the_position_input(){
    let vertex = "!!NVvp4.0
#var float4 gl_Vertex : $vin.POSITION : POSITION : -1 : 1
#var float4 gl_Position : $vout.POSITION : HPOS : -1 : 1
MOV.F result.position, vertex.position;
END
";
    let mut program = program(vertex, "!!NVfp4.0\nEND\n");
    program.link(&Limits::default()).unwrap();

    assert_eq!(program.attribute_location("gl_Vertex"), Some(0));
    let instructions = program.instructions(ShaderKind::Vertex);
    assert_eq!(instructions[0].sources()[0].source, Source::Attribute(0));
    assert_eq!(instructions[0].destination(), &Destination::Attribute{ index: 0, mask: Mask::FULL });
  }

  #[test]
  fn vertex_position_reads_the_first_attribute(){
    let vertex = "!!NVvp4.0
#var float4 a_position : $vin.ATTR0 : ATTR0 : -1 : 1
#var float4 gl_Position : $vout.POSITION : HPOS : -1 : 1
MOV.F result.position, vertex.position;
END
";
    let mut program = program(vertex, "!!NVfp4.0\nEND\n");
    program.link(&Limits::default()).unwrap();
    assert_eq!(program.instructions(ShaderKind::Vertex)[0].sources()[0].source, Source::Attribute(0));
  }

  #[test]
  fn failed_relink_clears_the_program(){
    let mut program = program(VERTEX, FRAGMENT);
    program.link(&Limits::default()).unwrap();
    assert!(!program.instructions(ShaderKind::Vertex).is_empty());

    program.attach(Shader::from_assembly(ShaderKind::Fragment, "!!NVfp4.0\nMOV R0, R99;\nEND\n"));
    let error = program.link(&Limits::default()).unwrap_err();

    assert!(matches!(error, LinkError::TooManyTemporaries{ index: 99, .. }));
    assert!(!program.is_linked());
    assert!(program.link_info().starts_with("L0010"));
    assert!(program.instructions(ShaderKind::Vertex).is_empty());
    assert!(program.instructions(ShaderKind::Fragment).is_empty());
    assert_eq!(program.uniform_location("u_mvp"), None);
  }

  #[test]
  fn fragment_inputs_must_match_vertex_outputs(){
    let fragment = "!!NVfp4.0\n#var float4 v_color : $vin.COL0 : COL0 : -1 : 1\nEND\n";
    let mut program = program(VERTEX, fragment);
    assert_eq!(program.link(&Limits::default()), Err(LinkError::UnmatchedVarying("v_color".to_string())));
  }

  #[test]
  fn stages_swapped(){
    let mut program = program(FRAGMENT, VERTEX);
    assert!(matches!(
      program.link(&Limits::default()),
      Err(LinkError::WrongStage{ stage: ShaderKind::Vertex, found: ShaderKind::Fragment })
    ));
  }
}
