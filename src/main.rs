//! Links a vertex and a fragment program, prints the linked listings, and shades one vertex and
//! the pixel it covers.
//!
//! ```text
//! nvgp4 [vertex.asm fragment.asm] [--limits limits.toml]
//! ```
//! Without program files a built-in textured quad program is used.

#[macro_use] extern crate prettytable;

use std::error::Error;
use std::fs;

use tracing::{error, info, warn};

use nvgp4::bytecode::TextureTarget;
use nvgp4::invocation::ATTRIBUTE_SLOTS;
use nvgp4::shader_core::listing;
use nvgp4::{execute, Limits, Pixel, Program, Shader, ShaderKind, TextureUnit, Vector4, Vertex};

const DEMO_VERTEX: &str = "!!NVvp4.0
# cgc version 3.1.0013
#var float4x4 u_mvp :  : c[0], 4 : -1 : 1
#var float4 a_position : $vin.ATTR0 : ATTR0 : -1 : 1
#var float2 a_texCoord : $vin.ATTR1 : ATTR1 : -1 : 1
#var float4 gl_Position : $vout.POSITION : HPOS : -1 : 1
#var float2 v_texCoord : $vout.TEX0 : TEX0 : -1 : 1
PARAM c[4] = { program.local[0..3] };
TEMP R0;
MUL.F R0, vertex.attrib[0].y, c[1];
MAD.F R0, vertex.attrib[0].x, c[0], R0;
MAD.F R0, vertex.attrib[0].z, c[2], R0;
MAD.F result.position, vertex.attrib[0].w, c[3], R0;
MOV.F result.texcoord[0].xy, vertex.attrib[1];
END
";

const DEMO_FRAGMENT: &str = "!!NVfp4.0
# cgc version 3.1.0013
#var float2 v_texCoord : $vin.TEX0 : TEX0 : -1 : 1
#var sampler2D s_texture :  : texunit 0 : -1 : 1
#var float4 u_tint :  : c[0] : -1 : 1
#var float4 gl_FragColor : $vout.COLOR : COL0[0] : -1 : 1
PARAM c[1] = { program.local[0] };
TEMP R0;
TEX.F R0, fragment.texcoord[0], texture[0], 2D;
MUL.F result_color0, R0, c[0];
END
";

/// An 8x8 black and white checkerboard on every unit.
struct Checkerboard;

impl Checkerboard {
  fn texel(coordinate: Vector4) -> Vector4 {
    let u = (coordinate.x * 8.0).floor() as i64;
    let v = (coordinate.y * 8.0).floor() as i64;
    match (u + v) % 2 == 0 {
      true  => Vector4::new(1.0, 1.0, 1.0, 1.0),
      false => Vector4::new(0.0, 0.0, 0.0, 1.0)
    }
  }
}

impl TextureUnit for Checkerboard {
  fn sample(&self, coordinate: Vector4, _: Option<f32>, _: Vector4, _: Vector4, _: u8, _: TextureTarget) -> Vector4 {
    Checkerboard::texel(coordinate)
  }

  fn fetch(&self, coordinate: Vector4, _: u32, _: u8) -> Vector4 {
    Checkerboard::texel(coordinate)
  }
}

struct Arguments {
  vertex   : Option<String>,
  fragment : Option<String>,
  limits   : Option<String>
}

fn parse_arguments() -> Result<Arguments, String> {
  let mut arguments = Arguments{ vertex: None, fragment: None, limits: None };
  let mut positional = Vec::new();
  let mut args = std::env::args().skip(1);

  while let Some(arg) = args.next() {
    match arg.as_str() {
      "--limits" => {
        arguments.limits = Some(args.next().ok_or("--limits needs a file name")?);
      }
      _ => positional.push(arg)
    }
  }

  match positional.len() {
    0 => {}
    2 => {
      arguments.fragment = positional.pop();
      arguments.vertex   = positional.pop();
    }
    _ => return Err("usage: nvgp4 [vertex.asm fragment.asm] [--limits limits.toml]".to_string())
  }

  Ok(arguments)
}

/// Writes `value` to the slot of the named vertex input, if the program declares it and the slot
/// exists in a vertex record.
fn set_attribute(vertex: &mut Vertex, program: &Program, name: &str, value: Vector4) {
  let slot = match program.attribute_location(name) {
    Some(slot) => slot,
    None => return
  };
  match vertex.attributes.get_mut(slot as usize) {
    Some(attribute) => *attribute = value,
    None => warn!("Input `{}` is bound to slot {}, past the {} vertex slots; left unset", name, slot, ATTRIBUTE_SLOTS)
  }
}

fn run() -> Result<(), Box<dyn Error>> {
  let arguments = parse_arguments()?;

  let limits = match &arguments.limits {
    Some(path) => Limits::load(path)?,
    None       => Limits::default()
  };

  let (vertex_text, fragment_text) = match (&arguments.vertex, &arguments.fragment) {
    (Some(vertex), Some(fragment)) => (fs::read_to_string(vertex)?, fs::read_to_string(fragment)?),
    _ => (DEMO_VERTEX.to_string(), DEMO_FRAGMENT.to_string())
  };

  let mut program = Program::new();
  program.attach(Shader::from_assembly(ShaderKind::Vertex, &vertex_text));
  program.attach(Shader::from_assembly(ShaderKind::Fragment, &fragment_text));
  program.link(&limits)?;
  info!("Linked with {} uniform vectors", program.uniform_count());

  println!("Vertex program:\n{}", listing(program.instructions(ShaderKind::Vertex)));
  println!("Fragment program:\n{}", listing(program.instructions(ShaderKind::Fragment)));

  // Identity transform and a reddish tint; anything the program does not declare stays zero.
  let mut uniforms = vec![Vector4::ZERO; program.uniform_count()];
  if let Some(location) = program.uniform_location("u_mvp") {
    for row in 0..4 {
      if let Some(slot) = uniforms.get_mut(location as usize + row) {
        slot[row] = 1.0;
      }
    }
  }
  if let Some(location) = program.uniform_location("u_tint") {
    if let Some(slot) = uniforms.get_mut(location as usize) {
      *slot = Vector4::new(1.0, 0.5, 0.5, 1.0);
    }
  }

  let mut vertex = Vertex::new();
  set_attribute(&mut vertex, &program, "a_position", Vector4::new(0.25, -0.5, 0.0, 1.0));
  set_attribute(&mut vertex, &program, "a_texCoord", Vector4::new(0.3, 0.7, 0.0, 1.0));
  let inputs = vertex.clone();
  execute(program.instructions(ShaderKind::Vertex), ShaderKind::Vertex, &mut vertex, &uniforms, &Checkerboard);

  // A single pixel exactly at the vertex: its interpolated attributes are the vertex outputs.
  let mut pixel = Pixel::new();
  pixel.attributes = vertex.attributes;
  execute(program.instructions(ShaderKind::Fragment), ShaderKind::Fragment, &mut pixel, &uniforms, &Checkerboard);

  let mut table = table!(["Slot", "Vertex in", "Vertex out", "Pixel out"]);
  for slot in 0..ATTRIBUTE_SLOTS {
    let (input, output, shaded) = (inputs.attributes[slot], vertex.attributes[slot], pixel.attributes[slot]);
    if input != Vector4::ZERO || output != Vector4::ZERO || shaded != Vector4::ZERO {
      table.add_row(row![r->slot, input, output, shaded]);
    }
  }
  println!("Results:\n{}", table);
  println!("Fragment color: {}", pixel.color());

  Ok(())
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .init();

  #[cfg(feature = "trace_computation")]
  info!("Computation tracing enabled");

  if let Err(e) = run() {
    error!("{}", e);
    std::process::exit(1);
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  fn linked(vertex: &str) -> Program {
    let mut program = Program::new();
    program.attach(Shader::from_assembly(ShaderKind::Vertex, vertex));
    program.attach(Shader::from_assembly(ShaderKind::Fragment, "!!NVfp4.0\nEND\n"));
    let limits = Limits{ max_attributes: 32, ..Limits::default() };
    program.link(&limits).unwrap();
    program
  }

  #[test]
  fn attributes_land_in_their_slot(){
    let program = linked("!!NVvp4.0\n#var float4 a_position : $vin.ATTR3 : ATTR3 : -1 : 1\nEND\n");
    let mut vertex = Vertex::new();
    set_attribute(&mut vertex, &program, "a_position", Vector4::splat(2.0));
    set_attribute(&mut vertex, &program, "a_texCoord", Vector4::splat(5.0));
    assert_eq!(vertex.attributes[3], Vector4::splat(2.0));
    assert!(!vertex.attributes.iter().any(|a| *a == Vector4::splat(5.0)));
  }

  #[test]
  fn slots_past_the_record_are_skipped(){
    let program = linked("!!NVvp4.0\n#var float4 a_position : $vin.ATTR20 : ATTR20 : -1 : 1\nEND\n");
    assert_eq!(program.attribute_location("a_position"), Some(20));
    let mut vertex = Vertex::new();
    set_attribute(&mut vertex, &program, "a_position", Vector4::splat(2.0));
    assert!(vertex.attributes.iter().all(|a| *a == Vector4::ZERO));
  }
}
