/*!
  The first linker pass. Reads the header, `#var`, and `#const` lines of one stage and records
  every used variable in the program layout, assigning attribute slots, uniform locations, and
  texture units as it goes. Instructions are not looked at.
*/

use std::convert::TryFrom;

use string_cache::DefaultAtom;
use tracing::trace;

use super::{syntax_error, LinkContext};
use crate::bytecode::ShaderKind;
use crate::bytecode::assembly::{parse_assembly, DeclaredResource, Direction, Statement, VarDeclaration};
use crate::error::LinkError;
use crate::invocation::{COLOR_SLOT, POSITION_SLOT};
use crate::symboltable::{Binding, Resource, Symbol, SymbolTable};

pub fn scan(context: &mut LinkContext, stage: ShaderKind, text: &str) -> Result<(), LinkError> {
  let lines = parse_assembly(text).map_err(|error| syntax_error(stage, error))?;

  for line in &lines {
    match &line.statement {
      Statement::Header(found) if *found != stage => {
        return Err(LinkError::WrongStage{ stage, found: *found });
      }
      Statement::Var(var) if var.used => context.declare(stage, line.number, var)?,
      Statement::Var(var) => trace!("{} variable `{}` is unused", stage, var.name),
      Statement::Const{ index, value } => {
        context.layout.stage_mut(stage).constants.insert(*index, *value);
      }
      _ => {}
    }
  }

  Ok(())
}

fn symbol(var: &VarDeclaration, index: u8, element_count: u8) -> Symbol {
  Symbol{
    name          : DefaultAtom::from(var.name),
    declared_type : DefaultAtom::from(var.declared_type),
    index,
    element_count
  }
}

/// Inserts into a stage table, reporting a clash as a duplicate declaration.
fn insert(table: &mut SymbolTable, stage: ShaderKind, symbol: Symbol, resource: Resource)
    -> Result<(), LinkError>
{
  table.insert(symbol, resource).map_err(|rejected| {
    LinkError::DuplicateSymbol{ stage, name: rejected.name.to_string() }
  })
}

impl<'l> LinkContext<'l> {
  fn declare(&mut self, stage: ShaderKind, line: usize, var: &VarDeclaration) -> Result<(), LinkError> {
    match (var.resource, var.direction) {
      (Some(DeclaredResource::Uniform{ index, count }), _) => self.declare_uniform(stage, var, index, count),
      (Some(DeclaredResource::Sampler(unit)), _)           => self.declare_sampler(stage, var, unit),
      (Some(DeclaredResource::Varying(binding)), Some(Direction::In))  => self.declare_input(stage, line, var, binding),
      (Some(DeclaredResource::Varying(binding)), Some(Direction::Out)) => self.declare_output(stage, line, var, binding),
      _ => {
        trace!("{} variable `{}` needs no storage", stage, var.name);
        Ok(())
      }
    }
  }

  /// A uniform keeps the location it got in the first stage that declared it.
  fn declare_uniform(&mut self, stage: ShaderKind, var: &VarDeclaration, register: u8, count: u8)
      -> Result<(), LinkError>
  {
    let location = match self.layout.uniforms.get(var.name) {
      Some(existing) => existing.index,
      None => {
        let location = u8::try_from(self.layout.uniform_count).map_err(|_| LinkError::TooManyUniforms)?;
        let resource = Resource::Uniform(location);
        insert(&mut self.layout.uniforms, stage, symbol(var, location, count), resource)?;
        self.layout.uniform_count += count as usize;
        location
      }
    };

    let layout = self.layout.stage_mut(stage);
    insert(&mut layout.uniforms, stage, symbol(var, location, count), Resource::Uniform(register))?;
    for element in 0..count {
      let local = register.checked_add(element).ok_or(LinkError::TooManyUniforms)?;
      let slot  = location.checked_add(element).ok_or(LinkError::TooManyUniforms)?;
      layout.remap.insert(Resource::Uniform(local), slot);
    }
    layout.uniform_count += count as usize;

    trace!("{} uniform `{}` at c[{}] -> location {}", stage, var.name, register, location);
    Ok(())
  }

  fn declare_sampler(&mut self, stage: ShaderKind, var: &VarDeclaration, local_unit: u8)
      -> Result<(), LinkError>
  {
    let unit = match self.layout.samplers.get(var.name) {
      Some(existing) => existing.index,
      None => {
        let unit = u8::try_from(self.layout.texture_count()).map_err(|_| LinkError::TooManyUniforms)?;
        insert(&mut self.layout.samplers, stage, symbol(var, unit, 1), Resource::TextureUnit(unit))?;
        unit
      }
    };

    let layout = self.layout.stage_mut(stage);
    insert(&mut layout.samplers, stage, symbol(var, unit, 1), Resource::TextureUnit(local_unit))?;
    layout.remap.insert(Resource::TextureUnit(local_unit), unit);
    layout.texture_count += 1;

    trace!("{} sampler `{}` at texture[{}] -> unit {}", stage, var.name, local_unit, unit);
    Ok(())
  }

  fn declare_input(&mut self, stage: ShaderKind, line: usize, var: &VarDeclaration, binding: Binding)
      -> Result<(), LinkError>
  {
    let slot = match (stage, binding) {
      (ShaderKind::Vertex, Binding::Attrib(n))     => n,
      (ShaderKind::Vertex, Binding::Position)      => POSITION_SLOT,
      (ShaderKind::Vertex, other)                  => {
        return Err(LinkError::Syntax{
          stage,
          line,
          message: format!("vertex input `{}` is bound to {} instead of a generic attribute", var.name, other)
        });
      }
      (ShaderKind::Fragment, Binding::Position)    => POSITION_SLOT,
      (ShaderKind::Fragment, _) => {
        match self.layout.vertex.outputs.get(var.name) {
          Some(output) => output.index,
          None => {
            self.unmatched.push(var.name.to_string());
            return Ok(());
          }
        }
      }
    };

    let layout = self.layout.stage_mut(stage);
    insert(&mut layout.inputs, stage, symbol(var, slot, 1), Resource::Input(binding))?;
    layout.remap.insert(Resource::Input(binding), slot);
    layout.input_count += 1;

    // `vertex.position` and `vertex.attrib[0]` name the same slot.
    let alias = match (stage, binding) {
      (ShaderKind::Vertex, Binding::Position)  => Some(Binding::Attrib(POSITION_SLOT)),
      (ShaderKind::Vertex, Binding::Attrib(n)) if n == POSITION_SLOT => Some(Binding::Position),
      _ => None
    };
    if let Some(alias) = alias {
      layout.remap.entry(Resource::Input(alias)).or_insert(slot);
    }

    trace!("{} input `{}` ({}) -> slot {}", stage, var.name, binding, slot);
    Ok(())
  }

  fn declare_output(&mut self, stage: ShaderKind, line: usize, var: &VarDeclaration, binding: Binding)
      -> Result<(), LinkError>
  {
    let slot = match (stage, binding) {
      (ShaderKind::Vertex, Binding::Position) => POSITION_SLOT,
      (ShaderKind::Vertex, _) => {
        let slot = self.next_varying;
        self.next_varying = self.next_varying.saturating_add(1);
        slot
      }
      (ShaderKind::Fragment, Binding::Color(_)) => COLOR_SLOT,
      (ShaderKind::Fragment, other) => {
        return Err(LinkError::Syntax{
          stage,
          line,
          message: format!("fragment output `{}` is bound to {}, only color is supported", var.name, other)
        });
      }
    };

    let layout = self.layout.stage_mut(stage);
    insert(&mut layout.outputs, stage, symbol(var, slot, 1), Resource::Output(binding))?;
    layout.remap.insert(Resource::Output(binding), slot);
    layout.output_count += 1;

    trace!("{} output `{}` ({}) -> slot {}", stage, var.name, binding, slot);
    Ok(())
  }
}
