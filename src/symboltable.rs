use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use bimap::BiMap;
use string_cache::DefaultAtom;

/// The hardware semantic an attribute is bound to, as written in the assembly.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum Binding {
  /// `HPOS`, `POSITION`, `WPOS`
  Position,
  /// `COLn`
  Color(u8),
  /// `TEXn`
  TexCoord(u8),
  /// `ATTRn`
  Attrib(u8)
}

/// A resource as it is referenced in one stage's assembly, before remapping.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum Resource {
  Input(Binding),
  Output(Binding),
  /// `c[k]`
  Uniform(u8),
  /// `texture[k]`
  TextureUnit(u8)
}

impl Display for Binding {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Binding::Position    => write!(f, "POSITION"),
      Binding::Color(i)    => write!(f, "COL{}", i),
      Binding::TexCoord(i) => write!(f, "TEX{}", i),
      Binding::Attrib(i)   => write!(f, "ATTR{}", i),
    }
  }
}

impl Display for Resource {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Resource::Input(binding)  => write!(f, "$vin.{}", binding),
      Resource::Output(binding) => write!(f, "$vout.{}", binding),
      Resource::Uniform(i)      => write!(f, "c[{}]", i),
      Resource::TextureUnit(i)  => write!(f, "texture[{}]", i),
    }
  }
}

/// A declared variable and the storage it was assigned.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Symbol {
  pub name          : DefaultAtom,
  pub declared_type : DefaultAtom,
  /// Final storage slot: attribute slot, uniform location, or texture unit.
  pub index         : u8,
  /// Number of consecutive slots, e.g. 4 for a `float4x4` uniform.
  pub element_count : u8
}

impl Display for Symbol {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {} Idx:{} element:{}", self.declared_type, self.name, self.index, self.element_count)
  }
}

/**
  Maps a variable name to its `Symbol`. The name/resource association is one-to-one and kept in a
  `BiMap`, so a second name for a resource or a second resource for a name is rejected.
*/
#[derive(Debug)]
pub struct SymbolTable {
  symbols   : HashMap<DefaultAtom, Symbol>,
  resources : BiMap<DefaultAtom, Resource>
}

impl SymbolTable {

  pub fn new() -> SymbolTable {
    SymbolTable{
      symbols   : HashMap::new(),
      resources : BiMap::new()
    }
  }

  pub fn get(&self, name: &str) -> Option<&Symbol> {
    self.symbols.get(&DefaultAtom::from(name))
  }

  /// Inserts the symbol declared with `resource`. Neither the name nor the resource may already
  /// be present; on a clash the rejected symbol is handed back.
  pub fn insert(&mut self, symbol: Symbol, resource: Resource) -> Result<(), Symbol> {
    if self.resources.insert_no_overwrite(symbol.name.clone(), resource).is_err() {
      return Err(symbol);
    }
    self.symbols.insert(symbol.name.clone(), symbol);
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.symbols.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
    self.symbols.values()
  }

  pub fn clear(&mut self) {
    self.symbols.clear();
    self.resources.clear();
  }
}

impl Default for SymbolTable {
  fn default() -> SymbolTable {
    SymbolTable::new()
  }
}
