/*!
  Reads the subset of NVGP4 assembly emitted by the Cg compiler for GLSL vertex and fragment
  shaders. The reader is line oriented and produces one `Statement` per header, `#var`, `#const`,
  declaration, or instruction; the linker passes decide which statements they care about.

  The language is the following, one statement per line:
    ```text
    <header>       ::= '!!NVvp4.0' | '!!NVfp4.0'
    <var>          ::= '#var' <type> <name> ':' <semantic>? ':' <resource>? ':' <int> ':' <used>
    <const>        ::= '#const' 'c[' <int> ']' '=' <float>{1,4}
    <declaration>  ::= ('PARAM' | 'TEMP' | 'ATTRIB' | 'OUTPUT' | 'OPTION' | ...) .* ';'
    <instruction>  ::= <mnemonic> ('.' <suffix>)* (<operand> (',' <operand>)*)? ';'
    <operand>      ::= '-'? <reference> ('.' <mask>)? | 'texture[' <int> ']' | <target>
    <end>          ::= 'END'
    ```

  Any other line starting with `#` is a comment, as is the rest of a line after `#`.
*/

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use nom::{
  branch::alt,
  bytes::complete::tag,
  character::complete::{
    alpha1,
    alphanumeric1,
    char as one_char,
    digit0,
    digit1,
    space0,
    space1
  },
  combinator::{all_consuming, map, map_res, opt, recognize, value},
  error::ErrorKind,
  multi::{many0, many1, separated_list, separated_nonempty_list},
  sequence::{delimited, pair, preceded, terminated, tuple},
  Err as NomErr,
  IResult
};

use crate::bytecode::{ShaderKind, TextureTarget};
use crate::mask::Mask;
use crate::symboltable::Binding;
use crate::vector::Vector4;

type ParseResult<'a, T> = IResult<&'a str, T, (&'a str, ErrorKind)>;

/// Statements that reserve storage but carry nothing the linker needs.
const DECLARATION_KEYWORDS: [&str; 12] = [
  "PARAM", "TEMP", "ATTRIB", "OUTPUT", "OPTION", "ADDRESS",
  "SHORT", "LONG", "INT", "UINT", "FLOAT", "BUFFER"
];

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Direction {
  In,
  Out
}

/// The resource column of a `#var` line.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DeclaredResource {
  Varying(Binding),
  Uniform{ index: u8, count: u8 },
  Sampler(u8)
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct VarDeclaration<'a> {
  pub declared_type : &'a str,
  pub name          : &'a str,
  pub direction     : Option<Direction>,
  pub resource      : Option<DeclaredResource>,
  pub used          : bool
}

/// What an operand refers to, as written.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Reference {
  Input(Binding),
  Output(Binding),
  Uniform(u8),
  Register(u8),
  Literal(Vector4)
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ParsedOperand {
  Value{ reference: Reference, mask: Option<Mask>, negate: bool },
  Texture(u8),
  Target(TextureTarget)
}

#[derive(Clone, PartialEq, Debug)]
pub struct ParsedInstruction<'a> {
  pub mnemonic : &'a str,
  /// Precision and condition suffixes such as `.F` or `.SAT`. The core ignores them.
  pub suffixes : Vec<&'a str>,
  pub operands : Vec<ParsedOperand>
}

#[derive(Clone, PartialEq, Debug)]
pub enum Statement<'a> {
  Header(ShaderKind),
  Var(VarDeclaration<'a>),
  Const{ index: u8, value: Vector4 },
  Declaration(&'a str),
  Instruction(ParsedInstruction<'a>),
  End
}

#[derive(Clone, PartialEq, Debug)]
pub struct Line<'a> {
  pub number    : usize,
  pub statement : Statement<'a>
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct SyntaxError {
  pub line    : usize,
  pub message : String
}

impl SyntaxError {
  fn new(line: usize, message: String) -> SyntaxError {
    SyntaxError{ line, message }
  }

  fn from_nom(line: usize, error: NomErr<(&str, ErrorKind)>) -> SyntaxError {
    match error {
      | NomErr::Error((rest, kind))
      | NomErr::Failure((rest, kind)) => {
        SyntaxError::new(line, format!("{} at `{}`", kind.description(), rest))
      }
      NomErr::Incomplete(_) => SyntaxError::new(line, "input incomplete".to_string())
    }
  }
}

impl Display for SyntaxError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "line {}: {}", self.line, self.message)
  }
}

/// Parses a whole program. Statements after `END` are not read.
pub fn parse_assembly(text: &str) -> Result<Vec<Line<'_>>, SyntaxError> {
  let mut lines = Vec::new();

  for (i, raw) in text.lines().enumerate() {
    let number  = i + 1;
    let trimmed = raw.trim();

    if trimmed.is_empty() {
      continue;
    }

    if trimmed.starts_with("!!") {
      let kind = parse_header(trimmed).ok_or_else(|| {
        SyntaxError::new(number, format!("`{}` is not a vertex or fragment program header", trimmed))
      })?;
      lines.push(Line{ number, statement: Statement::Header(kind) });
      continue;
    }

    if let Some(rest) = trimmed.strip_prefix("#var ") {
      let declaration = parse_var(rest).map_err(|message| SyntaxError::new(number, message))?;
      lines.push(Line{ number, statement: Statement::Var(declaration) });
      continue;
    }

    if let Some(rest) = trimmed.strip_prefix("#const ") {
      let (index, value) = all_consuming(terminated(constant, space0))(rest)
        .map(|(_, out)| out)
        .map_err(|e| SyntaxError::from_nom(number, e))?;
      lines.push(Line{ number, statement: Statement::Const{ index, value } });
      continue;
    }

    // Comment
    if trimmed.starts_with('#') {
      continue;
    }

    let code = match trimmed.find('#') {
      Some(p) => &trimmed[..p],
      None    => trimmed
    };

    for piece in code.split(';').map(str::trim).filter(|p| !p.is_empty()) {
      let statement = parse_statement(piece).map_err(|e| SyntaxError::from_nom(number, e))?;
      let is_end = statement == Statement::End;
      lines.push(Line{ number, statement });
      if is_end {
        return Ok(lines);
      }
    }
  }

  Ok(lines)
}

fn parse_header(text: &str) -> Option<ShaderKind> {
  match text {
    t if t.starts_with("!!NVvp") || t.starts_with("!!ARBvp") => Some(ShaderKind::Vertex),
    t if t.starts_with("!!NVfp") || t.starts_with("!!ARBfp") => Some(ShaderKind::Fragment),
    _ => None
  }
}

/**
  Parses the body of a `#var` line:

    float4x4 MVP :  : c[0], 4 : -1 : 1

  The columns are separated by `:`; the resource column is the only one with inner structure.
*/
fn parse_var(text: &str) -> Result<VarDeclaration<'_>, String> {
  let columns: Vec<&str> = text.split(':').map(str::trim).collect();
  if columns.len() < 5 {
    return Err(format!("`#var` needs 5 columns, found {}", columns.len()));
  }

  let mut words = columns[0].split_whitespace();
  let (declared_type, name) = match (words.next(), words.next(), words.next()) {
    (Some(t), Some(n), None) => (t, n),
    _ => return Err(format!("expected `<type> <name>`, found `{}`", columns[0]))
  };

  let direction = match columns[1] {
    s if s.starts_with("$vin.")  => Some(Direction::In),
    s if s.starts_with("$vout.") => Some(Direction::Out),
    _ => None
  };

  let resource = match columns[2] {
    "" => None,
    text => {
      let parsed = all_consuming(terminated(declared_resource, space0))(text)
        .map_err(|_| format!("`{}` is not a resource", text))?;
      Some(parsed.1)
    }
  };

  Ok(VarDeclaration{
    declared_type,
    name,
    direction,
    resource,
    used: columns[4] != "0"
  })
}

fn parse_statement(text: &str) -> Result<Statement<'_>, NomErr<(&str, ErrorKind)>> {
  if text == "END" {
    return Ok(Statement::End);
  }

  if let Some(keyword) = text.split_whitespace().next() {
    if DECLARATION_KEYWORDS.contains(&keyword) {
      return Ok(Statement::Declaration(keyword));
    }
  }

  all_consuming(terminated(instruction, space0))(text)
    .map(|(_, parsed)| Statement::Instruction(parsed))
}

// region Parsers

fn number(i: &str) -> ParseResult<u8> {
  map_res(digit1, |d: &str| d.parse::<u8>())(i)
}

fn bracket_index(i: &str) -> ParseResult<u8> {
  delimited(one_char('['), delimited(space0, number, space0), one_char(']'))(i)
}

fn float_literal(i: &str) -> ParseResult<f32> {
  map_res(
    recognize(tuple((
      opt(alt((one_char('+'), one_char('-')))),
      alt((
        recognize(pair(digit1, opt(pair(one_char('.'), digit0)))),
        recognize(pair(one_char('.'), digit1)),
      )),
      opt(tuple((
        alt((one_char('e'), one_char('E'))),
        opt(alt((one_char('+'), one_char('-')))),
        digit1
      ))),
    ))),
    |text: &str| text.parse::<f32>()
  )(i)
}

/// One to four lanes; missing lanes replicate the last one given.
fn lanes_to_vector(lanes: Vec<f32>) -> Result<Vector4, &'static str> {
  match lanes.len() {
    1..=4 => {
      let mut vector = Vector4::splat(lanes[lanes.len() - 1]);
      for (lane, value) in lanes.iter().enumerate() {
        vector[lane] = *value;
      }
      Ok(vector)
    }
    _ => Err("a vector literal has at most four lanes")
  }
}

fn vector_literal(i: &str) -> ParseResult<Vector4> {
  map_res(
    delimited(
      pair(one_char('{'), space0),
      separated_nonempty_list(delimited(space0, one_char(','), space0), float_literal),
      pair(space0, one_char('}'))
    ),
    lanes_to_vector
  )(i)
}

/// `#const c[4] = 0 1 2 0`
fn constant(i: &str) -> ParseResult<(u8, Vector4)> {
  map_res(
    tuple((
      preceded(one_char('c'), bracket_index),
      delimited(space0, one_char('='), space0),
      many1(preceded(space0, float_literal))
    )),
    |(index, _, lanes)| lanes_to_vector(lanes).map(|value| (index, value))
  )(i)
}

fn binding(i: &str) -> ParseResult<Binding> {
  alt((
    value(Binding::Position, alt((tag("HPOS"), tag("POSITION"), tag("WPOS")))),
    value(Binding::Color(0), tag("COLOR")),
    map(terminated(preceded(tag("COL"), number), opt(bracket_index)), Binding::Color),
    map(preceded(tag("TEX"), number), Binding::TexCoord),
    map(preceded(tag("ATTR"), number), Binding::Attrib),
  ))(i)
}

fn declared_resource(i: &str) -> ParseResult<DeclaredResource> {
  alt((
    map(
      pair(
        preceded(one_char('c'), bracket_index),
        opt(preceded(delimited(space0, one_char(','), space0), number))
      ),
      |(index, count)| DeclaredResource::Uniform{ index, count: count.unwrap_or(1) }
    ),
    map(preceded(pair(tag("texunit"), space1), number), DeclaredResource::Sampler),
    map(binding, DeclaredResource::Varying),
  ))(i)
}

fn reference(i: &str) -> ParseResult<Reference> {
  alt((
    map(preceded(tag("vertex.attrib"), bracket_index),
        |n| Reference::Input(Binding::Attrib(n))),
    value(Reference::Input(Binding::Position), tag("vertex.position")),
    map(preceded(tag("fragment.texcoord"), opt(bracket_index)),
        |n| Reference::Input(Binding::TexCoord(n.unwrap_or(0)))),
    map(preceded(tag("fragment.attrib"), bracket_index),
        |n| Reference::Input(Binding::Attrib(n))),
    map(preceded(tag("fragment.color"), opt(bracket_index)),
        |n| Reference::Input(Binding::Color(n.unwrap_or(0)))),
    value(Reference::Input(Binding::Position), tag("fragment.position")),
    value(Reference::Output(Binding::Position), tag("result.position")),
    map(preceded(tag("result.texcoord"), opt(bracket_index)),
        |n| Reference::Output(Binding::TexCoord(n.unwrap_or(0)))),
    map(preceded(tag("result.attrib"), bracket_index),
        |n| Reference::Output(Binding::Attrib(n))),
    map(preceded(tag("result.color"), opt(bracket_index)),
        |n| Reference::Output(Binding::Color(n.unwrap_or(0)))),
    map(preceded(tag("result_color"), number),
        |n| Reference::Output(Binding::Color(n))),
    map(preceded(tag("program.local"), bracket_index), Reference::Uniform),
    map(preceded(one_char('c'), bracket_index), Reference::Uniform),
    map(preceded(one_char('R'), number), Reference::Register),
    map(vector_literal, Reference::Literal),
    map(float_literal, |f| Reference::Literal(Vector4::splat(f))),
  ))(i)
}

fn operand(i: &str) -> ParseResult<ParsedOperand> {
  alt((
    map(map_res(alphanumeric1, TextureTarget::from_str), ParsedOperand::Target),
    map(preceded(tag("texture"), bracket_index), ParsedOperand::Texture),
    map(
      tuple((
        opt(one_char('-')),
        reference,
        opt(preceded(one_char('.'), map_res(alpha1, Mask::from_str)))
      )),
      |(negate, reference, mask)| ParsedOperand::Value{ reference, mask, negate: negate.is_some() }
    ),
  ))(i)
}

fn instruction(i: &str) -> ParseResult<ParsedInstruction<'_>> {
  map(
    tuple((
      alphanumeric1,
      many0(preceded(one_char('.'), alphanumeric1)),
      opt(preceded(
        space1,
        separated_list(delimited(space0, one_char(','), space0), operand)
      ))
    )),
    |(mnemonic, suffixes, operands)| ParsedInstruction{
      mnemonic,
      suffixes,
      operands: operands.unwrap_or_default()
    }
  )(i)
}

// endregion
