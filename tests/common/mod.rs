// Helpers shared by the image tests: a reader for the binary records and a
// minimal parser for the LVM2 metadata text.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use nom::{
    branch::alt,
    bytes::complete::{take_till1, take_until},
    character::complete::{char, i64 as parse_i64, line_ending, multispace0, not_line_ending},
    combinator::map,
    multi::{many0, separated_list0},
    sequence::{delimited, preceded, tuple},
    IResult,
};

#[cfg(test)]
#[ctor::ctor]
fn init() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn le_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(buf[at..at + 4].try_into().unwrap())
}

pub fn le_u64(buf: &[u8], at: usize) -> u64 {
    u64::from_le_bytes(buf[at..at + 8].try_into().unwrap())
}

/// Write a payload of `size` bytes with a recognizable pattern seeded by `seed`.
pub fn write_payload(dir: &Path, name: &str, size: usize, seed: u8) -> Result<PathBuf> {
    let path = dir.join(name);
    let content: Vec<u8> = (0..size)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed) | 1)
        .collect();
    std::fs::write(&path, content)?;
    Ok(path)
}

/// Decoded metadata area header.
#[derive(Debug)]
pub struct MdaHeader {
    pub checksum: u32,
    pub magic: [u8; 16],
    pub version: u32,
    pub start: u64,
    pub size: u64,
    pub text_offset: u64,
    pub text_size: u64,
    pub text_checksum: u32,
    pub text_flags: u32,
    pub second_locator: [u8; 24],
}

impl MdaHeader {
    pub fn parse(area: &[u8]) -> Self {
        Self {
            checksum: le_u32(area, 0),
            magic: area[4..20].try_into().unwrap(),
            version: le_u32(area, 20),
            start: le_u64(area, 24),
            size: le_u64(area, 32),
            text_offset: le_u64(area, 40),
            text_size: le_u64(area, 48),
            text_checksum: le_u32(area, 56),
            text_flags: le_u32(area, 60),
            second_locator: area[64..88].try_into().unwrap(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Num(i64),
    List(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Group(Vec<(String, Node)>),
    Value(Value),
}

impl Node {
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Group(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            Node::Value(_) => None,
        }
    }

    pub fn path(&self, keys: &[&str]) -> Option<&Node> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    pub fn keys(&self) -> Vec<&str> {
        match self {
            Node::Group(entries) => entries.iter().map(|(k, _)| k.as_str()).collect(),
            Node::Value(_) => Vec::new(),
        }
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(Node::Value(Value::Str(s))) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn num(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(Node::Value(Value::Num(n))) => Some(*n),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[Value]> {
        match self.get(key) {
            Some(Node::Value(Value::List(l))) => Some(l.as_slice()),
            _ => None,
        }
    }
}

fn comment(input: &str) -> IResult<&str, &str> {
    preceded(multispace0, delimited(char('#'), not_line_ending, line_ending))(input)
}

fn whitespace(input: &str) -> IResult<&str, ()> {
    let (input, _) = many0(comment)(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, ()))
}

fn ident(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| " \r\n\t{}=[]\",".contains(c))(input)
}

fn value(input: &str) -> IResult<&str, Value> {
    delimited(
        whitespace,
        alt((
            map(parse_i64, Value::Num),
            map(delimited(char('"'), take_until("\""), char('"')), |s: &str| {
                Value::Str(s.to_owned())
            }),
            map(
                delimited(
                    char('['),
                    separated_list0(char(','), value),
                    preceded(whitespace, char(']')),
                ),
                Value::List,
            ),
        )),
        whitespace,
    )(input)
}

fn element(input: &str) -> IResult<&str, (String, Node)> {
    delimited(
        whitespace,
        alt((
            map(
                tuple((ident, whitespace, char('='), value)),
                |(key, _, _, v)| (key.to_owned(), Node::Value(v)),
            ),
            map(
                tuple((ident, whitespace, char('{'), many0(element), whitespace, char('}'))),
                |(key, _, _, children, _, _)| (key.to_owned(), Node::Group(children)),
            ),
        )),
        whitespace,
    )(input)
}

/// Parse a complete metadata text document.
pub fn parse_metadata(text: &str) -> Result<Node> {
    let (rest, elements) = match many0(element)(text) {
        Ok(parsed) => parsed,
        Err(e) => bail!("metadata text does not parse: {e}"),
    };
    if !rest.trim().is_empty() {
        bail!("trailing garbage after metadata text: {rest:?}");
    }
    Ok(Node::Group(elements))
}
