//! Text format for request documents.
//!
//! ```text
//! @host = https://example.com
//!
//! ### Login
//! # @name login
//! POST {{host}}/login
//! Content-Type: application/json
//!
//! {"user": "{{user}}"}
//!
//! ?? status == 200
//! ```

mod line;

use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::types::{HttpRequest, LoopSpec, Metadata, Protocol, Symbol};
use line::{classify, header, Line};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    pub line: usize,
    pub text: String,
}

/// One region as written in the source, before any runtime state exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDefinition {
    pub symbol: Symbol,
    pub metadata: Metadata,
    /// `@name = value` lines in declaration order; values are templates.
    pub variables: Vec<(String, String)>,
    pub request: Option<HttpRequest>,
    pub assertions: Vec<Assertion>,
}

impl RegionDefinition {
    fn new(start_line: usize) -> Self {
        Self {
            symbol: Symbol {
                name: String::new(),
                start_line,
                end_line: start_line,
            },
            metadata: Metadata::new(),
            variables: Vec::new(),
            request: None,
            assertions: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.name()
    }

    pub fn is_global(&self) -> bool {
        self.request.is_none() && self.name().is_none()
    }

    fn is_empty(&self) -> bool {
        self.request.is_none()
            && self.variables.is_empty()
            && self.assertions.is_empty()
            && self.metadata.iter().all(|(k, _)| k == "title")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    pub regions: Vec<RegionDefinition>,
}

impl ParsedDocument {
    pub fn region(&self, name: &str) -> Option<&RegionDefinition> {
        self.regions.iter().find(|r| r.name() == Some(name))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Headers,
    Body,
}

struct RegionBuilder {
    region: RegionDefinition,
    section: Section,
    body: Vec<String>,
}

impl RegionBuilder {
    fn new(start_line: usize, title: Option<&str>) -> Self {
        let mut region = RegionDefinition::new(start_line);
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            region.metadata.set("title", title);
        }
        Self {
            region,
            section: Section::Preamble,
            body: Vec::new(),
        }
    }

    fn finish(mut self, end_line: usize) -> RegionDefinition {
        while self.body.last().is_some_and(|l| l.trim().is_empty()) {
            self.body.pop();
        }
        if let Some(request) = self.region.request.as_mut() {
            if !self.body.is_empty() {
                request.body = Some(self.body.join("\n"));
            }
        }
        let region = &mut self.region;
        region.symbol.end_line = end_line.max(region.symbol.start_line);
        region.symbol.name = region
            .metadata
            .name()
            .or_else(|| region.metadata.title())
            .map(str::to_string)
            .or_else(|| region.request.as_ref().map(|r| format!("{} {}", r.method, r.url)))
            .unwrap_or_else(|| "global".to_string());
        self.region
    }

    fn line(&mut self, number: usize, raw: &str) -> Result<(), ParseError> {
        let kind = classify(raw);
        if let Line::Assertion(text) = kind {
            self.region.assertions.push(Assertion {
                line: number,
                text: text.to_string(),
            });
            return Ok(());
        }
        match self.section {
            Section::Body => {
                self.body.push(raw.trim_end().to_string());
                Ok(())
            }
            Section::Headers => match kind {
                Line::Blank => {
                    self.section = Section::Body;
                    Ok(())
                }
                Line::Comment => Ok(()),
                Line::Meta { key, value } => self.meta(number, key, value),
                _ => {
                    let (name, value) = header(raw).ok_or_else(|| ParseError::InvalidHeader {
                        line: number,
                        text: raw.trim().to_string(),
                    })?;
                    if let Some(request) = self.region.request.as_mut() {
                        request.headers.push((name.to_string(), value.to_string()));
                    }
                    Ok(())
                }
            },
            Section::Preamble => match kind {
                Line::Blank | Line::Comment | Line::Separator(_) | Line::Assertion(_) => Ok(()),
                Line::Meta { key, value } => self.meta(number, key, value),
                Line::Variable { name, value } => {
                    self.region
                        .variables
                        .push((name.to_string(), value.to_string()));
                    Ok(())
                }
                Line::Request { method, url } => {
                    let protocol = Protocol::from_keyword(method).unwrap_or(Protocol::Http);
                    self.region.request = Some(HttpRequest::new(protocol, method, url));
                    self.section = Section::Headers;
                    Ok(())
                }
                Line::Other(text) => Err(ParseError::InvalidRequestLine {
                    line: number,
                    text: text.trim().to_string(),
                }),
            },
        }
    }

    fn meta(&mut self, number: usize, key: &str, value: &str) -> Result<(), ParseError> {
        if key == "loop" && LoopSpec::parse(value).is_none() {
            return Err(ParseError::InvalidLoop {
                line: number,
                spec: value.to_string(),
            });
        }
        match key {
            "ref" | "forceRef" => self.region.metadata.push(key, value),
            _ => self.region.metadata.set(key, value),
        }
        Ok(())
    }
}

pub fn parse_document_str(input: &str) -> Result<ParsedDocument, ParseError> {
    let mut regions = Vec::new();
    let mut names: BTreeMap<String, usize> = BTreeMap::new();
    let mut current = RegionBuilder::new(1, None);
    let mut last_line = 0;

    let mut push = |builder: RegionBuilder, end_line: usize, regions: &mut Vec<RegionDefinition>| {
        let region = builder.finish(end_line);
        if region.is_empty() {
            return Ok(());
        }
        if let Some(name) = region.name() {
            if let Some(first_line) = names.get(name) {
                return Err(ParseError::DuplicateName {
                    line: region.symbol.start_line,
                    name: name.to_string(),
                    first_line: *first_line,
                });
            }
            names.insert(name.to_string(), region.symbol.start_line);
        }
        regions.push(region);
        Ok(())
    };

    for (idx, raw) in input.lines().enumerate() {
        let number = idx + 1;
        last_line = number;
        if let Line::Separator(title) = classify(raw) {
            let finished = std::mem::replace(&mut current, RegionBuilder::new(number, Some(title)));
            push(finished, number.saturating_sub(1), &mut regions)?;
            continue;
        }
        current.line(number, raw)?;
    }
    push(current, last_line, &mut regions)?;

    Ok(ParsedDocument { regions })
}
