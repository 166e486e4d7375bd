//! An order-preserving object model for SMIRNOFF `.offxml` documents.
//!
//! A document is the `<SMIRNOFF>` root plus an ordered list of sections.
//! Most sections are parameter handlers (`<vdW>`, `<Bonds>`, ...) holding a
//! flat list of parameter elements; a few hold plain text (`<Author>`,
//! `<Date>`). Attribute order is preserved verbatim on round-trips.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const ROOT_TAG: &str = "SMIRNOFF";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("I/O error for '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("Failed to write XML: {0}")]
    Write(#[from] std::io::Error),

    #[error("Invalid escape sequence: {0}")]
    Escape(String),

    #[error("Unexpected document structure: {0}")]
    Structure(String),

    #[error("Parameter handler '{0}' is not registered")]
    HandlerNotFound(String),
}

/// A single parameter element, e.g. `<Atom smirks="[#1:1]" id="n1" .../>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl Parameter {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replaces an existing attribute or appends a new one.
    pub fn set_attr(&mut self, key: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((key.to_string(), value.to_string())),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn smirks(&self) -> Option<&str> {
        self.attr("smirks")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    Parameters(Vec<Parameter>),
    Text(String),
}

/// A direct child of the root: a parameter handler or a text section.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub body: SectionBody,
}

impl Section {
    pub fn parameters(&self) -> &[Parameter] {
        match &self.body {
            SectionBody::Parameters(parameters) => parameters,
            SectionBody::Text(_) => &[],
        }
    }

    pub fn parameters_mut(&mut self) -> Option<&mut Vec<Parameter>> {
        match &mut self.body {
            SectionBody::Parameters(parameters) => Some(parameters),
            SectionBody::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForceFieldDocument {
    pub attrs: Vec<(String, String)>,
    pub sections: Vec<Section>,
}

impl ForceFieldDocument {
    pub fn read_from_path(path: &Path) -> Result<Self, DocumentError> {
        let content = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = Self::parse(&content)?;
        debug!(
            "Loaded {} sections from {:?}",
            document.sections.len(),
            path
        );
        Ok(document)
    }

    pub fn parse(xml: &str) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut root_attrs: Option<Vec<(String, String)>> = None;
        let mut sections: Vec<Section> = Vec::new();
        let mut current: Option<Section> = None;
        let mut open_parameter: Option<Parameter> = None;
        let mut depth = 0usize;

        loop {
            match reader.read_event()? {
                Event::Start(element) => {
                    depth += 1;
                    match depth {
                        1 => root_attrs = Some(read_root(&element)?),
                        2 => {
                            current = Some(Section {
                                name: element_name(&element),
                                attrs: collect_attrs(&element)?,
                                body: SectionBody::Parameters(Vec::new()),
                            });
                        }
                        3 => {
                            open_parameter = Some(Parameter {
                                tag: element_name(&element),
                                attrs: collect_attrs(&element)?,
                            });
                        }
                        _ => {
                            return Err(DocumentError::Structure(format!(
                                "element <{}> nested inside a parameter",
                                element_name(&element)
                            )));
                        }
                    }
                }
                Event::Empty(element) => match depth {
                    0 => {
                        root_attrs = Some(read_root(&element)?);
                        break;
                    }
                    1 => sections.push(Section {
                        name: element_name(&element),
                        attrs: collect_attrs(&element)?,
                        body: SectionBody::Parameters(Vec::new()),
                    }),
                    2 => {
                        let parameter = Parameter {
                            tag: element_name(&element),
                            attrs: collect_attrs(&element)?,
                        };
                        let section = current.as_mut().ok_or_else(|| {
                            DocumentError::Structure("parameter outside a section".to_string())
                        })?;
                        match &mut section.body {
                            SectionBody::Parameters(parameters) => parameters.push(parameter),
                            SectionBody::Text(_) => {
                                return Err(DocumentError::Structure(format!(
                                    "section <{}> mixes text and parameters",
                                    section.name
                                )));
                            }
                        }
                    }
                    _ => {
                        return Err(DocumentError::Structure(format!(
                            "element <{}> nested inside a parameter",
                            element_name(&element)
                        )));
                    }
                },
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| DocumentError::Escape(e.to_string()))?
                        .into_owned();
                    match (depth, current.as_mut()) {
                        (2, Some(section)) => {
                            let no_parameters_yet = matches!(
                                &section.body,
                                SectionBody::Parameters(parameters) if parameters.is_empty()
                            );
                            if no_parameters_yet {
                                section.body = SectionBody::Text(text);
                            } else {
                                return Err(DocumentError::Structure(format!(
                                    "section <{}> mixes text and parameters",
                                    section.name
                                )));
                            }
                        }
                        _ => {
                            return Err(DocumentError::Structure(format!(
                                "unexpected text content '{}'",
                                text
                            )));
                        }
                    }
                }
                Event::End(_) => {
                    match depth {
                        3 => {
                            let parameter = open_parameter.take().ok_or_else(|| {
                                DocumentError::Structure("unbalanced element nesting".to_string())
                            })?;
                            if let Some(section) = current.as_mut() {
                                if let Some(parameters) = section.parameters_mut() {
                                    parameters.push(parameter);
                                }
                            }
                        }
                        2 => {
                            if let Some(section) = current.take() {
                                sections.push(section);
                            }
                        }
                        _ => {}
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let attrs = root_attrs
            .ok_or_else(|| DocumentError::Structure("no root element found".to_string()))?;
        Ok(Self { attrs, sections })
    }

    pub fn to_xml(&self) -> Result<String, DocumentError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let mut root = BytesStart::new(ROOT_TAG);
        for (key, value) in &self.attrs {
            root.push_attribute((key.as_str(), value.as_str()));
        }
        writer.write_event(Event::Start(root))?;

        for section in &self.sections {
            let mut start = BytesStart::new(section.name.as_str());
            for (key, value) in &section.attrs {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            match &section.body {
                SectionBody::Text(text) => {
                    writer.write_event(Event::Start(start))?;
                    writer.write_event(Event::Text(BytesText::new(text)))?;
                    writer.write_event(Event::End(BytesEnd::new(section.name.as_str())))?;
                }
                SectionBody::Parameters(parameters) if parameters.is_empty() => {
                    writer.write_event(Event::Empty(start))?;
                }
                SectionBody::Parameters(parameters) => {
                    writer.write_event(Event::Start(start))?;
                    for parameter in parameters {
                        let mut element = BytesStart::new(parameter.tag.as_str());
                        for (key, value) in &parameter.attrs {
                            element.push_attribute((key.as_str(), value.as_str()));
                        }
                        writer.write_event(Event::Empty(element))?;
                    }
                    writer.write_event(Event::End(BytesEnd::new(section.name.as_str())))?;
                }
            }
        }

        writer.write_event(Event::End(BytesEnd::new(ROOT_TAG)))?;
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    /// Writes the document, creating parent directories as needed.
    pub fn write_to_path(&self, path: &Path) -> Result<(), DocumentError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| DocumentError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let xml = self.to_xml()?;
        fs::write(path, xml).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections
            .iter_mut()
            .find(|section| section.name == name)
    }

    /// Removes a parameter handler outright; absence is an error.
    pub fn deregister(&mut self, name: &str) -> Result<Section, DocumentError> {
        let index = self
            .sections
            .iter()
            .position(|section| section.name == name)
            .ok_or_else(|| DocumentError::HandlerNotFound(name.to_string()))?;
        Ok(self.sections.remove(index))
    }
}

fn element_name(element: &BytesStart) -> String {
    String::from_utf8_lossy(element.name().as_ref()).into_owned()
}

fn collect_attrs(element: &BytesStart) -> Result<Vec<(String, String)>, DocumentError> {
    let mut attrs = Vec::new();
    for attr in element.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| DocumentError::Escape(e.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

fn read_root(element: &BytesStart) -> Result<Vec<(String, String)>, DocumentError> {
    let name = element_name(element);
    if name != ROOT_TAG {
        return Err(DocumentError::Structure(format!(
            "expected <{}> root, found <{}>",
            ROOT_TAG, name
        )));
    }
    collect_attrs(element)
}
