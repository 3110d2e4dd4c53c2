//! Legend text templates
//!
//! A template such as `{0:SignalTypeAcronym}: {0:Description} [{0:PointTag}]`
//! is parsed once into literal text and [`LegendField`] placeholders. The
//! leading `0:` is optional. Field names match case-insensitively; a name
//! that is not a known field renders as `<Name>`. `{{` and `}}` produce
//! literal braces.

use super::MeasurementMetadata;

/// Fields a legend template can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendField {
    SignalTypeAcronym,
    SignalId,
    MeasurementKey,
    DeviceAcronym,
    PointTag,
    SignalReference,
    Description,
    PhasorSourceIndex,
}

impl LegendField {
    const ALL: [(&'static str, LegendField); 9] = [
        ("SignalTypeAcronym", LegendField::SignalTypeAcronym),
        ("SignalID", LegendField::SignalId),
        ("ID", LegendField::MeasurementKey),
        ("MeasurementKey", LegendField::MeasurementKey),
        ("DeviceAcronym", LegendField::DeviceAcronym),
        ("PointTag", LegendField::PointTag),
        ("SignalReference", LegendField::SignalReference),
        ("Description", LegendField::Description),
        ("PhasorSourceIndex", LegendField::PhasorSourceIndex),
    ];

    /// Resolve a field name (case-insensitive)
    pub fn from_name(name: &str) -> Option<LegendField> {
        let name = name.trim();
        Self::ALL
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, field)| *field)
    }

    fn render(&self, metadata: &MeasurementMetadata, signal_type_acronym: &str) -> String {
        match self {
            LegendField::SignalTypeAcronym => signal_type_acronym.to_string(),
            LegendField::SignalId => metadata.signal_id.to_string(),
            LegendField::MeasurementKey => metadata.measurement_key.clone(),
            LegendField::DeviceAcronym => metadata.device_acronym.clone(),
            LegendField::PointTag => metadata.point_tag.clone(),
            LegendField::SignalReference => metadata.signal_reference.clone(),
            LegendField::Description => metadata.description.clone(),
            LegendField::PhasorSourceIndex => metadata
                .phasor_source_index
                .map(|i| i.to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(LegendField),
    Unknown(String),
}

/// Pre-parsed legend template
#[derive(Debug, Clone, PartialEq)]
pub struct LegendFormatter {
    segments: Vec<Segment>,
}

impl LegendFormatter {
    pub fn new(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut body = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        body.push(c);
                    }

                    if !closed {
                        literal.push('{');
                        literal.push_str(&body);
                        continue;
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }

                    let name = match body.split_once(':') {
                        Some((_, name)) => name.trim(),
                        None => body.trim(),
                    };
                    segments.push(match LegendField::from_name(name) {
                        Some(field) => Segment::Field(field),
                        None => Segment::Unknown(name.to_string()),
                    });
                }
                _ => literal.push(ch),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// Render the template for one measurement
    pub fn format(&self, metadata: &MeasurementMetadata, signal_type_acronym: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => out.push_str(&field.render(metadata, signal_type_acronym)),
                Segment::Unknown(name) => {
                    out.push('<');
                    out.push_str(name);
                    out.push('>');
                }
            }
        }
        out
    }

    /// Fields referenced by the template, in order
    pub fn fields(&self) -> Vec<LegendField> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Field(field) => Some(*field),
                _ => None,
            })
            .collect()
    }
}

impl Default for LegendFormatter {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_LEGEND_FORMAT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SignalId, SignalKind};

    fn record() -> MeasurementMetadata {
        MeasurementMetadata {
            point_tag: "SHELBY-FQ".to_string(),
            description: "Shelby Frequency".to_string(),
            device_acronym: "SHELBY".to_string(),
            ..MeasurementMetadata::new(SignalId::from_u128(7), SignalKind::Frequency)
        }
    }

    #[test]
    fn test_default_template() {
        let text = LegendFormatter::default().format(&record(), "FREQ");
        assert_eq!(text, "FREQ: Shelby Frequency [SHELBY-FQ]");
    }

    #[test]
    fn test_unknown_field_placeholder() {
        let formatter = LegendFormatter::new("{0:PointTag} {0:Voltage}");
        assert_eq!(formatter.format(&record(), "FREQ"), "SHELBY-FQ <Voltage>");
        assert_eq!(formatter.fields(), vec![LegendField::PointTag]);
    }

    #[test]
    fn test_case_insensitive_and_bare_fields() {
        let formatter = LegendFormatter::new("{deviceacronym}/{0:POINTTAG}");
        assert_eq!(formatter.format(&record(), "FREQ"), "SHELBY/SHELBY-FQ");
    }

    #[test]
    fn test_escaped_and_unterminated_braces() {
        let formatter = LegendFormatter::new("{{{0:SignalTypeAcronym}}} {oops");
        assert_eq!(formatter.format(&record(), "FREQ"), "{FREQ} {oops");
    }
}
