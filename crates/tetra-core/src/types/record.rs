use std::fmt;
use std::sync::Arc;

use super::RealizedType;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: Arc<str>,
    pub ty: RealizedType,
}

impl RecordField {
    pub fn new(name: &str, ty: RealizedType) -> Self {
        Self {
            name: Arc::from(name),
            ty,
        }
    }
}

/// A structural record type. Two records are the same type when their
/// field names and types match in order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    fields: Vec<RecordField>,
}

impl RecordType {
    pub fn new(fields: Vec<RecordField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[RecordField] {
        &self.fields
    }

    /// Slot index and type of a field.
    pub fn field(&self, name: &str) -> Option<(usize, &RealizedType)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| &*f.name == name)
            .map(|(i, f)| (i, &f.ty))
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}: {}", field.name, field.ty)?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_lookup_returns_slot() {
        let record = RecordType::new(vec![
            RecordField::new("x", RealizedType::FLOAT),
            RecordField::new("name", RealizedType::STRING),
        ]);
        assert_eq!(record.field("name"), Some((1, &RealizedType::STRING)));
        assert_eq!(record.field("y"), None);
        assert_eq!(record.to_string(), "{ x: float, name: string }");
    }
}
