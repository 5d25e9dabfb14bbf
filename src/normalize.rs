// =============================================================================
// normalize.rs - Every text field goes through here
// =============================================================================
//
// The upstream feed is loose about types: a serial number can be a string, a
// number or null, a party name can occasionally arrive as a list. Everything
// that ends up in a CaseRecord is funnelled through `Normalize`, which is what
// guarantees that no text field is ever absent.
// =============================================================================

use serde_json::Value;

/// Separator used when a sequence is flattened into one field.
pub const SEQUENCE_SEPARATOR: &str = ", ";

/// Coerce a value into a single trimmed string.
///
/// * absent values become `""`
/// * scalars are stringified and trimmed
/// * sequences are normalized element by element, empty results are
///   dropped and the rest is joined with `", "`
pub trait Normalize {
    fn normalized(&self) -> String;
}

impl Normalize for str {
    fn normalized(&self) -> String {
        self.trim().to_string()
    }
}

impl Normalize for String {
    fn normalized(&self) -> String {
        self.as_str().normalized()
    }
}

impl<T: Normalize + ?Sized> Normalize for &T {
    fn normalized(&self) -> String {
        (**self).normalized()
    }
}

impl<T: Normalize> Normalize for Option<T> {
    fn normalized(&self) -> String {
        match self {
            Some(inner) => inner.normalized(),
            None => String::new(),
        }
    }
}

impl<T: Normalize> Normalize for [T] {
    fn normalized(&self) -> String {
        join_normalized(self.iter().map(Normalize::normalized))
    }
}

impl<T: Normalize> Normalize for Vec<T> {
    fn normalized(&self) -> String {
        self.as_slice().normalized()
    }
}

macro_rules! impl_normalize_display {
    ($($ty:ty),*) => {
        $(
            impl Normalize for $ty {
                fn normalized(&self) -> String {
                    self.to_string().trim().to_string()
                }
            }
        )*
    };
}

impl_normalize_display!(i32, i64, u32, u64, usize, f64, bool, char);

impl Normalize for Value {
    fn normalized(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) => s.normalized(),
            Value::Array(items) => items.normalized(),
            // Numbers, booleans and objects fall back to their JSON text.
            other => other.to_string().trim().to_string(),
        }
    }
}

fn join_normalized(parts: impl Iterator<Item = String>) -> String {
    let parts: Vec<String> = parts.filter(|p| !p.is_empty()).collect();
    parts.join(SEQUENCE_SEPARATOR).trim().to_string()
}

/// Normalize an optional JSON field, treating a missing key like `null`.
pub fn sanitize_text(value: Option<&Value>) -> String {
    value.map(Normalize::normalized).unwrap_or_default()
}
