use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Number of trailing characters left readable when a value is rendered.
const VISIBLE_TAIL: usize = 3;

/// Wraps customer-identifying text (recipient phone numbers, names) so that
/// `Debug` and `Display` only reveal the last few characters.
///
/// Serialization writes the real value: API responses and persisted orders
/// need it, log macros must not.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T: AsRef<str>> Masked<T> {
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self.0.as_ref();
        let count = raw.chars().count();
        if count <= VISIBLE_TAIL {
            return write!(f, "{}", "*".repeat(count.max(1)));
        }
        let tail: String = raw.chars().skip(count - VISIBLE_TAIL).collect();
        write!(f, "{}{}", "*".repeat(count - VISIBLE_TAIL), tail)
    }
}

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f)
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f)
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn inner(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}
