//! Parsed `Input` replies.

use boxwire_proto::Value;

/// Values returned by a render call, per the input-arity law.
///
/// An `Input` with no entries is [`Reply::None`], one entry is
/// [`Reply::One`], several entries are [`Reply::Many`] in document order of
/// the input-capable leaves of the rendered tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Reply {
    /// No value
    #[default]
    None,
    /// Exactly one value
    One(Value),
    /// Ordered tuple of values
    Many(Vec<Value>),
}

impl Reply {
    /// Apply the arity law to an ordered list of values.
    #[must_use]
    pub fn from_values(mut values: Vec<Value>) -> Self {
        match values.len() {
            0 => Self::None,
            1 => values.pop().map_or(Self::None, Self::One),
            _ => Self::Many(values),
        }
    }

    /// Whether no value was returned.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The single value, if there is exactly one.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::One(value) => Some(value),
            _ => None,
        }
    }

    /// The single value as text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.value().and_then(Value::as_str)
    }

    /// Number of values.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::None => 0,
            Self::One(_) => 1,
            Self::Many(values) => values.len(),
        }
    }

    /// Flatten back into an ordered list.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Self::None => Vec::new(),
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}
